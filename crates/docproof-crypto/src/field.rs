//! # Field Elements
//!
//! `FieldElement` wraps an element of the Pallas base field, the domain of
//! every Poseidon hash, commitment, nullifier and tree node in the pipeline.
//!
//! Renderings:
//! - `to_repr()` bytes are little-endian (the curve library's canonical form).
//! - Hex is big-endian with a `0x` prefix, so it reads as the integer value.
//! - Circuit signals use decimal strings.
//!
//! Ordering compares integer values, which the OFAC tree relies on when it
//! sorts leaves.

use std::cmp::Ordering;

use num_bigint::BigUint;
use pasta_curves::group::ff::{Field, PrimeField};
use pasta_curves::pallas;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CryptoError;

/// The Pallas base field.
pub type Fp = pallas::Base;

/// A Pallas base-field element.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FieldElement(pub Fp);

impl FieldElement {
    pub const ZERO: Self = Self(Fp::ZERO);
    pub const ONE: Self = Self(Fp::ONE);

    pub fn from_u64(v: u64) -> Self {
        Self(Fp::from(v))
    }

    /// The largest element, `p - 1`.
    pub fn max_value() -> Self {
        Self(-Fp::ONE)
    }

    /// Interpret up to 31 little-endian bytes as an element. 31 bytes are
    /// always below the modulus, so this never reduces.
    pub fn from_le_bytes_31(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > 31 {
            return None;
        }
        let mut repr = [0u8; 32];
        repr[..bytes.len()].copy_from_slice(bytes);
        Option::from(Fp::from_repr(repr)).map(Self)
    }

    /// Canonical 32-byte little-endian encoding.
    pub fn to_repr(&self) -> [u8; 32] {
        self.0.to_repr()
    }

    /// # Errors
    ///
    /// [`CryptoError::InvalidFieldElement`] if the bytes encode a value at
    /// or above the modulus.
    pub fn from_repr(repr: [u8; 32]) -> Result<Self, CryptoError> {
        Option::from(Fp::from_repr(repr))
            .map(Self)
            .ok_or_else(|| CryptoError::InvalidFieldElement(hex::encode(repr)))
    }

    fn to_be_bytes(self) -> [u8; 32] {
        let mut be = self.to_repr();
        be.reverse();
        be
    }

    /// `0x`-prefixed big-endian hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let digits = s.trim().trim_start_matches("0x");
        if digits.is_empty() || digits.len() > 64 {
            return Err(CryptoError::InvalidFieldElement(s.to_string()));
        }
        let padded = format!("{digits:0>64}");
        let mut be = [0u8; 32];
        hex::decode_to_slice(&padded, &mut be)
            .map_err(|_| CryptoError::InvalidFieldElement(s.to_string()))?;
        be.reverse();
        Self::from_repr(be)
    }

    /// Decimal rendering used for circuit signals.
    pub fn to_decimal(&self) -> String {
        BigUint::from_bytes_le(&self.to_repr()).to_str_radix(10)
    }

    pub fn from_decimal(s: &str) -> Result<Self, CryptoError> {
        let n = BigUint::parse_bytes(s.trim().as_bytes(), 10)
            .ok_or_else(|| CryptoError::InvalidFieldElement(s.to_string()))?;
        let le = n.to_bytes_le();
        if le.len() > 32 {
            return Err(CryptoError::InvalidFieldElement(s.to_string()));
        }
        let mut repr = [0u8; 32];
        repr[..le.len()].copy_from_slice(&le);
        Self::from_repr(repr)
    }

    pub fn is_zero(&self) -> bool {
        bool::from(self.0.is_zero())
    }
}

impl From<Fp> for FieldElement {
    fn from(f: Fp) -> Self {
        Self(f)
    }
}

impl From<u64> for FieldElement {
    fn from(v: u64) -> Self {
        Self::from_u64(v)
    }
}

impl Ord for FieldElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_be_bytes().cmp(&other.to_be_bytes())
    }
}

impl PartialOrd for FieldElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for FieldElement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_repr().hash(state);
    }
}

impl std::fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl std::fmt::Display for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
