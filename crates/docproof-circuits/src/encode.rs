//! Encoding of byte strings, big integers and dates into circuit signals.
//!
//! Signals are decimal strings, as circom witness generators expect them.

use chrono::{Datelike, NaiveDate};
use docproof_core::HashAlgorithm;
use docproof_crypto::FieldElement;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::CircuitError;

/// Width of one big-integer limb.
pub const LIMB_BITS: u32 = 121;

/// One named circuit input: a scalar or a fixed-length array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    Scalar(String),
    Array(Vec<String>),
}

impl Signal {
    pub fn number(v: u64) -> Self {
        Self::Scalar(v.to_string())
    }

    pub fn field(fe: &FieldElement) -> Self {
        Self::Scalar(fe.to_decimal())
    }

    pub fn fields(fes: &[FieldElement]) -> Self {
        Self::Array(fes.iter().map(FieldElement::to_decimal).collect())
    }

    /// One signal per byte.
    pub fn bytes(bytes: &[u8]) -> Self {
        Self::Array(bytes.iter().map(u8::to_string).collect())
    }

    pub fn bits(bits: &[u8]) -> Self {
        Self::bytes(bits)
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            Self::Array(a) => Some(a),
            Self::Scalar(_) => None,
        }
    }
}

/// Apply SHA-1/SHA-2 message padding to `message`, then zero-fill to
/// `max_len`. Returns the buffer and the padded length (the part the
/// circuit hashes).
pub fn sha_pad(
    field: &'static str,
    message: &[u8],
    hash: HashAlgorithm,
    max_len: usize,
) -> Result<(Vec<u8>, usize), CircuitError> {
    let block = hash.block_len();
    let length_bytes = if block == 128 { 16 } else { 8 };
    let bit_len = (message.len() as u128) * 8;

    let mut out = message.to_vec();
    out.push(0x80);
    while (out.len() + length_bytes) % block != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bit_len.to_be_bytes()[16 - length_bytes..]);
    let padded_len = out.len();
    if padded_len > max_len {
        return Err(CircuitError::InputTooLarge {
            field,
            len: padded_len,
            max: max_len,
        });
    }
    out.resize(max_len, 0);
    Ok((out, padded_len))
}

/// Split a big-endian integer into `LIMB_BITS`-wide little-endian limbs.
pub fn to_limbs(be_bytes: &[u8], n_limbs: usize) -> Vec<String> {
    let mut value = BigUint::from_bytes_be(be_bytes);
    let mask = (BigUint::from(1u8) << LIMB_BITS) - 1u8;
    let mut limbs = Vec::with_capacity(n_limbs);
    for _ in 0..n_limbs {
        limbs.push((&value & &mask).to_string());
        value >>= LIMB_BITS;
    }
    limbs
}

/// Limbs needed for a `bits`-wide integer.
pub fn limb_count(bits: u32) -> usize {
    bits.div_ceil(LIMB_BITS) as usize
}

/// Decode a DER `ECDSA-Sig-Value` into big-endian `(r, s)`.
pub fn ecdsa_signature_parts(der: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CircuitError> {
    let bad = |why: &str| CircuitError::MalformedSignature(format!("ECDSA DER: {why}"));

    fn read_len(input: &[u8]) -> Option<(usize, &[u8])> {
        let (&first, rest) = input.split_first()?;
        match first {
            n if n < 0x80 => Some((n as usize, rest)),
            0x81 => {
                let (&n, rest) = rest.split_first()?;
                Some((n as usize, rest))
            }
            _ => None,
        }
    }

    fn read_integer(input: &[u8]) -> Option<(&[u8], &[u8])> {
        let (&tag, rest) = input.split_first()?;
        if tag != 0x02 {
            return None;
        }
        let (len, rest) = read_len(rest)?;
        if rest.len() < len {
            return None;
        }
        let (value, rest) = rest.split_at(len);
        let lead = value.iter().position(|b| *b != 0).unwrap_or(value.len());
        Some((&value[lead..], rest))
    }

    let (&tag, rest) = der.split_first().ok_or_else(|| bad("empty"))?;
    if tag != 0x30 {
        return Err(bad("expected SEQUENCE"));
    }
    let (len, body) = read_len(rest).ok_or_else(|| bad("length"))?;
    if body.len() != len {
        return Err(bad("trailing or missing bytes"));
    }
    let (r, rest) = read_integer(body).ok_or_else(|| bad("r"))?;
    let (s, rest) = read_integer(rest).ok_or_else(|| bad("s"))?;
    if !rest.is_empty() {
        return Err(bad("trailing bytes"));
    }
    Ok((r.to_vec(), s.to_vec()))
}

/// `YYMMDD` of `date` as six digit signals.
pub fn date_digits(date: NaiveDate) -> Vec<u8> {
    let yy = date.year().rem_euclid(100) as u32;
    [yy / 10, yy % 10, date.month() / 10, date.month() % 10, date.day() / 10, date.day() % 10]
        .into_iter()
        .map(|d| d as u8)
        .collect()
}

/// Offset of `needle` inside `haystack`.
pub fn find_offset(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
