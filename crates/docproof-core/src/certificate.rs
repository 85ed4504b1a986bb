//! # Certificate Records
//!
//! Structured public-key metadata for Document Signer (DSC) and Country
//! Signing CA (CSCA) certificates. A record is immutable once parsed and is
//! owned by the proving session that parsed it.

use serde::{Deserialize, Serialize};

use crate::algorithm::{CurveOrExponent, EcCurve, HashAlgorithm, SignatureAlgorithm};

/// Public-key family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicKeyKind {
    Rsa,
    Ecdsa,
}

/// RSASSA-PSS parameters taken from the certificate's signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RsaPssParams {
    pub hash: HashAlgorithm,
    pub salt_length: u32,
}

/// Key material of the certified public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PublicKeyParams {
    Rsa {
        /// Big-endian modulus without leading zero bytes.
        #[serde(with = "crate::serde_bytes::hex_vec")]
        modulus: Vec<u8>,
        exponent: u32,
        /// Set when the certificate itself is signed with RSASSA-PSS.
        pss: Option<RsaPssParams>,
    },
    Ecdsa {
        curve: EcCurve,
        /// Uncompressed SEC1 point `04 || x || y`.
        #[serde(with = "crate::serde_bytes::hex_vec")]
        point: Vec<u8>,
    },
}

impl PublicKeyParams {
    pub fn kind(&self) -> PublicKeyKind {
        match self {
            Self::Rsa { .. } => PublicKeyKind::Rsa,
            Self::Ecdsa { .. } => PublicKeyKind::Ecdsa,
        }
    }

    /// Key size in bits: modulus length for RSA, field size for ECDSA.
    pub fn bits(&self) -> u32 {
        match self {
            Self::Rsa { modulus, .. } => {
                let lead = modulus.iter().position(|b| *b != 0).unwrap_or(modulus.len());
                let rest = &modulus[lead..];
                match rest.first() {
                    Some(first) => (rest.len() as u32 - 1) * 8 + (8 - first.leading_zeros()),
                    None => 0,
                }
            }
            Self::Ecdsa { curve, .. } => curve.bits(),
        }
    }

    pub fn curve_or_exponent(&self) -> CurveOrExponent {
        match self {
            Self::Rsa { exponent, .. } => CurveOrExponent::Exponent(*exponent),
            Self::Ecdsa { curve, .. } => CurveOrExponent::Curve(*curve),
        }
    }

    /// Affine `(x, y)` coordinates of an EC point.
    pub fn ec_coordinates(&self) -> Option<(&[u8], &[u8])> {
        match self {
            Self::Ecdsa { curve, point } => {
                let n = curve.coordinate_len();
                if point.len() == 1 + 2 * n && point[0] == 0x04 {
                    Some((&point[1..1 + n], &point[1 + n..]))
                } else {
                    None
                }
            }
            Self::Rsa { .. } => None,
        }
    }
}

/// A parsed issuer certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub public_key: PublicKeyParams,
    /// Raw `subjectPublicKey` BIT STRING contents, as signature verifiers
    /// expect them (PKCS#1 `RSAPublicKey` or SEC1 point).
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub public_key_bytes: Vec<u8>,
    pub issuer: String,
    pub subject: String,
    /// The certificate's own signature algorithm, when recognised.
    pub signature_algorithm: Option<SignatureAlgorithm>,
    /// DER `TBSCertificate`.
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub tbs: Vec<u8>,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub signature: Vec<u8>,
    /// SHA-256 of the full DER encoding.
    #[serde(with = "crate::serde_bytes::hex_array")]
    pub fingerprint: [u8; 32],
}

impl CertificateRecord {
    pub fn key_kind(&self) -> PublicKeyKind {
        self.public_key.kind()
    }
}

/// A DSC together with the CSCA that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateChain {
    pub dsc: CertificateRecord,
    pub csca: CertificateRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_bit_length() {
        let mut modulus = vec![0xC0];
        modulus.extend(std::iter::repeat(0xFF).take(255));
        let k = PublicKeyParams::Rsa {
            modulus,
            exponent: 65537,
            pss: None,
        };
        assert_eq!(k.bits(), 2048);
        assert_eq!(k.kind(), PublicKeyKind::Rsa);
        assert_eq!(k.curve_or_exponent(), CurveOrExponent::Exponent(65537));
    }

    #[test]
    fn rsa_bit_length_ignores_leading_zero() {
        let mut modulus = vec![0x00, 0x01];
        modulus.extend(std::iter::repeat(0).take(127));
        let k = PublicKeyParams::Rsa {
            modulus,
            exponent: 3,
            pss: None,
        };
        assert_eq!(k.bits(), 1017);
    }

    #[test]
    fn ec_coordinates_split() {
        let mut point = vec![0x04];
        point.extend([1u8; 32]);
        point.extend([2u8; 32]);
        let k = PublicKeyParams::Ecdsa {
            curve: EcCurve::P256,
            point,
        };
        let (x, y) = k.ec_coordinates().unwrap();
        assert_eq!(x, &[1u8; 32]);
        assert_eq!(y, &[2u8; 32]);
        assert_eq!(k.bits(), 256);
    }

    #[test]
    fn compressed_point_has_no_coordinates() {
        let k = PublicKeyParams::Ecdsa {
            curve: EcCurve::P256,
            point: vec![0x02; 33],
        };
        assert!(k.ec_coordinates().is_none());
    }
}
