//! # Circuit Variants
//!
//! Closed dispatch from `(signature algorithm, curve or exponent, key size)`
//! to the circuit that verifies it. Every arm is listed explicitly; a
//! combination without an arm is an [`UnsupportedAlgorithmError`], never a
//! default circuit.
//!
//! | family | hashes | parameter | sizes |
//! |---|---|---|---|
//! | RSA PKCS#1 v1.5 | SHA-1, SHA-256, SHA-384, SHA-512 | e = 3, 65537 | 2048, 3072, 4096 |
//! | RSA-PSS | SHA-256, SHA-384, SHA-512 | e = 3, 65537 | 2048, 3072, 4096 |
//! | ECDSA | SHA-1, SHA-224, SHA-256, SHA-384, SHA-512 | P-224/256/384/521, brainpoolP256r1/384r1/512r1 | curve size |

use docproof_core::{
    CertificateRecord, CurveOrExponent, DocumentCategory, DocumentRecord, EcCurve, HashAlgorithm,
    SignatureAlgorithm, SignatureScheme, UnsupportedAlgorithmError,
};
use serde::{Deserialize, Serialize};

/// Proving operation a circuit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Register,
    Dsc,
    Disclose,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Dsc => "dsc",
            Self::Disclose => "disclose",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "register" => Ok(Self::Register),
            "dsc" => Ok(Self::Dsc),
            "disclose" => Ok(Self::Disclose),
            _ => Err(format!("unknown operation: {s}")),
        }
    }
}

/// Supported RSA modulus sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsaBits {
    B2048,
    B3072,
    B4096,
}

impl RsaBits {
    pub fn bits(&self) -> u32 {
        match self {
            Self::B2048 => 2048,
            Self::B3072 => 3072,
            Self::B4096 => 4096,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            2048 => Some(Self::B2048),
            3072 => Some(Self::B3072),
            4096 => Some(Self::B4096),
            _ => None,
        }
    }
}

/// Supported RSA public exponents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsaExponent {
    E3,
    E65537,
}

impl RsaExponent {
    pub fn value(&self) -> u32 {
        match self {
            Self::E3 => 3,
            Self::E65537 => 65537,
        }
    }

    fn from_value(e: u32) -> Option<Self> {
        match e {
            3 => Some(Self::E3),
            65537 => Some(Self::E65537),
            _ => None,
        }
    }
}

/// Signature verification gadget inside a register or DSC circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum SignatureVariant {
    Rsa {
        hash: HashAlgorithm,
        exponent: RsaExponent,
        bits: RsaBits,
    },
    RsaPss {
        hash: HashAlgorithm,
        exponent: RsaExponent,
        bits: RsaBits,
    },
    Ecdsa {
        hash: HashAlgorithm,
        curve: EcCurve,
    },
}

impl SignatureVariant {
    /// Dispatch to a signature gadget.
    ///
    /// `key_bits` is the modulus size for RSA and is ignored for ECDSA,
    /// whose size follows from the curve.
    pub fn select(
        algorithm: Option<SignatureAlgorithm>,
        curve_or_exponent: Option<CurveOrExponent>,
        key_bits: u32,
    ) -> Result<Self, UnsupportedAlgorithmError> {
        use HashAlgorithm::*;

        let unsupported = || UnsupportedAlgorithmError {
            algorithm: algorithm.map_or_else(|| "unknown".to_string(), |a| a.to_string()),
            curve_or_exponent: curve_or_exponent
                .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
        };
        let (Some(alg), Some(coe)) = (algorithm, curve_or_exponent) else {
            return Err(unsupported());
        };

        let variant = match (alg.scheme, alg.hash, coe) {
            (SignatureScheme::Rsa, Sha1 | Sha256 | Sha384 | Sha512, CurveOrExponent::Exponent(e)) => {
                Self::Rsa {
                    hash: alg.hash,
                    exponent: RsaExponent::from_value(e).ok_or_else(unsupported)?,
                    bits: RsaBits::from_bits(key_bits).ok_or_else(unsupported)?,
                }
            }
            (SignatureScheme::RsaPss, Sha256 | Sha384 | Sha512, CurveOrExponent::Exponent(e)) => {
                Self::RsaPss {
                    hash: alg.hash,
                    exponent: RsaExponent::from_value(e).ok_or_else(unsupported)?,
                    bits: RsaBits::from_bits(key_bits).ok_or_else(unsupported)?,
                }
            }
            (SignatureScheme::Ecdsa, hash, CurveOrExponent::Curve(curve)) => {
                Self::Ecdsa { hash, curve }
            }
            _ => return Err(unsupported()),
        };
        Ok(variant)
    }

    pub fn hash(&self) -> HashAlgorithm {
        match self {
            Self::Rsa { hash, .. } | Self::RsaPss { hash, .. } | Self::Ecdsa { hash, .. } => *hash,
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        let scheme = match self {
            Self::Rsa { .. } => SignatureScheme::Rsa,
            Self::RsaPss { .. } => SignatureScheme::RsaPss,
            Self::Ecdsa { .. } => SignatureScheme::Ecdsa,
        };
        SignatureAlgorithm::new(scheme, self.hash())
    }

    /// `<family>_<param>_<bits>` suffix of a circuit id.
    fn suffix(&self) -> String {
        match self {
            Self::Rsa { exponent, bits, .. } => format!("rsa_{}_{}", exponent.value(), bits.bits()),
            Self::RsaPss { exponent, bits, .. } => {
                format!("rsapss_{}_{}", exponent.value(), bits.bits())
            }
            Self::Ecdsa { curve, .. } => format!("ecdsa_{}_{}", curve.as_str(), curve.bits()),
        }
    }
}

/// A concrete circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CircuitVariant {
    Register {
        dg1_hash: HashAlgorithm,
        e_content_hash: HashAlgorithm,
        signature: SignatureVariant,
    },
    RegisterAadhaar,
    Dsc {
        signature: SignatureVariant,
    },
    Disclose {
        category: DocumentCategory,
    },
}

impl CircuitVariant {
    /// Register circuit for a chip record signed by `dsc`.
    pub fn for_register(
        record: &DocumentRecord,
        dsc: &CertificateRecord,
    ) -> Result<Self, UnsupportedAlgorithmError> {
        if record.category == DocumentCategory::Aadhaar {
            let signature = SignatureVariant::select(
                record.signature_algorithm,
                record.curve_or_exponent,
                dsc.public_key.bits(),
            )?;
            return match signature {
                SignatureVariant::Rsa {
                    hash: HashAlgorithm::Sha256,
                    bits: RsaBits::B2048,
                    ..
                } => Ok(Self::RegisterAadhaar),
                _ => Err(UnsupportedAlgorithmError {
                    algorithm: signature.algorithm().to_string(),
                    curve_or_exponent: format!("{} bits", dsc.public_key.bits()),
                }),
            };
        }
        let signature = SignatureVariant::select(
            record.signature_algorithm,
            record.curve_or_exponent,
            dsc.public_key.bits(),
        )?;
        let chip = record.chip().ok_or_else(|| UnsupportedAlgorithmError {
            algorithm: signature.algorithm().to_string(),
            curve_or_exponent: "no chip data".into(),
        })?;
        Ok(Self::Register {
            dg1_hash: chip.dg1_hash_algorithm,
            e_content_hash: chip.e_content_hash_algorithm,
            signature,
        })
    }

    /// DSC circuit for a DSC signed by `csca` with `algorithm`.
    pub fn for_dsc(
        csca: &CertificateRecord,
        algorithm: SignatureAlgorithm,
    ) -> Result<Self, UnsupportedAlgorithmError> {
        let signature = SignatureVariant::select(
            Some(algorithm),
            Some(csca.public_key.curve_or_exponent()),
            csca.public_key.bits(),
        )?;
        Ok(Self::Dsc { signature })
    }

    pub fn for_disclose(category: DocumentCategory) -> Self {
        Self::Disclose { category }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Register { .. } | Self::RegisterAadhaar => Operation::Register,
            Self::Dsc { .. } => Operation::Dsc,
            Self::Disclose { .. } => Operation::Disclose,
        }
    }

    /// Identifier the TEE uses to pick proving artifacts.
    pub fn circuit_id(&self) -> String {
        match self {
            Self::Register {
                dg1_hash,
                e_content_hash,
                signature,
            } => format!(
                "register_{dg1_hash}_{e_content_hash}_{}_{}",
                signature.hash(),
                signature.suffix()
            ),
            Self::RegisterAadhaar => "register_aadhaar".into(),
            Self::Dsc { signature } => format!("dsc_{}_{}", signature.hash(), signature.suffix()),
            Self::Disclose { category } => match category {
                DocumentCategory::Passport => "vc_and_disclose".into(),
                DocumentCategory::IdCard => "vc_and_disclose_id".into(),
                DocumentCategory::Aadhaar => "vc_and_disclose_aadhaar".into(),
            },
        }
    }
}

impl std::fmt::Display for CircuitVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.circuit_id())
    }
}
