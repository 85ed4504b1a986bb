//! # Algorithm Identifiers
//!
//! Closed enumerations for the hash functions, elliptic curves and signature
//! schemes found in passport chips, ID cards, Aadhaar credentials and their
//! issuer certificates. Names and OIDs are parsed here, at the boundary;
//! everything downstream matches on the enums.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Hash algorithms
// ---------------------------------------------------------------------------

/// Digest algorithm used for data-group hashes, eContent, signed attributes
/// or certificate signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// All supported hash algorithms, shortest digest first.
    pub const ALL: [HashAlgorithm; 5] = [
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Compression-function block length in bytes.
    pub fn block_len(&self) -> usize {
        match self {
            Self::Sha1 | Self::Sha224 | Self::Sha256 => 64,
            Self::Sha384 | Self::Sha512 => 128,
        }
    }

    /// NIST / PKCS OID of the bare digest algorithm.
    pub fn oid(&self) -> &'static str {
        match self {
            Self::Sha1 => "1.3.14.3.2.26",
            Self::Sha224 => "2.16.840.1.101.3.4.2.4",
            Self::Sha256 => "2.16.840.1.101.3.4.2.1",
            Self::Sha384 => "2.16.840.1.101.3.4.2.2",
            Self::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    pub fn from_oid(oid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.oid() == oid)
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(format!("unknown hash algorithm: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Elliptic curves
// ---------------------------------------------------------------------------

/// Named curves that appear on DSC and CSCA certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EcCurve {
    #[serde(rename = "secp224r1")]
    P224,
    #[serde(rename = "secp256r1")]
    P256,
    #[serde(rename = "secp384r1")]
    P384,
    #[serde(rename = "secp521r1")]
    P521,
    #[serde(rename = "brainpoolP256r1")]
    BrainpoolP256r1,
    #[serde(rename = "brainpoolP384r1")]
    BrainpoolP384r1,
    #[serde(rename = "brainpoolP512r1")]
    BrainpoolP512r1,
}

impl EcCurve {
    pub const ALL: [EcCurve; 7] = [
        Self::P224,
        Self::P256,
        Self::P384,
        Self::P521,
        Self::BrainpoolP256r1,
        Self::BrainpoolP384r1,
        Self::BrainpoolP512r1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P224 => "secp224r1",
            Self::P256 => "secp256r1",
            Self::P384 => "secp384r1",
            Self::P521 => "secp521r1",
            Self::BrainpoolP256r1 => "brainpoolP256r1",
            Self::BrainpoolP384r1 => "brainpoolP384r1",
            Self::BrainpoolP512r1 => "brainpoolP512r1",
        }
    }

    /// Size of the base field in bits.
    pub fn bits(&self) -> u32 {
        match self {
            Self::P224 => 224,
            Self::P256 | Self::BrainpoolP256r1 => 256,
            Self::P384 | Self::BrainpoolP384r1 => 384,
            Self::P521 => 521,
            Self::BrainpoolP512r1 => 512,
        }
    }

    /// Byte length of one affine coordinate.
    pub fn coordinate_len(&self) -> usize {
        (self.bits() as usize + 7) / 8
    }

    pub fn oid(&self) -> &'static str {
        match self {
            Self::P224 => "1.3.132.0.33",
            Self::P256 => "1.2.840.10045.3.1.7",
            Self::P384 => "1.3.132.0.34",
            Self::P521 => "1.3.132.0.35",
            Self::BrainpoolP256r1 => "1.3.36.3.3.2.8.1.1.7",
            Self::BrainpoolP384r1 => "1.3.36.3.3.2.8.1.1.11",
            Self::BrainpoolP512r1 => "1.3.36.3.3.2.8.1.1.13",
        }
    }

    pub fn from_oid(oid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.oid() == oid)
    }
}

impl std::fmt::Display for EcCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EcCurve {
    type Err = String;

    /// Accepts SEC names, NIST names (`P-256`), OpenSSL aliases and bare
    /// bit sizes for the NIST curves.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "secp224r1" | "p224" | "224" => Ok(Self::P224),
            "secp256r1" | "prime256v1" | "p256" | "256" => Ok(Self::P256),
            "secp384r1" | "p384" | "384" => Ok(Self::P384),
            "secp521r1" | "p521" | "521" => Ok(Self::P521),
            "brainpoolp256r1" => Ok(Self::BrainpoolP256r1),
            "brainpoolp384r1" => Ok(Self::BrainpoolP384r1),
            "brainpoolp512r1" => Ok(Self::BrainpoolP512r1),
            _ => Err(format!("unknown curve: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Signature algorithms
// ---------------------------------------------------------------------------

/// Signature scheme family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    /// RSASSA-PKCS1-v1_5.
    Rsa,
    /// RSASSA-PSS with MGF1 over the same hash and salt length = hash length.
    RsaPss,
    Ecdsa,
}

impl SignatureScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::RsaPss => "rsapss",
            Self::Ecdsa => "ecdsa",
        }
    }

    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::Rsa | Self::RsaPss)
    }
}

impl std::fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignatureScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "rsa" | "rsapkcs1" | "rsapkcs1v15" => Ok(Self::Rsa),
            "rsapss" | "rsassapss" => Ok(Self::RsaPss),
            "ecdsa" | "ec" => Ok(Self::Ecdsa),
            _ => Err(format!("unknown signature scheme: {s}")),
        }
    }
}

/// OID of RSASSA-PSS; the hash lives in the algorithm parameters.
pub const OID_RSASSA_PSS: &str = "1.2.840.113549.1.1.10";

/// A signature scheme paired with its message digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignatureAlgorithm {
    pub scheme: SignatureScheme,
    pub hash: HashAlgorithm,
}

impl SignatureAlgorithm {
    pub const fn new(scheme: SignatureScheme, hash: HashAlgorithm) -> Self {
        Self { scheme, hash }
    }

    /// Resolve a non-PSS X.509 signature algorithm OID. RSASSA-PSS needs its
    /// parameters and is resolved by the certificate parser.
    pub fn from_oid(oid: &str) -> Option<Self> {
        use HashAlgorithm::*;
        use SignatureScheme::*;
        let (scheme, hash) = match oid {
            "1.2.840.113549.1.1.5" => (Rsa, Sha1),
            "1.2.840.113549.1.1.11" => (Rsa, Sha256),
            "1.2.840.113549.1.1.12" => (Rsa, Sha384),
            "1.2.840.113549.1.1.13" => (Rsa, Sha512),
            "1.2.840.113549.1.1.14" => (Rsa, Sha224),
            "1.2.840.10045.4.1" => (Ecdsa, Sha1),
            "1.2.840.10045.4.3.1" => (Ecdsa, Sha224),
            "1.2.840.10045.4.3.2" => (Ecdsa, Sha256),
            "1.2.840.10045.4.3.3" => (Ecdsa, Sha384),
            "1.2.840.10045.4.3.4" => (Ecdsa, Sha512),
            _ => return None,
        };
        Some(Self::new(scheme, hash))
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.scheme, self.hash)
    }
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = String;

    /// Parses the `<scheme>_<hash>` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, hash) = s
            .rsplit_once('_')
            .ok_or_else(|| format!("expected <scheme>_<hash>: {s}"))?;
        Ok(Self::new(scheme.parse()?, hash.parse()?))
    }
}

// ---------------------------------------------------------------------------
// Curve or exponent
// ---------------------------------------------------------------------------

/// The public-key parameter that, together with the signature algorithm,
/// selects a circuit variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveOrExponent {
    Exponent(u32),
    Curve(EcCurve),
}

impl CurveOrExponent {
    /// Parse with knowledge of the scheme, since bare numbers like `256`
    /// are curves for ECDSA but would be exponents for RSA.
    pub fn parse_for(scheme: SignatureScheme, s: &str) -> Result<Self, String> {
        if scheme.is_rsa() {
            s.trim()
                .parse::<u32>()
                .map(Self::Exponent)
                .map_err(|_| format!("invalid RSA exponent: {s}"))
        } else {
            s.parse().map(Self::Curve)
        }
    }
}

impl std::fmt::Display for CurveOrExponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exponent(e) => write!(f, "{e}"),
            Self::Curve(c) => f.write_str(c.as_str()),
        }
    }
}
