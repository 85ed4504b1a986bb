//! # Proving Time Estimates
//!
//! Progress-display estimates keyed by signature family and operation.
//! They are display hints only and never drive a timeout.
//!
//! | family            | dsc | register |
//! |-------------------|-----|----------|
//! | RSA               | 2   | 4        |
//! | RSA-PSS           | 3   | 6        |
//! | ECDSA 224/256     | 25  | 50       |
//! | ECDSA 384         | 45  | 90       |
//! | ECDSA 512/521     | 100 | 200      |
//! | anything else     | 30 - 90         |

use docproof_circuits::Operation;
use docproof_core::{CurveOrExponent, EcCurve, SignatureAlgorithm, SignatureScheme};
use serde::Serialize;

use crate::proving::ProvingState;

/// Signature family, at the granularity the estimate table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "family", content = "bits", rename_all = "snake_case")]
pub enum AlgorithmFamily {
    Rsa,
    RsaPss,
    /// ECDSA with the curve's field size in bits.
    Ecdsa(u32),
}

impl AlgorithmFamily {
    /// Family of a typed algorithm. ECDSA needs the curve.
    pub fn from_parts(
        algorithm: Option<SignatureAlgorithm>,
        curve_or_exponent: Option<CurveOrExponent>,
    ) -> Option<Self> {
        match algorithm?.scheme {
            SignatureScheme::Rsa => Some(Self::Rsa),
            SignatureScheme::RsaPss => Some(Self::RsaPss),
            SignatureScheme::Ecdsa => match curve_or_exponent? {
                CurveOrExponent::Curve(curve) => Some(Self::Ecdsa(curve.bits())),
                CurveOrExponent::Exponent(_) => None,
            },
        }
    }

    /// Family from free-form names such as `("rsapss_sha256", "65537")` or
    /// `("ECDSA", "secp384r1")`. ECDSA also accepts a bare bit size.
    pub fn parse(algorithm: &str, curve_or_exponent: &str) -> Option<Self> {
        let normalized = algorithm.trim().to_ascii_lowercase().replace(['-', '_'], "");
        if normalized.starts_with("rsapss") || normalized.starts_with("rsassapss") {
            Some(Self::RsaPss)
        } else if normalized.starts_with("rsa") {
            Some(Self::Rsa)
        } else if normalized.starts_with("ecdsa") {
            let coe = curve_or_exponent.trim();
            coe.parse::<EcCurve>()
                .map(|c| c.bits())
                .ok()
                .or_else(|| coe.parse::<u32>().ok())
                .map(Self::Ecdsa)
        } else {
            None
        }
    }

    /// Table lookup. `None` for the disclose operation and for ECDSA sizes
    /// outside the table.
    pub fn seconds(&self, operation: Operation) -> Option<u32> {
        let (dsc, register) = match self {
            Self::Rsa => (2, 4),
            Self::RsaPss => (3, 6),
            Self::Ecdsa(224 | 256) => (25, 50),
            Self::Ecdsa(384) => (45, 90),
            Self::Ecdsa(512 | 521) => (100, 200),
            Self::Ecdsa(_) => return None,
        };
        match operation {
            Operation::Dsc => Some(dsc),
            Operation::Register => Some(register),
            Operation::Disclose => None,
        }
    }
}

/// An estimated proving duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvingTimeEstimate {
    Seconds(u32),
    /// Unknown algorithm or operation.
    Default,
}

impl ProvingTimeEstimate {
    pub fn for_family(family: Option<AlgorithmFamily>, operation: Operation) -> Self {
        family
            .and_then(|f| f.seconds(operation))
            .map_or(Self::Default, Self::Seconds)
    }
}

impl std::fmt::Display for ProvingTimeEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seconds(n) => write!(f, "{n} SECONDS"),
            Self::Default => f.write_str("30 - 90 SECONDS"),
        }
    }
}

/// Display string for an `(algorithm, curve or exponent, operation)`
/// triple, e.g. `"45 SECONDS"`. Unrecognised input yields
/// `"30 - 90 SECONDS"`.
pub fn proving_time_estimate(algorithm: &str, curve_or_exponent: &str, operation: &str) -> String {
    let family = AlgorithmFamily::parse(algorithm, curve_or_exponent);
    match operation.parse::<Operation>() {
        Ok(op) => ProvingTimeEstimate::for_family(family, op).to_string(),
        Err(_) => ProvingTimeEstimate::Default.to_string(),
    }
}

impl ProvingState {
    /// The estimate to show while in this state, or `None` outside the
    /// proving window.
    pub fn estimate(
        &self,
        family: Option<AlgorithmFamily>,
        operation: Operation,
    ) -> Option<ProvingTimeEstimate> {
        self.in_estimate_window()
            .then(|| ProvingTimeEstimate::for_family(family, operation))
    }
}
