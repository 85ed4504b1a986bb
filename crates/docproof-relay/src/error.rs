//! # Relay Error Types
//!
//! [`RelayError`] wraps the three relay failures of the core taxonomy plus
//! the local failures that can occur before a frame is ever sent.

use docproof_core::{ConnectionError, PipelineError, RelayRejectedError, RelayTimeoutError};
use docproof_crypto::CryptoError;
use thiserror::Error;

/// Errors from a relay round trip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Timeout(#[from] RelayTimeoutError),

    #[error(transparent)]
    Rejected(#[from] RelayRejectedError),

    /// Sealing the payload failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The relay URL is unparseable or not a WebSocket URL.
    #[error("invalid relay url {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The environment name is not one of `production`, `staging`, `local`.
    #[error("unknown relay environment: {0}")]
    UnknownEnvironment(String),

    /// A wire field could not be encoded or decoded.
    #[error("relay payload encoding error: {0}")]
    Encoding(String),
}

impl From<RelayError> for PipelineError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Connection(c) => PipelineError::Connection(c),
            RelayError::Timeout(t) => PipelineError::RelayTimeout(t),
            RelayError::Rejected(r) => PipelineError::RelayRejected(r),
            RelayError::Crypto(c) => c.into(),
            RelayError::InvalidUrl { url, reason } => {
                PipelineError::Connection(ConnectionError::Connect { url, reason })
            }
            other => PipelineError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproof_core::ErrorKind;
    use std::time::Duration;

    #[test]
    fn relay_failures_keep_their_kind() {
        let cases: Vec<(RelayError, ErrorKind)> = vec![
            (
                ConnectionError::Closed { reason: "bye".into() }.into(),
                ErrorKind::Connection,
            ),
            (
                RelayTimeoutError { timeout: Duration::from_secs(1) }.into(),
                ErrorKind::RelayTimeout,
            ),
            (
                RelayRejectedError { code: "attestation_failed".into() }.into(),
                ErrorKind::RelayRejected,
            ),
            (
                RelayError::InvalidUrl { url: "http://x".into(), reason: "scheme".into() },
                ErrorKind::Connection,
            ),
            (RelayError::Encoding("nonce".into()), ErrorKind::Internal),
        ];
        for (err, kind) in cases {
            assert_eq!(PipelineError::from(err).kind(), kind);
        }
    }
}
