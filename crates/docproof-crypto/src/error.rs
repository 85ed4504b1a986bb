//! # Cryptographic Error Types
//!
//! Structured errors for the primitives in `docproof-crypto`. Tree lookups
//! that miss surface the core [`NotFoundError`]; byte inputs too long to
//! pack surface the core [`PackingOverflowError`].

use docproof_core::{NotFoundError, PackingOverflowError, PipelineError};
use thiserror::Error;

/// Errors from encryption, key agreement and field-element decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AES-256-GCM sealing failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// AES-256-GCM opening failed (wrong key, nonce, or tampered data).
    #[error("decryption failed")]
    Decryption,

    /// Key material has the wrong length.
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    /// ECDH with the peer public key failed.
    #[error("key agreement failed: {0}")]
    KeyAgreement(String),

    /// A value is not the canonical encoding of a field element.
    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),

    #[error(transparent)]
    PackingOverflow(#[from] PackingOverflowError),
}

/// Errors from building or querying a Merkle tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    PackingOverflow(#[from] PackingOverflowError),

    /// More leaves than `2^depth`.
    #[error("{tree} tree holds at most {capacity} leaves, got {got}")]
    CapacityExceeded { tree: String, capacity: u64, got: usize },

    /// The same key was supplied twice.
    #[error("duplicate key {key} in {tree} tree")]
    DuplicateKey { tree: String, key: String },

    /// The key collides with an OFAC range sentinel.
    #[error("key {0} is reserved for range sentinels")]
    ReservedKey(String),

    /// Exclusion proofs exist only for sorted trees.
    #[error("{0} tree does not support exclusion proofs")]
    ExclusionUnsupported(String),

    /// Asked to prove exclusion of a key that is in the tree.
    #[error("key {key} is present in {tree} tree")]
    KeyPresent { tree: String, key: String },

    /// Leaf source does not match the requested tree kind.
    #[error("leaf source {source_kind} cannot be hashed for the {tree} tree")]
    KindMismatch { source_kind: String, tree: String },
}

impl From<CryptoError> for PipelineError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::PackingOverflow(p) => PipelineError::PackingOverflow(p),
            other => PipelineError::Internal(other.to_string()),
        }
    }
}

impl From<TreeError> for PipelineError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::NotFound(n) => PipelineError::NotFound(n),
            TreeError::PackingOverflow(p) => PipelineError::PackingOverflow(p),
            other => PipelineError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproof_core::ErrorKind;

    #[test]
    fn invalid_key_length_display() {
        let err = CryptoError::InvalidKeyLength {
            expected: 32,
            got: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("32 bytes"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn tree_not_found_routes_to_not_found_kind() {
        let err = TreeError::NotFound(NotFoundError {
            tree: "csca".into(),
            key: "0x01".into(),
        });
        let p: PipelineError = err.into();
        assert_eq!(p.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn packing_overflow_keeps_its_kind() {
        let p: PipelineError = CryptoError::PackingOverflow(PackingOverflowError {
            len: 500,
            capacity: 496,
        })
        .into();
        assert_eq!(p.kind(), ErrorKind::PackingOverflow);

        let p: PipelineError = CryptoError::Decryption.into();
        assert_eq!(p.kind(), ErrorKind::Internal);
    }
}
