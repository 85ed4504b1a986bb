//! # Circuit Input Errors
//!
//! Every failure the generator can report. Algorithm and tree failures
//! keep their core error types so the proving state machine routes them to
//! the right branch.

use docproof_core::{
    CertificateError, PackingOverflowError, ParseError, PipelineError, UnknownTreeError,
    UnsupportedAlgorithmError,
};
use docproof_crypto::TreeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CircuitError {
    /// No circuit variant exists for the signature parameters.
    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithmError),

    /// The tree lookup does not know a tree the circuit needs.
    #[error(transparent)]
    UnknownTree(#[from] UnknownTreeError),

    /// Proof construction against a protocol tree failed.
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    PackingOverflow(#[from] PackingOverflowError),

    /// The issuer chain does not verify.
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// The record lacks data the circuit consumes (e.g. registering from an
    /// MRZ-only scan).
    #[error("record lacks {0}")]
    MissingData(String),

    /// A byte input exceeds the circuit's fixed array size.
    #[error("{field} needs {len} bytes, circuit accepts at most {max}")]
    InputTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// The disclosure configuration is not well formed.
    #[error("invalid disclosure configuration: {0}")]
    InvalidConfig(String),

    /// A freshly built proof does not verify against its tree root.
    #[error("{tree} proof does not verify against the tree root")]
    InvalidProof { tree: String },

    /// A signature could not be decoded into circuit form.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

impl From<CircuitError> for PipelineError {
    fn from(e: CircuitError) -> Self {
        match e {
            CircuitError::UnsupportedAlgorithm(e) => PipelineError::UnsupportedAlgorithm(e),
            CircuitError::UnknownTree(e) => PipelineError::UnknownTree(e),
            CircuitError::Tree(e) => e.into(),
            CircuitError::PackingOverflow(e) => PipelineError::PackingOverflow(e),
            CircuitError::Certificate(e) => PipelineError::Certificate(e),
            CircuitError::MissingData(what) => {
                PipelineError::Parse(ParseError::UnsupportedFormat(format!("record lacks {what}")))
            }
            CircuitError::InputTooLarge { field, len, max } => {
                tracing::debug!(field, len, max, "circuit input exceeds its fixed size");
                PipelineError::PackingOverflow(PackingOverflowError { len, capacity: max })
            }
            other => PipelineError::Internal(other.to_string()),
        }
    }
}
