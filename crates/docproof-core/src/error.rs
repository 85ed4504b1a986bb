//! # Error Types — Pipeline Failure Taxonomy
//!
//! Every component of the pipeline reports failures through one of the
//! concrete error types below. [`PipelineError`] aggregates them so the
//! proving state machine can route any failure with a single `match` on
//! [`ErrorKind`].
//!
//! ## Design
//!
//! - Parse and certificate errors carry the offending field or encoding
//!   detail so operators can diagnose a rejected scan.
//! - Relay errors distinguish transport failure, timeout, and application
//!   rejection; only the state machine decides whether to retry.
//! - [`ErrorKind::message_key`] is the stable error-kind → message-key table
//!   consumed by the UI layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure decoding a raw scan into a document record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input cannot be decoded into the expected record shape
    /// (wrong line length, illegal characters, missing fields).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A check digit or embedded hash does not match the data it covers.
    #[error("checksum mismatch in {field}: {detail}")]
    ChecksumMismatch {
        /// Field whose check failed.
        field: String,
        /// Expected vs found values.
        detail: String,
    },

    /// The input is well formed but not a format this pipeline handles.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Failure decoding or verifying an issuer certificate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// Public key algorithm or named curve is not supported.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// PEM/DER/ASN.1 decoding failed.
    #[error("malformed certificate encoding: {0}")]
    MalformedEncoding(String),

    /// Brute-force detection exhausted every candidate without a verifying
    /// signature.
    #[error("no candidate signature algorithm verifies the signature")]
    NoMatchingAlgorithm,
}

/// Input bytes do not fit into the field-element packing capacity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("input of {len} bytes exceeds packing capacity of {capacity} bytes")]
pub struct PackingOverflowError {
    /// Length of the rejected input.
    pub len: usize,
    /// Maximum number of bytes that can be packed.
    pub capacity: usize,
}

/// No circuit variant exists for a signature algorithm / parameter pair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported signature algorithm {algorithm} with {curve_or_exponent}")]
pub struct UnsupportedAlgorithmError {
    /// Algorithm name as presented.
    pub algorithm: String,
    /// Curve or exponent as presented.
    pub curve_or_exponent: String,
}

/// A disclosure path named a tree the protocol does not define.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown tree: {name}")]
pub struct UnknownTreeError {
    /// The unrecognised tree name.
    pub name: String,
}

/// A key is absent from a Merkle tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("key {key} not found in {tree} tree")]
pub struct NotFoundError {
    /// Tree kind that was queried.
    pub tree: String,
    /// Hex form of the missing key.
    pub key: String,
}

/// The relay socket could not be established or was lost.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Connecting to the relay endpoint failed.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Endpoint URL.
        url: String,
        /// Transport-level reason.
        reason: String,
    },

    /// The relay closed the socket before answering.
    #[error("relay closed the connection: {reason}")]
    Closed {
        /// Close frame reason, if any.
        reason: String,
    },

    /// Reading or writing a frame failed.
    #[error("relay transport error: {0}")]
    Transport(String),

    /// The relay sent a frame that is not a structured response.
    #[error("relay protocol violation: {0}")]
    Protocol(String),

    /// A request was already sent on this connection.
    #[error("a request was already sent on this connection")]
    AlreadySent,
}

/// No relay response arrived inside the configured window.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("relay did not respond within {timeout:?}")]
pub struct RelayTimeoutError {
    /// The window that elapsed.
    pub timeout: Duration,
}

/// The relay answered with an application-level failure code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("relay rejected the request: {code}")]
pub struct RelayRejectedError {
    /// Failure code reported by the relay.
    pub code: String,
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values have no deterministic canonical form.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Error kinds and message keys
// ---------------------------------------------------------------------------

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    Certificate,
    PackingOverflow,
    UnsupportedAlgorithm,
    UnknownTree,
    NotFound,
    Connection,
    RelayTimeout,
    RelayRejected,
    /// Invariant breach inside the pipeline itself.
    Internal,
}

/// Error kind → message key, in declaration order.
pub const ERROR_MESSAGE_KEYS: &[(ErrorKind, &str)] = &[
    (ErrorKind::Parse, "document_invalid"),
    (ErrorKind::Certificate, "certificate_invalid"),
    (ErrorKind::PackingOverflow, "document_too_large"),
    (ErrorKind::UnsupportedAlgorithm, "document_not_supported"),
    (ErrorKind::UnknownTree, "protocol_misconfigured"),
    (ErrorKind::NotFound, "not_registered"),
    (ErrorKind::Connection, "tee_connection_failed"),
    (ErrorKind::RelayTimeout, "tee_timeout"),
    (ErrorKind::RelayRejected, "tee_rejected"),
    (ErrorKind::Internal, "unexpected_error"),
];

impl ErrorKind {
    /// The message key the UI layer renders for this kind.
    pub fn message_key(self) -> &'static str {
        match self {
            Self::Parse => "document_invalid",
            Self::Certificate => "certificate_invalid",
            Self::PackingOverflow => "document_too_large",
            Self::UnsupportedAlgorithm => "document_not_supported",
            Self::UnknownTree => "protocol_misconfigured",
            Self::NotFound => "not_registered",
            Self::Connection => "tee_connection_failed",
            Self::RelayTimeout => "tee_timeout",
            Self::RelayRejected => "tee_rejected",
            Self::Internal => "unexpected_error",
        }
    }

    /// Relay failures are the only ones a retry can fix.
    pub fn is_relay(self) -> bool {
        matches!(
            self,
            Self::Connection | Self::RelayTimeout | Self::RelayRejected
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message_key())
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Any failure raised by a pipeline component.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    PackingOverflow(#[from] PackingOverflowError),

    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithmError),

    #[error(transparent)]
    UnknownTree(#[from] UnknownTreeError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    RelayTimeout(#[from] RelayTimeoutError),

    #[error(transparent)]
    RelayRejected(#[from] RelayRejectedError),

    /// Canonical serialization of a record failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Invariant breach inside the pipeline.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Classify this error for routing and message lookup.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::Certificate(_) => ErrorKind::Certificate,
            Self::PackingOverflow(_) => ErrorKind::PackingOverflow,
            Self::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Self::UnknownTree(_) => ErrorKind::UnknownTree,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Connection(_) => ErrorKind::Connection,
            Self::RelayTimeout(_) => ErrorKind::RelayTimeout,
            Self::RelayRejected(_) => ErrorKind::RelayRejected,
            Self::Canonicalization(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind().message_key()`.
    pub fn message_key(&self) -> &'static str {
        self.kind().message_key()
    }
}
