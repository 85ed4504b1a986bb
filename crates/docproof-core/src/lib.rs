//! # docproof-core — Foundational Types for the Document-to-Proof Pipeline
//!
//! This crate is the leaf of the workspace DAG. It defines the records that
//! flow between the parser, the commitment engine, the circuit input
//! generator and the proving state machine, plus the single error taxonomy
//! every component reports through.
//!
//! ## Key Design Principles
//!
//! 1. **Validated newtypes for MRZ primitives.** [`DocumentNumber`] holds at
//!    most nine characters, [`MrzDate`] exactly six digits. Constructors are
//!    the only way in, and deserialization goes through them.
//!
//! 2. **Content hashes flow through [`CanonicalBytes`].** A
//!    [`DocumentRecord`] computes its content hash once, at construction,
//!    over the JCS-canonical form of its normalized fields.
//!
//! 3. **Closed algorithm identifiers.** [`HashAlgorithm`], [`EcCurve`] and
//!    [`SignatureAlgorithm`] are enums. String names are parsed at the
//!    boundary and never matched deeper in the pipeline.
//!
//! 4. **One error-kind table.** [`ErrorKind::message_key`] is the mapping the
//!    UI collaborator renders from; [`PipelineError::kind`] routes every
//!    concrete error onto it.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `docproof-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod algorithm;
pub mod canonical;
pub mod certificate;
pub mod digest;
pub mod document;
pub mod error;
pub mod identity;
pub mod serde_bytes;

pub use algorithm::{
    CurveOrExponent, EcCurve, HashAlgorithm, SignatureAlgorithm, SignatureScheme, OID_RSASSA_PSS,
};
pub use canonical::CanonicalBytes;
pub use certificate::{
    CertificateChain, CertificateRecord, PublicKeyKind, PublicKeyParams, RsaPssParams,
};
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use document::{
    AadhaarData, AttestationId, CanonicalDocument, ChipData, DocumentCategory, DocumentRecord,
    HolderIdentity, RawDocument, Sex,
};
pub use error::{
    CanonicalizationError, CertificateError, ConnectionError, ErrorKind, NotFoundError,
    PackingOverflowError, ParseError, PipelineError, RelayRejectedError, RelayTimeoutError,
    UnknownTreeError, UnsupportedAlgorithmError, ERROR_MESSAGE_KEYS,
};
pub use identity::{DocumentNumber, MrzDate, ValidationError};
