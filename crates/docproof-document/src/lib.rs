//! # docproof-document — Document and Certificate Parsing
//!
//! Turns what the scanner hands over into typed records:
//!
//! - **MRZ** text (TD1, TD2, TD3) with ICAO 9303 check digits ([`mrz`]).
//! - **Chip** payloads read over NFC: DG1 reconstruction, hash-chain
//!   recovery, and DSC signature-algorithm detection ([`chip`]).
//! - **Aadhaar** secure-QR payloads ([`aadhaar`]).
//! - **X.509** DSC and CSCA certificates, including brute-force detection
//!   of an untagged signature algorithm ([`certificate`]).
//!
//! [`validate`] re-derives every check on a parsed record and
//! [`infer_document_category`] classifies a record from its structure.
//!
//! ## Crate Policy
//!
//! - Parsing and validation are pure: no I/O, no clocks, no randomness.
//! - `parse` reports shape problems as errors; check-digit problems are
//!   reported by `validate` unless [`ParseOptions::strict`] is requested.
//! - Holder data is never logged; only categories, algorithms and
//!   content hashes appear in traces.

pub mod aadhaar;
pub mod category;
pub mod certificate;
pub mod chip;
pub mod mrz;
pub mod parser;
pub mod validate;

pub use category::{infer_document_category, InferredCategory};
pub use certificate::{
    detect_signature_algorithm, parse_certificate, verify_issued_by, verify_signature,
};
pub use mrz::{check_digit, MrzFormat};
pub use parser::{parse, parse_with, CategoryHint, ParseOptions, RawScan};
pub use validate::{validate, ValidationResult};
