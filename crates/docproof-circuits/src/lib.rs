//! # docproof-circuits — Circuit Input Generation
//!
//! Turns parsed documents, certificates and protocol trees into the named
//! numeric inputs of the register, DSC and disclose circuits.
//!
//! ## Dispatch
//!
//! [`CircuitVariant`] is a closed enum. Selection from a record's
//! `(signature algorithm, curve or exponent)` and the signer's key size is
//! total: every combination either maps to exactly one variant or fails
//! with [`docproof_core::UnsupportedAlgorithmError`].
//!
//! ## Operations
//!
//! - [`generate_register_inputs`]: document + DSC + user secret.
//! - [`generate_dsc_inputs`]: DSC + CSCA + CSCA tree.
//! - [`generate_disclose_inputs`]: user secret + document + [`SelfAppConfig`]
//!   + a [`TreeLookup`] resolving `"commitment"` and `"ofac"` per category.
//!
//! Each returns [`CircuitInputs`]: the signals for the witness generator
//! plus the public outputs (commitment, nullifier, roots) the resulting
//! proof must reproduce.
//!
//! ## Crate Policy
//!
//! - Pure: no I/O beyond the read-only tree lookups.
//! - Every Merkle proof is verified locally before it is emitted.

pub mod disclose;
pub mod dsc;
pub mod encode;
pub mod error;
pub mod inputs;
pub mod register;
pub mod variant;

pub use disclose::{
    generate_disclose_inputs, generate_disclose_inputs_at, Disclosures, SelfAppConfig, TreeLookup,
    TreeRegistry,
};
pub use dsc::generate_dsc_inputs;
pub use encode::Signal;
pub use error::CircuitError;
pub use inputs::CircuitInputs;
pub use register::generate_register_inputs;
pub use variant::{CircuitVariant, Operation, RsaBits, RsaExponent, SignatureVariant};
