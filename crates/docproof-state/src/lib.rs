//! # docproof-state — Proving State Machine
//!
//! Drives one proving attempt from a parsed document to a verified proof.
//! The machine is split in two halves:
//!
//! - [`proving::transition`]: a pure `(state, event) → state` function with
//!   no I/O, exhaustively testable.
//! - [`executor::ProvingMachine`]: the async effect executor. It performs
//!   the work attached to each state (secret lookup, tree fetch, input
//!   generation, relay round trip) and feeds the resulting event back.
//!
//! ## States
//!
//! ```text
//! idle → fetching_data → validating_document → init_tee_connexion
//!      → listening_for_status → ready_to_prove → proving
//!      → post_proving → completed
//! ```
//!
//! Branches: `passport_data_not_found`, `passport_not_supported`,
//! `account_recovery_choice`. Any non-final state may move to `error`;
//! from `error` a relay failure may retry into `init_tee_connexion`,
//! anything else goes to `failure`.
//!
//! ## Modules
//!
//! - [`session`]: session record, transition log and per-state timing.
//! - [`estimate`]: proving time estimates by algorithm family.
//! - [`config`]: YAML configuration with `DOCPROOF_*` env overrides.
//! - [`collaborators`]: secret store and protocol state interfaces.
//!
//! ## Crate Policy
//!
//! - Cancellation is observed at every await; a cancelled session closes
//!   its relay socket and accepts no further transitions.
//! - The user secret never appears in logs or session reports.

pub mod collaborators;
pub mod config;
pub mod estimate;
pub mod executor;
pub mod proving;
pub mod session;

// ─── State machine re-exports ───────────────────────────────────────

pub use proving::{transition, ProvingEvent, ProvingState, TransitionError};
pub use session::{ProvingSession, SessionFailure, SessionReport, TransitionRecord};

// ─── Executor re-exports ────────────────────────────────────────────

pub use executor::{
    check_public_signals, CancelHandle, ConfirmHandle, ProvingMachine, RunOutcome,
    PUBLIC_SIGNAL_MISMATCH,
};

// ─── Supporting re-exports ──────────────────────────────────────────

pub use collaborators::{
    CategoryTree, MemorySecretStore, ProtocolSnapshot, ProtocolState, SecretStore,
    StaticProtocolState,
};
pub use config::{ConfigError, PipelineConfig};
pub use estimate::{proving_time_estimate, AlgorithmFamily, ProvingTimeEstimate};
