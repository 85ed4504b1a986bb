//! # Proving State Machine
//!
//! The states of one proving attempt and the pure function that moves
//! between them. No I/O happens here; the executor in [`crate::executor`]
//! performs each state's work and feeds the outcome back as a
//! [`ProvingEvent`].
//!
//! ## States
//!
//! ```text
//! IDLE ──▶ FETCHING_DATA ──▶ VALIDATING_DOCUMENT ──▶ INIT_TEE_CONNEXION
//!              │                    │                        │
//!              │                    ├──▶ PASSPORT_NOT_SUPPORTED
//!              ├──▶ PASSPORT_DATA_NOT_FOUND                  ▼
//!              └──────────┴──▶ ACCOUNT_RECOVERY_CHOICE  LISTENING_FOR_STATUS
//!                                                            │
//!                                                            ▼
//!                    COMPLETED ◀── POST_PROVING ◀── PROVING ◀── READY_TO_PROVE
//!
//! any non-final state ──▶ ERROR ──▶ FAILURE
//!                           └──(relay failure)──▶ INIT_TEE_CONNEXION
//! ```
//!
//! `COMPLETED` and `FAILURE` are terminal. The three branch states end the
//! session too; recovering from them needs a new session.

use docproof_core::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── States ──────────────────────────────────────────────────────────

/// The state of a proving session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvingState {
    Idle,
    FetchingData,
    ValidatingDocument,
    InitTeeConnexion,
    ListeningForStatus,
    ReadyToProve,
    Proving,
    PostProving,
    Completed,
    PassportNotSupported,
    AccountRecoveryChoice,
    PassportDataNotFound,
    Error,
    Failure,
}

impl ProvingState {
    pub const ALL: [ProvingState; 14] = [
        Self::Idle,
        Self::FetchingData,
        Self::ValidatingDocument,
        Self::InitTeeConnexion,
        Self::ListeningForStatus,
        Self::ReadyToProve,
        Self::Proving,
        Self::PostProving,
        Self::Completed,
        Self::PassportNotSupported,
        Self::AccountRecoveryChoice,
        Self::PassportDataNotFound,
        Self::Error,
        Self::Failure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingData => "fetching_data",
            Self::ValidatingDocument => "validating_document",
            Self::InitTeeConnexion => "init_tee_connexion",
            Self::ListeningForStatus => "listening_for_status",
            Self::ReadyToProve => "ready_to_prove",
            Self::Proving => "proving",
            Self::PostProving => "post_proving",
            Self::Completed => "completed",
            Self::PassportNotSupported => "passport_not_supported",
            Self::AccountRecoveryChoice => "account_recovery_choice",
            Self::PassportDataNotFound => "passport_data_not_found",
            Self::Error => "error",
            Self::Failure => "failure",
        }
    }

    /// `completed` or `failure`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failure)
    }

    /// One of the side branches that end the session without a proof.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            Self::PassportNotSupported | Self::AccountRecoveryChoice | Self::PassportDataNotFound
        )
    }

    /// No event other than a retry or fail can leave this state.
    pub fn is_final(&self) -> bool {
        self.is_terminal() || self.is_branch()
    }

    /// States during which the relay and prover are busy, and for which a
    /// duration estimate is shown.
    pub fn in_estimate_window(&self) -> bool {
        matches!(
            self,
            Self::InitTeeConnexion
                | Self::ListeningForStatus
                | Self::ReadyToProve
                | Self::Proving
                | Self::PostProving
        )
    }
}

impl std::fmt::Display for ProvingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Events ──────────────────────────────────────────────────────────

/// The outcome of a state's work, as reported to [`transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", content = "kind", rename_all = "snake_case")]
pub enum ProvingEvent {
    Start,
    DataFetched,
    /// No document data is available for the session.
    DataNotFound,
    DocumentValidated,
    /// The document or its signature algorithm has no circuit.
    DocumentNotSupported,
    /// The document is already registered under this secret.
    AlreadyRegistered,
    TeeConnected,
    StatusReceived,
    ProveConfirmed,
    ProofGenerated,
    ProofRecorded,
    /// A component failed while working on the current state.
    Failed(ErrorKind),
    /// Re-enter `init_tee_connexion` after the recorded relay failure.
    Retry(ErrorKind),
    /// Give up after an error.
    Fail,
}

impl ProvingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::DataFetched => "data_fetched",
            Self::DataNotFound => "data_not_found",
            Self::DocumentValidated => "document_validated",
            Self::DocumentNotSupported => "document_not_supported",
            Self::AlreadyRegistered => "already_registered",
            Self::TeeConnected => "tee_connected",
            Self::StatusReceived => "status_received",
            Self::ProveConfirmed => "prove_confirmed",
            Self::ProofGenerated => "proof_generated",
            Self::ProofRecorded => "proof_recorded",
            Self::Failed(_) => "failed",
            Self::Retry(_) => "retry",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for ProvingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(kind) | Self::Retry(kind) => write!(f, "{}({kind})", self.name()),
            other => f.write_str(other.name()),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A transition that the machine refuses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The event is not accepted in the current state.
    #[error("illegal transition from {from} on {event}")]
    Illegal {
        /// Current state.
        from: String,
        /// Rejected event.
        event: String,
    },

    /// Only relay failures can be retried.
    #[error("a {kind} failure cannot be retried")]
    NotRetryable {
        /// Kind of the recorded failure.
        kind: ErrorKind,
    },

    /// The session was cancelled; no further transitions happen.
    #[error("session cancelled")]
    Cancelled,
}

// ─── Transition function ─────────────────────────────────────────────

/// Compute the state that follows `from` on `event`.
///
/// Pure and total: every pair either yields the next state or a
/// [`TransitionError`].
pub fn transition(from: ProvingState, event: ProvingEvent) -> Result<ProvingState, TransitionError> {
    use ProvingEvent as E;
    use ProvingState as S;

    let next = match (from, event) {
        (S::Idle, E::Start) => S::FetchingData,

        (S::FetchingData, E::DataFetched) => S::ValidatingDocument,
        (S::FetchingData, E::DataNotFound) => S::PassportDataNotFound,
        (S::FetchingData | S::ValidatingDocument, E::DocumentNotSupported) => {
            S::PassportNotSupported
        }
        (S::FetchingData | S::ValidatingDocument, E::AlreadyRegistered) => {
            S::AccountRecoveryChoice
        }

        (S::ValidatingDocument, E::DocumentValidated) => S::InitTeeConnexion,
        (S::InitTeeConnexion, E::TeeConnected) => S::ListeningForStatus,
        (S::ListeningForStatus, E::StatusReceived) => S::ReadyToProve,
        (S::ReadyToProve, E::ProveConfirmed) => S::Proving,
        (S::Proving, E::ProofGenerated) => S::PostProving,
        (S::PostProving, E::ProofRecorded) => S::Completed,

        (S::Error, E::Retry(kind)) => {
            if !kind.is_relay() {
                return Err(TransitionError::NotRetryable { kind });
            }
            S::InitTeeConnexion
        }
        (S::Error, E::Fail) => S::Failure,

        (state, E::Failed(_)) if !state.is_final() && state != S::Error => S::Error,

        (state, event) => {
            return Err(TransitionError::Illegal {
                from: state.to_string(),
                event: event.to_string(),
            })
        }
    };
    Ok(next)
}

// ─── Tests ───────────────────────────────────────────────────────────
