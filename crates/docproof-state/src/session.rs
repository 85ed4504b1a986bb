//! # Proving Session
//!
//! One in-flight proving attempt: its inputs, its current
//! [`ProvingState`], an ordered transition log and per-state timing.
//!
//! Cancellation is bookkeeping outside the proving states. A cancelled
//! session keeps whatever state it was in and refuses every further
//! transition.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use docproof_circuits::{CircuitInputs, Operation, SelfAppConfig};
use docproof_core::{CertificateRecord, DocumentCategory, DocumentRecord, ErrorKind, PipelineError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::estimate::{AlgorithmFamily, ProvingTimeEstimate};
use crate::proving::{transition, ProvingEvent, ProvingState, TransitionError};

/// One entry of the transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ProvingState,
    pub to: ProvingState,
    pub event: ProvingEvent,
    pub at: DateTime<Utc>,
}

/// The failure that moved the session into `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub kind: ErrorKind,
    pub message_key: String,
    pub message: String,
}

impl From<&PipelineError> for SessionFailure {
    fn from(e: &PipelineError) -> Self {
        Self {
            kind: e.kind(),
            message_key: e.message_key().to_string(),
            message: e.to_string(),
        }
    }
}

/// A proving attempt owned by exactly one executor run.
#[derive(Debug)]
pub struct ProvingSession {
    pub id: Uuid,
    pub operation: Operation,
    pub document: Option<DocumentRecord>,
    /// The document signer for register, the DSC itself for dsc.
    pub certificate: Option<CertificateRecord>,
    /// The CSCA that issued `certificate`; dsc only.
    pub issuer: Option<CertificateRecord>,
    /// Disclosure request; disclose only.
    pub app: Option<SelfAppConfig>,
    /// Inputs generated while validating the document.
    pub inputs: Option<CircuitInputs>,
    /// Proof object returned by the relay.
    pub proof: Option<serde_json::Value>,
    state: ProvingState,
    transitions: Vec<TransitionRecord>,
    entered: HashMap<ProvingState, Instant>,
    started: Instant,
    cancelled: bool,
    last_error: Option<SessionFailure>,
    relay_attempts: u32,
}

impl ProvingSession {
    /// A fresh session in `idle`.
    pub fn new(operation: Operation) -> Self {
        let started = Instant::now();
        Self {
            id: Uuid::new_v4(),
            operation,
            document: None,
            certificate: None,
            issuer: None,
            app: None,
            inputs: None,
            proof: None,
            state: ProvingState::Idle,
            transitions: Vec::new(),
            entered: HashMap::from([(ProvingState::Idle, started)]),
            started,
            cancelled: false,
            last_error: None,
            relay_attempts: 0,
        }
    }

    pub fn with_document(mut self, document: DocumentRecord) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_certificate(mut self, certificate: CertificateRecord) -> Self {
        self.certificate = Some(certificate);
        self
    }

    pub fn with_issuer(mut self, issuer: CertificateRecord) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn with_app(mut self, app: SelfAppConfig) -> Self {
        self.app = Some(app);
        self
    }

    pub fn state(&self) -> ProvingState {
        self.state
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn last_error(&self) -> Option<&SessionFailure> {
        self.last_error.as_ref()
    }

    /// How many times `init_tee_connexion` has been entered.
    pub fn relay_attempts(&self) -> u32 {
        self.relay_attempts
    }

    /// Stop the session. Idempotent.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            tracing::info!(session = %self.id, state = %self.state, "session cancelled");
        }
        self.cancelled = true;
    }

    /// Apply `event` and record the transition.
    pub fn apply(&mut self, event: ProvingEvent) -> Result<ProvingState, TransitionError> {
        if self.cancelled {
            return Err(TransitionError::Cancelled);
        }
        let from = self.state;
        let to = transition(from, event)?;
        tracing::info!(session = %self.id, %from, %to, %event, "state transition");

        self.transitions.push(TransitionRecord {
            from,
            to,
            event,
            at: Utc::now(),
        });
        self.entered.insert(to, Instant::now());
        if to == ProvingState::InitTeeConnexion {
            self.relay_attempts += 1;
        }
        self.state = to;
        Ok(to)
    }

    /// Remember `error` as the reason the session stopped progressing.
    pub fn note_failure(&mut self, error: &PipelineError) {
        tracing::warn!(
            session = %self.id,
            state = %self.state,
            kind = %error.kind(),
            error = %error,
            "proving step failed"
        );
        self.last_error = Some(SessionFailure::from(error));
    }

    /// Record `error` and move to `error`.
    pub fn fail_with(&mut self, error: &PipelineError) -> Result<ProvingState, TransitionError> {
        self.note_failure(error);
        self.apply(ProvingEvent::Failed(error.kind()))
    }

    /// Category whose trees the session reads. DSC sessions without a
    /// document use the passport trees.
    pub fn category(&self) -> DocumentCategory {
        self.document
            .as_ref()
            .map_or(DocumentCategory::Passport, |d| d.category)
    }

    /// Time since the session was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time since `state` was last entered, if it ever was.
    pub fn time_in(&self, state: ProvingState) -> Option<Duration> {
        self.entered.get(&state).map(Instant::elapsed)
    }

    /// Signature family of whatever the current operation proves.
    pub fn algorithm_family(&self) -> Option<AlgorithmFamily> {
        match self.operation {
            Operation::Dsc => {
                let dsc = self.certificate.as_ref()?;
                let issuer = self.issuer.as_ref()?;
                AlgorithmFamily::from_parts(
                    dsc.signature_algorithm,
                    Some(issuer.public_key.curve_or_exponent()),
                )
            }
            Operation::Register | Operation::Disclose => {
                let doc = self.document.as_ref()?;
                AlgorithmFamily::from_parts(doc.signature_algorithm, doc.curve_or_exponent)
            }
        }
    }

    /// Estimate for the current state, or `None` outside the proving window.
    pub fn estimate(&self) -> Option<ProvingTimeEstimate> {
        self.state.estimate(self.algorithm_family(), self.operation)
    }

    /// Serializable summary for logs and the CLI.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            id: self.id,
            operation: self.operation.to_string(),
            state: self.state,
            cancelled: self.cancelled,
            circuit_id: self.inputs.as_ref().map(|i| i.circuit_id.clone()),
            relay_attempts: self.relay_attempts,
            elapsed_ms: u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX),
            error: self.last_error.clone(),
            transitions: self.transitions.clone(),
        }
    }
}

/// Snapshot of a session, without secrets or payloads.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub id: Uuid,
    pub operation: String,
    pub state: ProvingState,
    pub cancelled: bool,
    pub circuit_id: Option<String>,
    pub relay_attempts: u32,
    pub elapsed_ms: u64,
    pub error: Option<SessionFailure>,
    pub transitions: Vec<TransitionRecord>,
}
