//! # Effect Executor
//!
//! [`ProvingMachine`] performs the work attached to each [`ProvingState`]
//! and feeds the outcome back through [`ProvingSession::apply`]:
//!
//! | state                  | work                                              |
//! |------------------------|---------------------------------------------------|
//! | `idle`                 | start                                             |
//! | `fetching_data`        | secret, tree snapshot, nullifier registry         |
//! | `validating_document`  | category, validation, circuit inputs              |
//! | `init_tee_connexion`   | key agreement, seal, connect, send                |
//! | `listening_for_status` | await the relay response within the timeout       |
//! | `ready_to_prove`       | user confirmation, unless auto-confirm            |
//! | `proving`              | check the returned public signals                 |
//! | `post_proving`         | close the relay socket                            |
//! | `error`                | retry a relay failure, or fail                    |
//!
//! Unsupported documents and algorithms found while fetching or validating
//! branch to `passport_not_supported`; every other failure goes to `error`.
//!
//! ## Cancellation
//!
//! A [`CancelHandle`] is observed at every suspension point. Cancelling
//! closes the relay socket, drops pending timers and freezes the session.
//!
//! Both signals belong to one run: they are cleared when [`ProvingMachine::run`]
//! returns, and a confirmation is used up by the proof it accepts, so a
//! retried proof waits for a fresh one. A signal sent while no run is in
//! progress applies to the next run.

use std::future::Future;
use std::sync::Arc;

use docproof_circuits::{
    generate_disclose_inputs, generate_dsc_inputs, generate_register_inputs, CircuitInputs,
    CircuitVariant, Operation, TreeLookup, TreeRegistry,
};
use docproof_core::{ErrorKind, ParseError, PipelineError, RelayRejectedError};
use docproof_crypto::{derive_shared_key, generate_nullifier, FieldElement, UserSecret};
use docproof_document::{infer_document_category, parse_certificate, validate, InferredCategory};
use docproof_relay::{PayloadMetadata, RelayChannel, RelayConnection, RelayConnector, TeePayload};
use tokio::sync::watch;

use crate::collaborators::{ProtocolState, SecretStore};
use crate::config::PipelineConfig;
use crate::proving::{ProvingEvent, ProvingState, TransitionError};
use crate::session::ProvingSession;

/// Relay failure code for proofs whose public outputs differ from the
/// locally computed ones.
pub const PUBLIC_SIGNAL_MISMATCH: &str = "public_signal_mismatch";

/// Aborts a running session from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Delivers the user's go-ahead in `ready_to_prove`.
#[derive(Debug, Clone)]
pub struct ConfirmHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ConfirmHandle {
    pub fn confirm(&self) {
        self.tx.send_replace(true);
    }
}

/// How [`ProvingMachine::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The session reached a terminal or branch state.
    Finished(ProvingState),
    /// The session was cancelled while in the given state.
    Cancelled(ProvingState),
}

/// Per-run scratch state. Dropped when `run` returns.
struct Attempt<Ch: RelayChannel> {
    secret: Option<UserSecret>,
    trees: Option<Arc<TreeRegistry>>,
    connection: Option<RelayConnection<Ch>>,
    response: Option<serde_json::Value>,
}

impl<Ch: RelayChannel> Attempt<Ch> {
    async fn close_connection(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            if let Err(e) = conn.close().await {
                tracing::warn!(url = %conn.url(), error = %e, "relay close failed");
            }
        }
    }
}

/// Drives a [`ProvingSession`] through its states.
pub struct ProvingMachine<S, P, C> {
    secrets: S,
    protocol: P,
    connector: C,
    config: PipelineConfig,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    confirm_tx: Arc<watch::Sender<bool>>,
    confirm_rx: watch::Receiver<bool>,
}

impl<S, P, C> ProvingMachine<S, P, C>
where
    S: SecretStore,
    P: ProtocolState,
    C: RelayConnector,
{
    pub fn new(secrets: S, protocol: P, connector: C, config: PipelineConfig) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (confirm_tx, confirm_rx) = watch::channel(false);
        Self {
            secrets,
            protocol,
            connector,
            config,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
            confirm_tx: Arc::new(confirm_tx),
            confirm_rx,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    pub fn confirm_handle(&self) -> ConfirmHandle {
        ConfirmHandle {
            tx: Arc::clone(&self.confirm_tx),
        }
    }

    /// Run `session` until it finishes or is cancelled.
    ///
    /// Component failures are recorded on the session and routed through
    /// the state machine; the only error returned here is a transition the
    /// machine refuses.
    pub async fn run(&self, session: &mut ProvingSession) -> Result<RunOutcome, TransitionError> {
        let outcome = self.drive(session).await;
        self.cancel_tx.send_replace(false);
        self.confirm_tx.send_replace(false);
        outcome
    }

    async fn drive(&self, session: &mut ProvingSession) -> Result<RunOutcome, TransitionError> {
        let mut attempt = Attempt {
            secret: None,
            trees: None,
            connection: None,
            response: None,
        };

        loop {
            let state = session.state();
            if session.is_cancelled() || *self.cancel_rx.borrow() {
                attempt.close_connection().await;
                session.cancel();
                return Ok(RunOutcome::Cancelled(state));
            }
            if state.is_final() {
                attempt.close_connection().await;
                tracing::info!(
                    session = %session.id,
                    %state,
                    elapsed_ms = u64::try_from(session.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "session finished"
                );
                return Ok(RunOutcome::Finished(state));
            }

            let outcome = match state {
                ProvingState::Idle => Ok(Some(ProvingEvent::Start)),
                ProvingState::FetchingData => self.fetch_data(session, &mut attempt).await,
                ProvingState::ValidatingDocument => self.validate_document(session, &attempt),
                ProvingState::InitTeeConnexion => self.init_tee_connexion(session, &mut attempt).await,
                ProvingState::ListeningForStatus => self.listen_for_status(session, &mut attempt).await,
                ProvingState::ReadyToProve => self.await_confirmation().await,
                ProvingState::Proving => self.check_proof(session, &mut attempt),
                ProvingState::PostProving => {
                    attempt.close_connection().await;
                    Ok(Some(ProvingEvent::ProofRecorded))
                }
                ProvingState::Error => {
                    attempt.close_connection().await;
                    Ok(Some(self.recover(session)))
                }
                ProvingState::Completed
                | ProvingState::Failure
                | ProvingState::PassportNotSupported
                | ProvingState::AccountRecoveryChoice
                | ProvingState::PassportDataNotFound => {
                    return Ok(RunOutcome::Finished(state));
                }
            };

            match outcome {
                Ok(Some(event)) => {
                    session.apply(event)?;
                }
                // Cancelled mid-step; the top of the loop winds down.
                Ok(None) => session.cancel(),
                Err(e) => self.route_failure(session, state, &e)?,
            }
        }
    }

    fn route_failure(
        &self,
        session: &mut ProvingSession,
        state: ProvingState,
        error: &PipelineError,
    ) -> Result<(), TransitionError> {
        let before_relay = matches!(
            state,
            ProvingState::FetchingData | ProvingState::ValidatingDocument
        );
        if before_relay && error.kind() == ErrorKind::UnsupportedAlgorithm {
            session.note_failure(error);
            session.apply(ProvingEvent::DocumentNotSupported)?;
        } else {
            session.fail_with(error)?;
        }
        Ok(())
    }

    /// Retry relay failures while attempts remain, otherwise fail.
    fn recover(&self, session: &ProvingSession) -> ProvingEvent {
        let kind = session.last_error().map_or(ErrorKind::Internal, |f| f.kind);
        if kind.is_relay() && session.relay_attempts() <= self.config.max_relay_retries {
            tracing::info!(
                session = %session.id,
                %kind,
                attempt = session.relay_attempts() + 1,
                "retrying relay"
            );
            ProvingEvent::Retry(kind)
        } else {
            ProvingEvent::Fail
        }
    }

    /// Await `fut` unless the session is cancelled first.
    async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut cancel = self.cancel_rx.clone();
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => None,
            out = fut => Some(out),
        }
    }

    // ─── Steps ───────────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(session = %session.id))]
    async fn fetch_data(
        &self,
        session: &ProvingSession,
        attempt: &mut Attempt<C::Channel>,
    ) -> Result<Option<ProvingEvent>, PipelineError> {
        let has_data = match session.operation {
            Operation::Register | Operation::Disclose => session.document.is_some(),
            Operation::Dsc => session.certificate.is_some() && session.issuer.is_some(),
        };
        if !has_data {
            return Ok(Some(ProvingEvent::DataNotFound));
        }

        if session.operation != Operation::Dsc {
            let Some(secret) = self.guard(self.secrets.get_secret()).await else {
                return Ok(None);
            };
            let secret = secret?
                .ok_or_else(|| PipelineError::Internal("no user secret provisioned".into()))?;
            attempt.secret = Some(secret);
        }

        let category = session.category();
        let Some(trees) = self.guard(self.protocol.fetch_trees(category)).await else {
            return Ok(None);
        };
        attempt.trees = Some(trees?);

        if let (Operation::Register, Some(document), Some(secret)) =
            (session.operation, &session.document, &attempt.secret)
        {
            let nullifier = generate_nullifier(secret, document)?;
            let registered = self
                .guard(self.protocol.is_nullifier_registered(category, &nullifier))
                .await;
            match registered {
                None => return Ok(None),
                Some(Ok(true)) => return Ok(Some(ProvingEvent::AlreadyRegistered)),
                Some(Ok(false)) => {}
                Some(Err(e)) => return Err(e),
            }
        }
        Ok(Some(ProvingEvent::DataFetched))
    }

    #[tracing::instrument(skip_all, fields(session = %session.id, operation = %session.operation))]
    fn validate_document(
        &self,
        session: &mut ProvingSession,
        attempt: &Attempt<C::Channel>,
    ) -> Result<Option<ProvingEvent>, PipelineError> {
        let trees = attempt
            .trees
            .as_deref()
            .ok_or_else(|| PipelineError::Internal("trees not fetched".into()))?;

        let inputs = match session.operation {
            Operation::Dsc => {
                let (Some(dsc), Some(csca)) = (&session.certificate, &session.issuer) else {
                    return Err(PipelineError::Internal("certificates missing".into()));
                };
                let csca_tree = trees.get_tree(session.category(), "csca")?;
                generate_dsc_inputs(dsc, csca, csca_tree)?
            }
            Operation::Register | Operation::Disclose => {
                let document = session
                    .document
                    .as_ref()
                    .ok_or_else(|| PipelineError::Internal("document missing".into()))?;
                if infer_document_category(document) == InferredCategory::Unsupported {
                    return Ok(Some(ProvingEvent::DocumentNotSupported));
                }
                let result = validate(document);
                if !result.overall {
                    return Err(ParseError::ChecksumMismatch {
                        field: result.failures().join(","),
                        detail: "document failed validation".into(),
                    }
                    .into());
                }
                let secret = attempt
                    .secret
                    .as_ref()
                    .ok_or_else(|| PipelineError::Internal("secret not fetched".into()))?;
                if session.operation == Operation::Register {
                    let signer = match (&session.certificate, document.chip()) {
                        (Some(cert), _) => cert.clone(),
                        (None, Some(chip)) => parse_certificate(chip.dsc_pem.as_bytes())?,
                        (None, None) => {
                            return Err(PipelineError::Internal(
                                "no document signer certificate".into(),
                            ))
                        }
                    };
                    generate_register_inputs(document, &signer, secret)?
                } else {
                    let app = session.app.as_ref().ok_or_else(|| {
                        PipelineError::Internal("disclose session without an app config".into())
                    })?;
                    generate_disclose_inputs(secret, document, app, trees)?
                }
            }
        };

        tracing::info!(circuit = %inputs.circuit_id, signals = inputs.signals.len(), "inputs ready");
        session.inputs = Some(inputs);
        Ok(Some(ProvingEvent::DocumentValidated))
    }

    #[tracing::instrument(skip_all, fields(session = %session.id, attempt = session.relay_attempts()))]
    async fn init_tee_connexion(
        &self,
        session: &ProvingSession,
        attempt: &mut Attempt<C::Channel>,
    ) -> Result<Option<ProvingEvent>, PipelineError> {
        attempt.close_connection().await;
        attempt.response = None;

        let inputs = session
            .inputs
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("inputs not generated".into()))?;
        let tee_key = self
            .config
            .tee_public_key_bytes()
            .map_err(|e| PipelineError::Internal(e.to_string()))?;
        let url = self.config.relay_url()?;

        // Fresh key agreement and nonce on every entry.
        let agreement = derive_shared_key(&tee_key)?;
        let plaintext = serde_json::to_vec(&inputs.signals_json())
            .map_err(|e| PipelineError::Internal(e.to_string()))?;
        let metadata = PayloadMetadata::new(algorithm_label(session, inputs), session.category())
            .with_client_public_key(&agreement.client_public_key);
        let payload = TeePayload::seal(
            inputs.circuit_id.clone(),
            &plaintext,
            &agreement.shared_key,
            metadata,
        )?;

        let Some(conn) = self.guard(RelayConnection::open(&self.connector, &url)).await else {
            return Ok(None);
        };
        let conn = attempt.connection.insert(conn?);
        let Some(sent) = self.guard(conn.send_request(&payload)).await else {
            return Ok(None);
        };
        sent?;
        Ok(Some(ProvingEvent::TeeConnected))
    }

    #[tracing::instrument(skip_all, fields(session = %session.id))]
    async fn listen_for_status(
        &self,
        session: &ProvingSession,
        attempt: &mut Attempt<C::Channel>,
    ) -> Result<Option<ProvingEvent>, PipelineError> {
        let conn = attempt
            .connection
            .as_mut()
            .ok_or_else(|| PipelineError::Internal("relay connection missing".into()))?;
        let timeout = self.config.relay_timeout();
        let Some(response) = self.guard(conn.await_response(timeout)).await else {
            return Ok(None);
        };
        attempt.response = Some(response?);
        Ok(Some(ProvingEvent::StatusReceived))
    }

    async fn await_confirmation(&self) -> Result<Option<ProvingEvent>, PipelineError> {
        if self.config.auto_confirm {
            return Ok(Some(ProvingEvent::ProveConfirmed));
        }
        let mut confirm = self.confirm_rx.clone();
        let confirmed = self.guard(confirm.wait_for(|ok| *ok)).await.map(|r| r.is_ok());
        match confirmed {
            Some(true) => {
                self.confirm_tx.send_replace(false);
                Ok(Some(ProvingEvent::ProveConfirmed))
            }
            Some(false) => Err(PipelineError::Internal("confirmation channel closed".into())),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip_all, fields(session = %session.id))]
    fn check_proof(
        &self,
        session: &mut ProvingSession,
        attempt: &mut Attempt<C::Channel>,
    ) -> Result<Option<ProvingEvent>, PipelineError> {
        let result = attempt
            .response
            .take()
            .ok_or_else(|| PipelineError::Internal("no relay response".into()))?;
        let inputs = session
            .inputs
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("inputs not generated".into()))?;
        check_public_signals(inputs, &result)?;
        session.proof = Some(result.get("proof").cloned().unwrap_or(result));
        Ok(Some(ProvingEvent::ProofGenerated))
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    // The machine owns the sender, so a closed channel never cancels.
    if rx.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// The signer algorithm named in the relay metadata.
fn algorithm_label(session: &ProvingSession, inputs: &CircuitInputs) -> String {
    match inputs.variant {
        CircuitVariant::Register { signature, .. } | CircuitVariant::Dsc { signature } => {
            signature.algorithm().to_string()
        }
        CircuitVariant::RegisterAadhaar | CircuitVariant::Disclose { .. } => session
            .document
            .as_ref()
            .and_then(|d| d.signature_algorithm)
            .map_or_else(|| "unknown".to_string(), |a| a.to_string()),
    }
}

fn parse_signal(raw: &str) -> Option<FieldElement> {
    if raw.starts_with("0x") {
        FieldElement::from_hex(raw).ok()
    } else {
        FieldElement::from_decimal(raw).ok()
    }
}

/// Every locally expected output must appear in `result.publicSignals`
/// with the same value.
pub fn check_public_signals(
    inputs: &CircuitInputs,
    result: &serde_json::Value,
) -> Result<(), RelayRejectedError> {
    let mismatch = || RelayRejectedError {
        code: PUBLIC_SIGNAL_MISMATCH.to_string(),
    };
    let signals = result
        .get("publicSignals")
        .and_then(serde_json::Value::as_object)
        .ok_or_else(mismatch)?;
    for (name, expected) in &inputs.expected {
        let reported = signals
            .get(name)
            .and_then(serde_json::Value::as_str)
            .and_then(parse_signal);
        if reported != Some(*expected) {
            tracing::warn!(signal = %name, "public signal mismatch");
            return Err(mismatch());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproof_core::DocumentCategory;
    use serde_json::json;

    fn inputs() -> CircuitInputs {
        let mut inputs = CircuitInputs::new(CircuitVariant::for_disclose(DocumentCategory::Passport));
        inputs
            .expect("nullifier", FieldElement::from_u64(255))
            .expect("commitment_tree_root", FieldElement::from_u64(7));
        inputs
    }

    #[test]
    fn signals_accept_hex_and_decimal() {
        let result = json!({
            "proof": {"pi_a": []},
            "publicSignals": {"nullifier": "0xff", "commitment_tree_root": "7", "extra": "1"},
        });
        assert!(check_public_signals(&inputs(), &result).is_ok());
    }

    #[test]
    fn wrong_or_missing_signal_is_rejected() {
        let wrong = json!({"publicSignals": {"nullifier": "254", "commitment_tree_root": "7"}});
        assert_eq!(
            check_public_signals(&inputs(), &wrong).unwrap_err().code,
            PUBLIC_SIGNAL_MISMATCH
        );
        let missing = json!({"publicSignals": {"nullifier": "255"}});
        assert!(check_public_signals(&inputs(), &missing).is_err());
        assert!(check_public_signals(&inputs(), &json!({"proof": {}})).is_err());
    }

    #[test]
    fn handles_share_one_channel() {
        let (tx, rx) = watch::channel(false);
        let handle = CancelHandle { tx: Arc::new(tx) };
        handle.clone().cancel();
        assert!(*rx.borrow());
    }
}
