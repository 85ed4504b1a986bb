//! # Relay Connection
//!
//! One connection carries exactly one request:
//!
//! ```text
//! open ──▶ send_request ──▶ await_response ──▶ close
//! ```
//!
//! There is no reconnect. A retry is a new connection with a freshly
//! sealed payload, and the decision to retry belongs to the caller.

use std::time::Duration;

use docproof_core::{ConnectionError, RelayTimeoutError};
use url::Url;

use crate::error::RelayError;
use crate::transport::{RelayChannel, RelayConnector};
use crate::wire::{RelayResponse, TeePayload};

/// A single-request connection to the relay.
#[derive(Debug)]
pub struct RelayConnection<C: RelayChannel> {
    channel: C,
    url: Url,
    sent: bool,
    closed: bool,
}

impl<C: RelayChannel> RelayConnection<C> {
    /// Connect to `url` through `connector`.
    pub async fn open<K>(connector: &K, url: &Url) -> Result<Self, ConnectionError>
    where
        K: RelayConnector<Channel = C>,
    {
        let channel = connector.connect(url).await?;
        Ok(Self::from_channel(channel, url.clone()))
    }

    pub fn from_channel(channel: C, url: Url) -> Self {
        Self {
            channel,
            url,
            sent: false,
            closed: false,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Send the request. A connection accepts one request only.
    pub async fn send_request(&mut self, payload: &TeePayload) -> Result<(), RelayError> {
        if self.sent {
            return Err(ConnectionError::AlreadySent.into());
        }
        if self.closed {
            return Err(ConnectionError::Closed {
                reason: "connection closed locally".into(),
            }
            .into());
        }
        let frame = payload.to_json()?;
        tracing::debug!(
            url = %self.url,
            circuit = %payload.circuit_id,
            bytes = frame.len(),
            "relay request sent"
        );
        self.sent = true;
        self.channel.send_text(frame).await?;
        Ok(())
    }

    /// Wait up to `timeout` for the response and return its result object.
    pub async fn await_response(
        &mut self,
        timeout: Duration,
    ) -> Result<serde_json::Value, RelayError> {
        if !self.sent {
            return Err(ConnectionError::Protocol("no request has been sent".into()).into());
        }
        if self.closed {
            return Err(ConnectionError::Closed {
                reason: "connection closed locally".into(),
            }
            .into());
        }
        let text = tokio::time::timeout(timeout, self.channel.next_text())
            .await
            .map_err(|_| RelayTimeoutError { timeout })??;
        let response: RelayResponse = serde_json::from_str(&text)
            .map_err(|e| ConnectionError::Protocol(format!("malformed response: {e}")))?;
        tracing::debug!(url = %self.url, status = ?response.status, "relay response received");
        Ok(response.into_result()?)
    }

    /// Close the socket. Further calls are no-ops.
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::info!(url = %self.url, "relay connection closed");
        self.channel.close().await
    }
}

/// Connect, send one payload, await its response, disconnect.
#[derive(Debug, Clone)]
pub struct RelayClient<K> {
    connector: K,
    url: Url,
    response_timeout: Duration,
}

impl<K: RelayConnector> RelayClient<K> {
    pub fn new(connector: K, url: Url, response_timeout: Duration) -> Self {
        Self {
            connector,
            url,
            response_timeout,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// One full round trip. The socket is closed whatever the outcome.
    pub async fn send(&self, payload: &TeePayload) -> Result<serde_json::Value, RelayError> {
        let mut conn = RelayConnection::open(&self.connector, &self.url).await?;
        let outcome = match conn.send_request(payload).await {
            Ok(()) => conn.await_response(self.response_timeout).await,
            Err(e) => Err(e),
        };
        if let Err(e) = conn.close().await {
            tracing::warn!(url = %self.url, error = %e, "relay close failed");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docproof_core::DocumentCategory;
    use docproof_crypto::SharedKey;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crate::wire::PayloadMetadata;

    #[derive(Default)]
    struct Recorded {
        sent: Vec<String>,
        closes: usize,
    }

    /// Replays scripted frames; `None` in the script means "never answer".
    struct MockChannel {
        script: VecDeque<Option<Result<String, ConnectionError>>>,
        log: Arc<Mutex<Recorded>>,
    }

    #[async_trait]
    impl RelayChannel for MockChannel {
        async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
            self.log.lock().unwrap().sent.push(text);
            Ok(())
        }

        async fn next_text(&mut self) -> Result<String, ConnectionError> {
            match self.script.pop_front() {
                Some(Some(frame)) => frame,
                Some(None) => std::future::pending().await,
                None => Err(ConnectionError::Closed { reason: "eof".into() }),
            }
        }

        async fn close(&mut self) -> Result<(), ConnectionError> {
            self.log.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    fn connection(
        script: Vec<Option<Result<String, ConnectionError>>>,
    ) -> (RelayConnection<MockChannel>, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let channel = MockChannel {
            script: script.into(),
            log: Arc::clone(&log),
        };
        let url = Url::parse("ws://127.0.0.1:1/ws").unwrap();
        (RelayConnection::from_channel(channel, url), log)
    }

    fn payload() -> TeePayload {
        let metadata = PayloadMetadata::new("rsa_sha256", DocumentCategory::Passport);
        TeePayload::seal("register_aadhaar", b"{}", &SharedKey::generate(), metadata).unwrap()
    }

    fn ok_frame(result: &str) -> Option<Result<String, ConnectionError>> {
        Some(Ok(format!(r#"{{"status":"ok","result":{result}}}"#)))
    }

    #[tokio::test]
    async fn one_request_one_response() {
        let (mut conn, log) = connection(vec![ok_frame(r#"{"proof":"p"}"#)]);
        conn.send_request(&payload()).await.unwrap();
        let result = conn.await_response(Duration::from_secs(1)).await.unwrap();
        assert_eq!(result["proof"], "p");
        conn.close().await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.sent.len(), 1);
        let sent: serde_json::Value = serde_json::from_str(&log.sent[0]).unwrap();
        assert_eq!(sent["circuitId"], "register_aadhaar");
    }

    #[tokio::test]
    async fn second_send_is_refused() {
        let (mut conn, log) = connection(vec![]);
        conn.send_request(&payload()).await.unwrap();
        let err = conn.send_request(&payload()).await.unwrap_err();
        assert_eq!(err, RelayError::Connection(ConnectionError::AlreadySent));
        assert_eq!(log.lock().unwrap().sent.len(), 1);
    }

    #[tokio::test]
    async fn silence_times_out() {
        let (mut conn, _) = connection(vec![None]);
        conn.send_request(&payload()).await.unwrap();
        let timeout = Duration::from_millis(20);
        let err = conn.await_response(timeout).await.unwrap_err();
        assert_eq!(err, RelayError::Timeout(RelayTimeoutError { timeout }));
    }

    #[tokio::test]
    async fn error_status_is_rejection() {
        let frame = Some(Ok(r#"{"status":"error","code":"attestation_failed"}"#.to_string()));
        let (mut conn, _) = connection(vec![frame]);
        conn.send_request(&payload()).await.unwrap();
        match conn.await_response(Duration::from_secs(1)).await {
            Err(RelayError::Rejected(r)) => assert_eq!(r.code, "attestation_failed"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_frame_is_protocol_error() {
        let (mut conn, _) = connection(vec![Some(Ok("hello".into()))]);
        conn.send_request(&payload()).await.unwrap();
        let err = conn.await_response(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RelayError::Connection(ConnectionError::Protocol(_))));
    }

    #[tokio::test]
    async fn close_before_response_is_connection_error() {
        let (mut conn, _) = connection(vec![]);
        conn.send_request(&payload()).await.unwrap();
        let err = conn.await_response(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RelayError::Connection(ConnectionError::Closed { .. })));
    }

    #[tokio::test]
    async fn await_without_send_is_refused() {
        let (mut conn, _) = connection(vec![ok_frame("{}")]);
        let err = conn.await_response(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RelayError::Connection(ConnectionError::Protocol(_))));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut conn, log) = connection(vec![]);
        conn.close().await.unwrap();
        conn.close().await.unwrap();
        assert!(conn.is_closed());
        assert_eq!(log.lock().unwrap().closes, 1);
        let err = conn.send_request(&payload()).await.unwrap_err();
        assert!(matches!(err, RelayError::Connection(ConnectionError::Closed { .. })));
    }
}
