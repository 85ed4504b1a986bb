//! Round trips against a WebSocket relay running on the loopback interface.

use std::time::Duration;

use docproof_core::{ConnectionError, DocumentCategory};
use docproof_crypto::{decrypt, SharedKey};
use docproof_relay::{
    PayloadMetadata, RelayClient, RelayConnection, RelayError, RelayResponse, TeePayload,
    WsConnector,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

#[derive(Clone, Copy)]
enum Behaviour {
    /// Decrypt the payload and echo the plaintext back as the result.
    Echo,
    /// Answer with an error status.
    Reject,
    /// Read the request and never answer.
    Silent,
    /// Close the socket after reading the request.
    Hangup,
}

async fn spawn_relay(key: SharedKey, behaviour: Behaviour) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let Some(Ok(Message::Text(request))) = ws.next().await else {
            return;
        };
        let request: TeePayload = serde_json::from_str(&request).unwrap();
        let reply = match behaviour {
            Behaviour::Echo => {
                let plaintext = decrypt(&request.to_encrypted().unwrap(), &key).unwrap();
                RelayResponse::ok(serde_json::json!({
                    "circuitId": request.circuit_id,
                    "echo": String::from_utf8(plaintext).unwrap(),
                }))
            }
            Behaviour::Reject => RelayResponse::error("attestation_failed"),
            Behaviour::Silent => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
            Behaviour::Hangup => {
                let _ = ws.close(None).await;
                return;
            }
        };
        let text = serde_json::to_string(&reply).unwrap();
        ws.send(Message::Text(text)).await.unwrap();
        // Drain until the client closes.
        while let Some(Ok(_)) = ws.next().await {}
    });
    Url::parse(&format!("ws://{addr}/ws")).unwrap()
}

fn payload(key: &SharedKey, body: &str) -> TeePayload {
    let metadata = PayloadMetadata::new("rsa_sha256", DocumentCategory::Passport);
    TeePayload::seal("register_sha256_sha256_sha256_rsa_65537_2048", body.as_bytes(), key, metadata)
        .unwrap()
}

#[tokio::test]
async fn encrypted_round_trip() {
    let key = SharedKey::generate();
    let url = spawn_relay(key.clone(), Behaviour::Echo).await;
    let client = RelayClient::new(WsConnector::default(), url, Duration::from_secs(5));

    let result = client.send(&payload(&key, r#"{"secret":"1"}"#)).await.unwrap();
    assert_eq!(result["circuitId"], "register_sha256_sha256_sha256_rsa_65537_2048");
    assert_eq!(result["echo"], r#"{"secret":"1"}"#);
}

#[tokio::test]
async fn rejection_carries_the_code() {
    let key = SharedKey::generate();
    let url = spawn_relay(key.clone(), Behaviour::Reject).await;
    let client = RelayClient::new(WsConnector::default(), url, Duration::from_secs(5));

    match client.send(&payload(&key, "{}")).await {
        Err(RelayError::Rejected(r)) => assert_eq!(r.code, "attestation_failed"),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn silent_relay_times_out() {
    let key = SharedKey::generate();
    let url = spawn_relay(key.clone(), Behaviour::Silent).await;
    let client = RelayClient::new(WsConnector::default(), url, Duration::from_millis(200));

    let err = client.send(&payload(&key, "{}")).await.unwrap_err();
    assert!(matches!(err, RelayError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn hangup_is_a_connection_error() {
    let key = SharedKey::generate();
    let url = spawn_relay(key.clone(), Behaviour::Hangup).await;
    let connector = WsConnector::default();

    let mut conn = RelayConnection::open(&connector, &url).await.unwrap();
    conn.send_request(&payload(&key, "{}")).await.unwrap();
    let err = conn.await_response(Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, RelayError::Connection(ConnectionError::Closed { .. })), "{err:?}");
    // The peer is already gone, so the first close may report a reset.
    let _ = conn.close().await;
    assert!(conn.is_closed());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn unreachable_relay_fails_to_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    let client = RelayClient::new(
        WsConnector::new(Duration::from_secs(2)),
        url,
        Duration::from_secs(1),
    );
    let key = SharedKey::generate();
    let err = client.send(&payload(&key, "{}")).await.unwrap_err();
    assert!(matches!(err, RelayError::Connection(ConnectionError::Connect { .. })), "{err:?}");
}
