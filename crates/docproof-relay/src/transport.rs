//! # Relay Transport
//!
//! [`RelayConnector`] and [`RelayChannel`] separate the request lifecycle
//! from the socket. [`WsConnector`] is the WebSocket implementation; tests
//! and embedders can supply their own.

use std::time::Duration;

use async_trait::async_trait;
use docproof_core::ConnectionError;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

/// A connected, bidirectional text channel to the relay.
#[async_trait]
pub trait RelayChannel: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError>;

    /// Wait for the next text frame. A close frame or end of stream is
    /// [`ConnectionError::Closed`].
    async fn next_text(&mut self) -> Result<String, ConnectionError>;

    /// Close the channel. Closing an already closed channel succeeds.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Opens [`RelayChannel`]s.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    type Channel: RelayChannel + 'static;

    async fn connect(&self, url: &Url) -> Result<Self::Channel, ConnectionError>;
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

/// Dials the relay over `ws://` or `wss://`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl RelayConnector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&self, url: &Url) -> Result<WsChannel, ConnectionError> {
        let attempt = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str())).await;
        let (stream, _response) = match attempt {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                return Err(ConnectionError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ConnectionError::Connect {
                    url: url.to_string(),
                    reason: format!("timed out after {:?}", self.connect_timeout),
                })
            }
        };
        tracing::info!(%url, "relay connected");
        Ok(WsChannel { stream })
    }
}

/// A WebSocket connection to the relay.
pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for WsChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsChannel").finish_non_exhaustive()
    }
}

#[async_trait]
impl RelayChannel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }

    async fn next_text(&mut self) -> Result<String, ConnectionError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(_))) => {
                    return Err(ConnectionError::Protocol("unexpected binary frame".into()))
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(ConnectionError::Closed {
                        reason: frame.map(|f| f.reason.into_owned()).unwrap_or_default(),
                    })
                }
                // Control frames; tungstenite answers pings itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Err(ConnectionError::Closed {
                        reason: "stream ended".into(),
                    })
                }
                Some(Err(e)) => return Err(ConnectionError::Transport(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(ConnectionError::Transport(e.to_string())),
        }
    }
}
