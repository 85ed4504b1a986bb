//! # docproof-relay — Secure Relay Client
//!
//! Carries encrypted circuit inputs to the remote TEE and brings back its
//! single response.
//!
//! - [`env`]: environment → endpoint mapping, with a validated override.
//! - [`wire`]: the camelCase [`TeePayload`] request and [`RelayResponse`].
//! - [`transport`]: async [`RelayConnector`] / [`RelayChannel`] traits and
//!   the `tokio-tungstenite` implementation.
//! - [`connection`]: the connect → send once → await one response → close
//!   lifecycle.
//!
//! ## Crate Policy
//!
//! - No automatic reconnect or retry. Failures surface as
//!   `ConnectionError`, `RelayTimeoutError` or `RelayRejectedError` and the
//!   proving state machine decides what to do.
//! - Plaintext payloads and shared keys are never logged.

pub mod connection;
pub mod env;
pub mod error;
pub mod transport;
pub mod wire;

pub use connection::{RelayClient, RelayConnection};
pub use env::{build_relay_url, resolve_relay_url, RelayEnvironment};
pub use error::RelayError;
pub use transport::{RelayChannel, RelayConnector, WsChannel, WsConnector};
pub use wire::{PayloadMetadata, RelayResponse, ResponseStatus, TeePayload};
