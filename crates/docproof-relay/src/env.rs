//! # Relay Environments
//!
//! Each deployment environment has one fixed relay endpoint. An explicit
//! override may replace it, provided it is a `ws://` or `wss://` URL.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RelayError;

/// Deployment environment of the TEE relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayEnvironment {
    #[default]
    Production,
    Staging,
    Local,
}

impl RelayEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for RelayEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelayEnvironment {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "local" => Ok(Self::Local),
            _ => Err(RelayError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// The relay endpoint for `environment`.
pub fn build_relay_url(environment: RelayEnvironment) -> &'static str {
    match environment {
        RelayEnvironment::Production => "wss://tee.docproof.dev/ws",
        RelayEnvironment::Staging => "wss://tee.staging.docproof.dev/ws",
        RelayEnvironment::Local => "ws://127.0.0.1:8888/ws",
    }
}

/// Resolve the endpoint to dial: `override_url` if given, else the
/// environment's fixed URL.
pub fn resolve_relay_url(
    environment: RelayEnvironment,
    override_url: Option<&str>,
) -> Result<Url, RelayError> {
    let raw = override_url.unwrap_or_else(|| build_relay_url(environment));
    let url = Url::parse(raw).map_err(|e| RelayError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(RelayError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("scheme {other} is not ws or wss"),
        }),
    }
}
