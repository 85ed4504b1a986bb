//! # Pipeline Configuration
//!
//! Loaded from an optional YAML file, then overridden from the
//! environment:
//!
//! | variable                        | field                  |
//! |---------------------------------|------------------------|
//! | `DOCPROOF_RELAY_ENV`            | `relay_environment`    |
//! | `DOCPROOF_RELAY_URL`            | `relay_url`            |
//! | `DOCPROOF_RELAY_TIMEOUT_SECS`   | `relay_timeout_secs`   |
//! | `DOCPROOF_CONNECT_TIMEOUT_SECS` | `connect_timeout_secs` |
//! | `DOCPROOF_AUTO_CONFIRM`         | `auto_confirm`         |
//! | `DOCPROOF_TEE_PUBLIC_KEY`       | `tee_public_key`       |
//! | `DOCPROOF_MAX_RELAY_RETRIES`    | `max_relay_retries`    |

use std::path::{Path, PathBuf};
use std::time::Duration;

use docproof_relay::{resolve_relay_url, RelayEnvironment, RelayError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors loading or interpreting the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for [`PipelineConfig`].
    #[error("invalid configuration in {path}: {reason}")]
    Yaml { path: String, reason: String },

    /// A field or environment variable holds an unusable value.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    /// A setting required for the requested operation is absent.
    #[error("missing configuration: {0}")]
    Missing(String),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Runtime settings for the proving executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub relay_environment: RelayEnvironment,
    /// Replaces the environment's endpoint when set.
    pub relay_url: Option<String>,
    /// How long `listening_for_status` waits for the relay.
    pub relay_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Skip the user confirmation in `ready_to_prove`.
    pub auto_confirm: bool,
    /// Hex of the TEE's uncompressed P-256 public key.
    pub tee_public_key: Option<String>,
    /// Relay failures retried before the session fails.
    pub max_relay_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relay_environment: RelayEnvironment::Production,
            relay_url: None,
            relay_timeout_secs: 120,
            connect_timeout_secs: 10,
            auto_confirm: false,
            tee_public_key: None,
            max_relay_retries: 1,
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document. `origin` names it in errors.
    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Yaml {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml, &path.display().to_string())
    }

    /// File (if any), then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        tracing::debug!(
            environment = %config.relay_environment,
            relay_url = ?config.relay_url,
            auto_confirm = config.auto_confirm,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its
    /// value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("DOCPROOF_RELAY_ENV") {
            self.relay_environment = v.parse()?;
        }
        if let Some(v) = lookup("DOCPROOF_RELAY_URL") {
            self.relay_url = Some(v);
        }
        if let Some(v) = lookup("DOCPROOF_RELAY_TIMEOUT_SECS") {
            self.relay_timeout_secs = parse_var("DOCPROOF_RELAY_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DOCPROOF_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = parse_var("DOCPROOF_CONNECT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DOCPROOF_AUTO_CONFIRM") {
            self.auto_confirm = parse_bool("DOCPROOF_AUTO_CONFIRM", &v)?;
        }
        if let Some(v) = lookup("DOCPROOF_TEE_PUBLIC_KEY") {
            self.tee_public_key = Some(v);
        }
        if let Some(v) = lookup("DOCPROOF_MAX_RELAY_RETRIES") {
            self.max_relay_retries = parse_var("DOCPROOF_MAX_RELAY_RETRIES", &v)?;
        }
        self.check()
    }

    fn check(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("relay_timeout_secs", self.relay_timeout_secs),
            ("connect_timeout_secs", self.connect_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    name: name.into(),
                    value: "0".into(),
                    reason: "must be at least one second".into(),
                });
            }
        }
        if let Some(url) = &self.relay_url {
            resolve_relay_url(self.relay_environment, Some(url))?;
        }
        if self.tee_public_key.is_some() {
            self.tee_public_key_bytes()?;
        }
        Ok(())
    }

    /// The endpoint to dial.
    pub fn relay_url(&self) -> Result<Url, RelayError> {
        resolve_relay_url(self.relay_environment, self.relay_url.as_deref())
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Decoded TEE public key: a 65-byte uncompressed SEC1 point.
    pub fn tee_public_key_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        let raw = self
            .tee_public_key
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("tee_public_key".into()))?;
        let invalid = |reason: &str| ConfigError::InvalidValue {
            name: "tee_public_key".into(),
            value: raw.into(),
            reason: reason.into(),
        };
        let bytes = hex::decode(raw.trim().trim_start_matches("0x"))
            .map_err(|_| invalid("not hex"))?;
        if bytes.len() != 65 || bytes[0] != 0x04 {
            return Err(invalid("expected an uncompressed P-256 point (65 bytes, 0x04 prefix)"));
        }
        Ok(bytes)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name: name.into(),
        value: value.into(),
        reason: e.to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.into(),
            value: value.into(),
            reason: "expected a boolean".into(),
        }),
    }
}
