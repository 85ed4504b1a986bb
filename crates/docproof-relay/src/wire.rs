//! # Relay Wire Types
//!
//! Request:
//!
//! ```json
//! {
//!   "circuitId": "register_sha256_sha256_sha256_rsa_65537_2048",
//!   "payload": "<base64 ciphertext + GCM tag>",
//!   "nonce": "<base64, 12 bytes>",
//!   "metadata": { "algorithm": "rsa_sha256", "category": "passport", "clientPublicKey": "<base64>" }
//! }
//! ```
//!
//! Response: `{"status": "ok"|"error", "result"?: object, "code"?: string}`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use docproof_core::{DocumentCategory, RelayRejectedError};
use docproof_crypto::{encrypt, EncryptedPayload, SharedKey, NONCE_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Unencrypted routing metadata for the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadMetadata {
    pub algorithm: String,
    pub category: DocumentCategory,
    /// Base64 of the client's ephemeral P-256 point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_public_key: Option<String>,
}

impl PayloadMetadata {
    pub fn new(algorithm: impl Into<String>, category: DocumentCategory) -> Self {
        Self {
            algorithm: algorithm.into(),
            category,
            client_public_key: None,
        }
    }

    pub fn with_client_public_key(mut self, point: &[u8]) -> Self {
        self.client_public_key = Some(BASE64.encode(point));
        self
    }
}

/// The envelope sent to the relay for one proving attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeePayload {
    pub circuit_id: String,
    pub payload: String,
    pub nonce: String,
    pub metadata: PayloadMetadata,
}

impl TeePayload {
    /// Encrypt `plaintext` under a fresh nonce and wrap it.
    pub fn seal(
        circuit_id: impl Into<String>,
        plaintext: &[u8],
        key: &SharedKey,
        metadata: PayloadMetadata,
    ) -> Result<Self, RelayError> {
        let sealed = encrypt(plaintext, key)?;
        Ok(Self::from_encrypted(circuit_id, &sealed, metadata))
    }

    pub fn from_encrypted(
        circuit_id: impl Into<String>,
        sealed: &EncryptedPayload,
        metadata: PayloadMetadata,
    ) -> Self {
        Self {
            circuit_id: circuit_id.into(),
            payload: BASE64.encode(&sealed.ciphertext),
            nonce: BASE64.encode(sealed.nonce),
            metadata,
        }
    }

    /// Decode the base64 fields back into an [`EncryptedPayload`].
    pub fn to_encrypted(&self) -> Result<EncryptedPayload, RelayError> {
        let ciphertext = BASE64
            .decode(&self.payload)
            .map_err(|e| RelayError::Encoding(format!("payload: {e}")))?;
        let nonce_bytes = BASE64
            .decode(&self.nonce)
            .map_err(|e| RelayError::Encoding(format!("nonce: {e}")))?;
        let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
            RelayError::Encoding(format!(
                "nonce: expected {NONCE_SIZE} bytes, got {}",
                nonce_bytes.len()
            ))
        })?;
        Ok(EncryptedPayload { ciphertext, nonce })
    }

    pub fn to_json(&self) -> Result<String, RelayError> {
        serde_json::to_string(self).map_err(|e| RelayError::Encoding(e.to_string()))
    }
}

/// Outcome reported by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// The single structured response to a [`TeePayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl RelayResponse {
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            status: ResponseStatus::Ok,
            result: Some(result),
            code: None,
        }
    }

    pub fn error(code: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            result: None,
            code: Some(code.into()),
        }
    }

    /// The result object, or the failure code as a [`RelayRejectedError`].
    /// An `ok` response without a result yields `null`.
    pub fn into_result(self) -> Result<serde_json::Value, RelayRejectedError> {
        match self.status {
            ResponseStatus::Ok => Ok(self.result.unwrap_or(serde_json::Value::Null)),
            ResponseStatus::Error => Err(RelayRejectedError {
                code: self.code.unwrap_or_else(|| "unspecified".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproof_crypto::{decrypt, encrypt_with_nonce};
    use serde_json::json;

    #[test]
    fn payload_wire_form_is_camel_case() {
        let key = SharedKey::from_bytes([7; 32]);
        let sealed = encrypt_with_nonce(b"{}", &key, [9; NONCE_SIZE]).unwrap();
        let metadata = PayloadMetadata::new("rsa_sha256", DocumentCategory::Passport)
            .with_client_public_key(&[4, 1, 2]);
        let payload = TeePayload::from_encrypted("register_aadhaar", &sealed, metadata);

        let v: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert_eq!(v["circuitId"], "register_aadhaar");
        assert_eq!(v["nonce"], "CQkJCQkJCQkJCQkJ");
        assert_eq!(v["metadata"]["algorithm"], "rsa_sha256");
        assert_eq!(v["metadata"]["category"], "passport");
        assert_eq!(v["metadata"]["clientPublicKey"], "BAEC");
    }

    #[test]
    fn sealed_payload_opens_with_the_same_key() {
        let key = SharedKey::generate();
        let metadata = PayloadMetadata::new("ecdsa_sha256", DocumentCategory::IdCard);
        let payload = TeePayload::seal("vc_and_disclose_id", b"inputs", &key, metadata).unwrap();
        let opened = decrypt(&payload.to_encrypted().unwrap(), &key).unwrap();
        assert_eq!(opened, b"inputs");
    }

    #[test]
    fn resealing_uses_a_fresh_nonce() {
        let key = SharedKey::generate();
        let metadata = PayloadMetadata::new("rsa_sha256", DocumentCategory::Passport);
        let a = TeePayload::seal("c", b"same", &key, metadata.clone()).unwrap();
        let b = TeePayload::seal("c", b"same", &key, metadata).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.payload, b.payload);
    }

    #[test]
    fn short_nonce_is_an_encoding_error() {
        let key = SharedKey::generate();
        let metadata = PayloadMetadata::new("rsa_sha256", DocumentCategory::Passport);
        let mut payload = TeePayload::seal("c", b"x", &key, metadata).unwrap();
        payload.nonce = BASE64.encode([0u8; 8]);
        assert!(matches!(payload.to_encrypted(), Err(RelayError::Encoding(_))));
    }

    #[test]
    fn response_status_mapping() {
        let ok: RelayResponse =
            serde_json::from_value(json!({"status": "ok", "result": {"proof": [1]}})).unwrap();
        assert_eq!(ok.into_result().unwrap(), json!({"proof": [1]}));

        let bare: RelayResponse = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert_eq!(bare.into_result().unwrap(), serde_json::Value::Null);

        let err: RelayResponse =
            serde_json::from_value(json!({"status": "error", "code": "attestation_failed"}))
                .unwrap();
        assert_eq!(err.into_result().unwrap_err().code, "attestation_failed");

        assert!(serde_json::from_value::<RelayResponse>(json!({"status": "pending"})).is_err());
    }
}
