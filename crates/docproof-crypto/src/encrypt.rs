//! # Relay Payload Encryption
//!
//! - AES-256-GCM over the serialized circuit inputs, with a fresh 12-byte
//!   nonce from the OS RNG on every [`encrypt`] call.
//! - Shared key: ephemeral ECDH P-256 against the TEE's pinned static
//!   public key, hashed with SHA-256.
//!
//! ## Security Invariants
//!
//! - A nonce is never chosen by the caller on the production path;
//!   [`encrypt_with_nonce`] exists for known-answer tests.
//! - [`SharedKey`] zeroizes on drop and redacts itself in `Debug`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::agreement::{self, EphemeralPrivateKey, UnparsedPublicKey, ECDH_P256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// AES-GCM nonce length.
pub const NONCE_SIZE: usize = 12;

/// AES-256 key length.
pub const KEY_SIZE: usize = 32;

/// Symmetric key shared with the TEE for one proving attempt.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; KEY_SIZE]);

impl SharedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            got: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Random key, for tests and local relays.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.0).map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            got: self.0.len(),
        })
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedKey(<redacted>)")
    }
}

/// Ciphertext (with appended GCM tag) and the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    #[serde(with = "docproof_core::serde_bytes::hex_vec")]
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
}

/// Seal `plaintext` under a fresh random nonce.
pub fn encrypt(plaintext: &[u8], key: &SharedKey) -> Result<EncryptedPayload, CryptoError> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    encrypt_with_nonce(plaintext, key, nonce)
}

/// Seal `plaintext` under an explicit nonce.
pub fn encrypt_with_nonce(
    plaintext: &[u8],
    key: &SharedKey,
    nonce: [u8; NONCE_SIZE],
) -> Result<EncryptedPayload, CryptoError> {
    let ciphertext = key
        .cipher()?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(EncryptedPayload { ciphertext, nonce })
}

/// Open a payload sealed by [`encrypt`].
pub fn decrypt(payload: &EncryptedPayload, key: &SharedKey) -> Result<Vec<u8>, CryptoError> {
    key.cipher()?
        .decrypt(Nonce::from_slice(&payload.nonce), payload.ciphertext.as_slice())
        .map_err(|_| CryptoError::Decryption)
}

// ---------------------------------------------------------------------------
// Key agreement
// ---------------------------------------------------------------------------

/// Result of an ephemeral ECDH with the TEE.
#[derive(Debug)]
pub struct KeyAgreement {
    pub shared_key: SharedKey,
    /// Uncompressed SEC1 point the TEE needs to derive the same key.
    pub client_public_key: Vec<u8>,
}

/// Derive a fresh shared key with the TEE's static P-256 public key
/// (uncompressed SEC1, 65 bytes).
pub fn derive_shared_key(tee_public_key: &[u8]) -> Result<KeyAgreement, CryptoError> {
    let rng = ring::rand::SystemRandom::new();
    let private = EphemeralPrivateKey::generate(&ECDH_P256, &rng)
        .map_err(|_| CryptoError::KeyAgreement("ephemeral key generation failed".into()))?;
    let public = private
        .compute_public_key()
        .map_err(|_| CryptoError::KeyAgreement("public key computation failed".into()))?;
    let peer = UnparsedPublicKey::new(&ECDH_P256, tee_public_key);
    let shared_key = agreement::agree_ephemeral(private, &peer, |material| {
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&Sha256::digest(material));
        SharedKey(key)
    })
    .map_err(|_| CryptoError::KeyAgreement("peer public key rejected".into()))?;
    Ok(KeyAgreement {
        shared_key,
        client_public_key: public.as_ref().to_vec(),
    })
}
