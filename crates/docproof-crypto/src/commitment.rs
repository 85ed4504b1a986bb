//! # Commitments and Nullifiers
//!
//! Deterministic, secret-bound identifiers for a registered document.
//!
//! - `commitment = Poseidon(secret, attestation_id, H(document data), H(signed digest))`
//! - `nullifier  = Poseidon(NULLIFIER_DOMAIN, secret, H(document identity))`
//!
//! where `H` is [`hash_bytes`] (length-prefixed 31-byte packing) and
//! `secret = H(user secret bytes)`. Document data is DG1 for chip reads,
//! the concatenated MRZ for MRZ-only scans, and the `0xFF`-joined text
//! fields for Aadhaar. The signed digest is the eContent hash (chip) or
//! the SHA-256 of the signed QR data (Aadhaar); MRZ-only scans use `0`.

use docproof_core::{
    sha256_digest, AttestationId, CanonicalBytes, CanonicalizationError, ContentDigest,
    DocumentRecord, PackingOverflowError, RawDocument,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::field::FieldElement;
use crate::hash::{digest, sha256};
use crate::poseidon::{hash_bytes, poseidon_hash};

/// Domain separator for nullifiers (ASCII `nullifie`).
const NULLIFIER_DOMAIN: u64 = 0x6e_75_6c_6c_69_66_69_65;

/// The user's persistent secret, as read from secure storage.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct UserSecret(Vec<u8>);

impl UserSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// The secret as a field element.
    pub fn to_field(&self) -> Result<FieldElement, PackingOverflowError> {
        hash_bytes(&self.0)
    }
}

impl std::fmt::Debug for UserSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UserSecret(<redacted>)")
    }
}

/// Stable SHA-256 over the canonical form of the record, independent of
/// any secret.
pub fn content_hash(record: &DocumentRecord) -> Result<ContentDigest, CanonicalizationError> {
    Ok(sha256_digest(&CanonicalBytes::new(&record.canonical_view())?))
}

/// Bytes the commitment binds as document data.
pub fn document_data(record: &DocumentRecord) -> Vec<u8> {
    match &record.raw {
        RawDocument::Chip(chip) => chip.dg1.clone(),
        RawDocument::Mrz { lines } => lines.concat().into_bytes(),
        RawDocument::Aadhaar(a) => a
            .fields
            .iter()
            .map(String::as_bytes)
            .collect::<Vec<_>>()
            .join(&0xFF),
    }
}

/// The signed-digest element of a commitment.
pub fn signed_digest(record: &DocumentRecord) -> Result<FieldElement, PackingOverflowError> {
    match &record.raw {
        RawDocument::Chip(chip) => hash_bytes(&digest(chip.e_content_hash_algorithm, &chip.e_content)),
        RawDocument::Aadhaar(a) => hash_bytes(&sha256(&a.signed_data)),
        RawDocument::Mrz { .. } => Ok(FieldElement::ZERO),
    }
}

/// Commitment binding `secret` to the document under `attestation_id`.
///
/// # Errors
///
/// [`PackingOverflowError`] if the secret or document data is longer than
/// the packing capacity.
pub fn generate_commitment(
    secret: &UserSecret,
    record: &DocumentRecord,
    attestation_id: AttestationId,
) -> Result<FieldElement, PackingOverflowError> {
    Ok(poseidon_hash([
        secret.to_field()?,
        FieldElement::from_u64(attestation_id.0),
        hash_bytes(&document_data(record))?,
        signed_digest(record)?,
    ]))
}

/// Identity bytes bound into the nullifier.
fn identity_bytes(record: &DocumentRecord) -> Vec<u8> {
    let id = &record.identity;
    format!(
        "{}|{}|{}|{}",
        record.category, id.issuing_state, id.document_number, id.date_of_birth
    )
    .into_bytes()
}

/// Nullifier for the `(secret, document)` pair.
pub fn generate_nullifier(
    secret: &UserSecret,
    record: &DocumentRecord,
) -> Result<FieldElement, PackingOverflowError> {
    Ok(poseidon_hash([
        FieldElement::from_u64(NULLIFIER_DOMAIN),
        secret.to_field()?,
        hash_bytes(&identity_bytes(record))?,
    ]))
}
