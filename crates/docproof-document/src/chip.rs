//! # NFC Chip Payloads
//!
//! A chip read arrives as JSON with base64 binary members:
//!
//! ```json
//! { "mrz": "P<UTO...\nL898...", "e_content": "...", "signed_attr": "...",
//!   "encrypted_digest": "...", "dsc": "-----BEGIN CERTIFICATE-----...",
//!   "signature_algorithm": "rsa_sha256", "curve_or_exponent": "65537" }
//! ```
//!
//! DG1 is rebuilt from the MRZ as `61 L 5F1F L <MRZ>`. The hash algorithms
//! for DG1 and eContent are recovered by locating each digest inside the
//! structure that should contain it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use docproof_core::{ChipData, HashAlgorithm, ParseError};
use docproof_crypto::hash::find_embedded_digest;
use serde::Deserialize;

/// Wire form of a chip read.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChipPayload {
    pub mrz: String,
    pub e_content: String,
    pub signed_attr: String,
    pub encrypted_digest: String,
    pub dsc: String,
    #[serde(default)]
    pub signature_algorithm: Option<String>,
    #[serde(default)]
    pub curve_or_exponent: Option<String>,
}

impl ChipPayload {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ParseError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ParseError::MalformedInput(format!("chip payload: {e}")))
    }
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>, ParseError> {
    BASE64
        .decode(value.trim())
        .map_err(|e| ParseError::MalformedInput(format!("{field}: {e}")))
}

/// ICAO DG1 encoding of the concatenated MRZ.
pub fn build_dg1(mrz: &str) -> Vec<u8> {
    let body = mrz.as_bytes();
    let mut inner = vec![0x5F, 0x1F];
    push_len(&mut inner, body.len());
    inner.extend_from_slice(body);
    let mut out = vec![0x61];
    push_len(&mut out, inner.len());
    out.extend(inner);
    out
}

fn push_len(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xFF {
        out.extend([0x81, len as u8]);
    } else {
        out.extend([0x82, (len >> 8) as u8, len as u8]);
    }
}

fn embedded(field: &str, data: &[u8], container: &[u8]) -> Result<HashAlgorithm, ParseError> {
    find_embedded_digest(data, container).ok_or_else(|| ParseError::ChecksumMismatch {
        field: field.to_string(),
        detail: "no SHA-1/SHA-2 digest of the covered data was found".to_string(),
    })
}

/// Decode binary members and recover the hash chain. The MRZ lines are
/// supplied already split and shape-checked.
pub fn chip_data(payload: &ChipPayload, mrz_lines: Vec<String>) -> Result<ChipData, ParseError> {
    let dg1 = build_dg1(&mrz_lines.concat());
    let e_content = decode("e_content", &payload.e_content)?;
    let signed_attr = decode("signed_attr", &payload.signed_attr)?;
    let encrypted_digest = decode("encrypted_digest", &payload.encrypted_digest)?;
    let dg1_hash_algorithm = embedded("dg1_hash", &dg1, &e_content)?;
    let e_content_hash_algorithm = embedded("e_content_hash", &e_content, &signed_attr)?;
    Ok(ChipData {
        mrz_lines,
        dg1,
        dg1_hash_algorithm,
        e_content,
        e_content_hash_algorithm,
        signed_attr,
        encrypted_digest,
        dsc_pem: payload.dsc.clone(),
    })
}
