//! # Record Validation
//!
//! [`validate`] re-derives every check a record can carry and reports each
//! one by name. It never fails: a record whose raw data can no longer be
//! decomposed reports a single `structure: false` entry.
//!
//! | source | fields |
//! |---|---|
//! | MRZ | `document_number`, `date_of_birth`, `date_of_expiry`, `personal_number` (TD3), `composite` |
//! | chip | MRZ fields, plus `dg1_hash`, `e_content_hash`, `signature` |
//! | Aadhaar | `date_of_birth`, `reference_id`, `pincode`, `signature_length` |

use std::collections::BTreeMap;

use docproof_core::{AadhaarData, ChipData, DocumentRecord, RawDocument};
use docproof_crypto::hash::digest;
use serde::{Deserialize, Serialize};

use crate::aadhaar::{field, SIGNATURE_LEN};
use crate::certificate::{parse_certificate, verify_signature};
use crate::mrz::decompose;

/// Field-level and overall validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Logical AND of every entry in `per_field`.
    pub overall: bool,
    pub per_field: BTreeMap<String, bool>,
}

impl ValidationResult {
    fn from_fields(per_field: BTreeMap<String, bool>) -> Self {
        Self {
            overall: !per_field.is_empty() && per_field.values().all(|ok| *ok),
            per_field,
        }
    }

    /// Names of the failing fields, in order.
    pub fn failures(&self) -> Vec<&str> {
        self.per_field
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn check_mrz(lines: &[String], out: &mut BTreeMap<String, bool>) {
    match decompose(lines) {
        Ok(fields) => {
            for check in &fields.checks {
                out.insert(check.name.to_string(), check.is_valid());
            }
        }
        Err(_) => {
            out.insert("structure".into(), false);
        }
    }
}

fn check_chip(record: &DocumentRecord, chip: &ChipData, out: &mut BTreeMap<String, bool>) {
    let dg1_hash = digest(chip.dg1_hash_algorithm, &chip.dg1);
    out.insert("dg1_hash".into(), contains(&chip.e_content, &dg1_hash));

    let e_content_hash = digest(chip.e_content_hash_algorithm, &chip.e_content);
    out.insert(
        "e_content_hash".into(),
        contains(&chip.signed_attr, &e_content_hash),
    );

    let signature_ok = match (record.signature_algorithm, parse_certificate(chip.dsc_pem.as_bytes())) {
        (Some(alg), Ok(dsc)) => verify_signature(alg, &dsc, &chip.signed_attr, &chip.encrypted_digest),
        _ => false,
    };
    out.insert("signature".into(), signature_ok);
}

fn check_aadhaar(record: &DocumentRecord, data: &AadhaarData, out: &mut BTreeMap<String, bool>) {
    let dob = &record.identity.date_of_birth;
    out.insert(
        "date_of_birth".into(),
        (1..=12).contains(&dob.month()) && (1..=31).contains(&dob.day()),
    );
    let reference = data.fields.get(field::REFERENCE_ID).map(String::as_str).unwrap_or("");
    out.insert(
        "reference_id".into(),
        reference.len() > 4 && reference.bytes().all(|b| b.is_ascii_digit()),
    );
    let pincode = data.fields.get(field::PINCODE).map(String::as_str).unwrap_or("");
    out.insert(
        "pincode".into(),
        pincode.len() == 6 && pincode.bytes().all(|b| b.is_ascii_digit()),
    );
    out.insert(
        "signature_length".into(),
        data.signature.len() == SIGNATURE_LEN,
    );
}

/// Validate a parsed record. Pure; never fails.
pub fn validate(record: &DocumentRecord) -> ValidationResult {
    let mut per_field = BTreeMap::new();
    match &record.raw {
        RawDocument::Mrz { lines } => check_mrz(lines, &mut per_field),
        RawDocument::Chip(chip) => {
            check_mrz(&chip.mrz_lines, &mut per_field);
            check_chip(record, chip, &mut per_field);
        }
        RawDocument::Aadhaar(data) => check_aadhaar(record, data, &mut per_field),
    }
    ValidationResult::from_fields(per_field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_is_not_valid() {
        let r = ValidationResult::from_fields(BTreeMap::new());
        assert!(!r.overall);
    }

    #[test]
    fn failures_listed() {
        let mut m = BTreeMap::new();
        m.insert("composite".to_string(), false);
        m.insert("date_of_birth".to_string(), true);
        let r = ValidationResult::from_fields(m);
        assert!(!r.overall);
        assert_eq!(r.failures(), ["composite"]);
    }

    #[test]
    fn serializes_camel_case() {
        let r = ValidationResult::from_fields(BTreeMap::from([("composite".to_string(), true)]));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["overall"], true);
        assert_eq!(json["perField"]["composite"], true);
    }
}
