//! # Document Records
//!
//! The canonical, parsed form of a scanned identity document. Passports and
//! ID cards are described by their MRZ fields (plus chip data when read over
//! NFC); Aadhaar credentials are mapped onto the same holder fields so the
//! commitment engine and circuit input generator see one shape.
//!
//! ## Invariants
//!
//! - `identity.document_number` is at most nine characters.
//! - Date fields are exactly six digits (`YYMMDD`).
//! - `content_hash` is computed at construction from the canonical form of
//!   `category`, `identity` and `raw`, and nothing else.

use serde::{Deserialize, Serialize};

use crate::algorithm::{CurveOrExponent, HashAlgorithm, SignatureAlgorithm};
use crate::canonical::CanonicalBytes;
use crate::digest::{sha256_digest, ContentDigest};
use crate::error::CanonicalizationError;
use crate::identity::{DocumentNumber, MrzDate};

/// Kind of identity document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Passport,
    IdCard,
    Aadhaar,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::IdCard => "id_card",
            Self::Aadhaar => "aadhaar",
        }
    }

    /// Attestation identifier bound into the commitment.
    pub fn attestation_id(&self) -> AttestationId {
        match self {
            Self::Passport => AttestationId::PASSPORT,
            Self::IdCard => AttestationId::ID_CARD,
            Self::Aadhaar => AttestationId::AADHAAR,
        }
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passport" => Ok(Self::Passport),
            "id_card" | "idcard" | "id-card" | "id" => Ok(Self::IdCard),
            "aadhaar" => Ok(Self::Aadhaar),
            _ => Err(format!("unknown document category: {s}")),
        }
    }
}

/// Numeric attestation type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttestationId(pub u64);

impl AttestationId {
    pub const PASSPORT: Self = Self(1);
    pub const ID_CARD: Self = Self(2);
    pub const AADHAAR: Self = Self(3);
}

/// Holder sex as encoded in the MRZ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Unspecified,
}

impl Sex {
    pub fn from_mrz_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(Self::Male),
            'F' => Some(Self::Female),
            '<' | 'X' => Some(Self::Unspecified),
            _ => None,
        }
    }

    pub fn as_mrz_char(&self) -> char {
        match self {
            Self::Male => 'M',
            Self::Female => 'F',
            Self::Unspecified => '<',
        }
    }
}

/// MRZ-derived holder and document fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderIdentity {
    /// Document code, e.g. `P`, `ID`, `I<`.
    pub document_type: String,
    pub issuing_state: String,
    pub document_number: DocumentNumber,
    pub nationality: String,
    pub date_of_birth: MrzDate,
    pub date_of_expiry: MrzDate,
    pub sex: Sex,
    pub surname: String,
    pub given_names: String,
    /// Personal number (TD3) or optional data (TD1/TD2), filler removed.
    pub optional_data: String,
}

/// Data read from the document chip over NFC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipData {
    pub mrz_lines: Vec<String>,
    /// DG1 TLV: `61 L 5F1F L <MRZ>`.
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub dg1: Vec<u8>,
    /// Digest algorithm whose DG1 hash appears in eContent.
    pub dg1_hash_algorithm: HashAlgorithm,
    /// DER `LDSSecurityObject`.
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub e_content: Vec<u8>,
    /// Digest algorithm whose eContent hash appears in the signed attributes.
    pub e_content_hash_algorithm: HashAlgorithm,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub signed_attr: Vec<u8>,
    /// DSC signature over `signed_attr`.
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub encrypted_digest: Vec<u8>,
    pub dsc_pem: String,
}

/// A decoded Aadhaar secure-QR credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AadhaarData {
    /// Text fields in QR order.
    pub fields: Vec<String>,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub photo: Vec<u8>,
    /// Every byte covered by the signature.
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub signed_data: Vec<u8>,
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub signature: Vec<u8>,
}

/// The raw material a record was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawDocument {
    Mrz { lines: Vec<String> },
    Chip(ChipData),
    Aadhaar(AadhaarData),
}

impl RawDocument {
    pub fn mrz_lines(&self) -> Option<&[String]> {
        match self {
            Self::Mrz { lines } => Some(lines),
            Self::Chip(chip) => Some(&chip.mrz_lines),
            Self::Aadhaar(_) => None,
        }
    }

    pub fn chip(&self) -> Option<&ChipData> {
        match self {
            Self::Chip(chip) => Some(chip),
            _ => None,
        }
    }

    pub fn aadhaar(&self) -> Option<&AadhaarData> {
        match self {
            Self::Aadhaar(a) => Some(a),
            _ => None,
        }
    }
}

/// Borrowed view over the fields that feed the content hash.
#[derive(Serialize)]
pub struct CanonicalDocument<'a> {
    pub category: DocumentCategory,
    pub identity: &'a HolderIdentity,
    pub raw: &'a RawDocument,
}

/// A parsed identity document.
///
/// Deserialization recomputes the content hash and rejects a stored hash
/// that does not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct DocumentRecord {
    pub category: DocumentCategory,
    pub identity: HolderIdentity,
    pub raw: RawDocument,
    /// Algorithm the document signer used, when known.
    pub signature_algorithm: Option<SignatureAlgorithm>,
    pub curve_or_exponent: Option<CurveOrExponent>,
    pub content_hash: ContentDigest,
}

#[derive(Deserialize)]
struct StoredRecord {
    category: DocumentCategory,
    identity: HolderIdentity,
    raw: RawDocument,
    signature_algorithm: Option<SignatureAlgorithm>,
    curve_or_exponent: Option<CurveOrExponent>,
    content_hash: ContentDigest,
}

impl TryFrom<StoredRecord> for DocumentRecord {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let record = Self::new(
            stored.category,
            stored.identity,
            stored.raw,
            stored.signature_algorithm,
            stored.curve_or_exponent,
        )
        .map_err(|e| e.to_string())?;
        if record.content_hash != stored.content_hash {
            return Err(format!(
                "content_hash {} does not match the record contents ({})",
                stored.content_hash, record.content_hash
            ));
        }
        Ok(record)
    }
}

impl DocumentRecord {
    /// Assemble a record and compute its content hash.
    pub fn new(
        category: DocumentCategory,
        identity: HolderIdentity,
        raw: RawDocument,
        signature_algorithm: Option<SignatureAlgorithm>,
        curve_or_exponent: Option<CurveOrExponent>,
    ) -> Result<Self, CanonicalizationError> {
        let content_hash = sha256_digest(&CanonicalBytes::new(&CanonicalDocument {
            category,
            identity: &identity,
            raw: &raw,
        })?);
        Ok(Self {
            category,
            identity,
            raw,
            signature_algorithm,
            curve_or_exponent,
            content_hash,
        })
    }

    pub fn canonical_view(&self) -> CanonicalDocument<'_> {
        CanonicalDocument {
            category: self.category,
            identity: &self.identity,
            raw: &self.raw,
        }
    }

    pub fn chip(&self) -> Option<&ChipData> {
        self.raw.chip()
    }

    pub fn aadhaar(&self) -> Option<&AadhaarData> {
        self.raw.aadhaar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(number: &str) -> HolderIdentity {
        HolderIdentity {
            document_type: "P".into(),
            issuing_state: "UTO".into(),
            document_number: DocumentNumber::new(number).unwrap(),
            nationality: "UTO".into(),
            date_of_birth: MrzDate::new("740812").unwrap(),
            date_of_expiry: MrzDate::new("120415").unwrap(),
            sex: Sex::Female,
            surname: "ERIKSSON".into(),
            given_names: "ANNA MARIA".into(),
            optional_data: "ZE184226B".into(),
        }
    }

    fn raw() -> RawDocument {
        RawDocument::Mrz {
            lines: vec!["P<UTO".into()],
        }
    }

    #[test]
    fn content_hash_is_pure() {
        let a = DocumentRecord::new(DocumentCategory::Passport, identity("L898902C3"), raw(), None, None)
            .unwrap();
        let b = DocumentRecord::new(DocumentCategory::Passport, identity("L898902C3"), raw(), None, None)
            .unwrap();
        assert_eq!(a.content_hash, b.content_hash);

        let c = DocumentRecord::new(DocumentCategory::Passport, identity("L898902C4"), raw(), None, None)
            .unwrap();
        assert_ne!(a.content_hash, c.content_hash);
    }

    #[test]
    fn content_hash_ignores_algorithm_tags() {
        let a = DocumentRecord::new(DocumentCategory::Passport, identity("L898902C3"), raw(), None, None)
            .unwrap();
        let b = DocumentRecord::new(
            DocumentCategory::Passport,
            identity("L898902C3"),
            raw(),
            Some("rsa_sha256".parse().unwrap()),
            Some(CurveOrExponent::Exponent(65537)),
        )
        .unwrap();
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn record_json_roundtrip() {
        let a = DocumentRecord::new(DocumentCategory::IdCard, identity("X4RTBPFW4"), raw(), None, None)
            .unwrap();
        let json = serde_json::to_string(&a).unwrap();
        let back: DocumentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn stale_content_hash_is_rejected() {
        let a = DocumentRecord::new(DocumentCategory::IdCard, identity("X4RTBPFW4"), raw(), None, None)
            .unwrap();
        let mut value = serde_json::to_value(&a).unwrap();
        value["identity"]["document_number"] = serde_json::json!("X4RTBPFW5");
        let err = serde_json::from_value::<DocumentRecord>(value).unwrap_err();
        assert!(err.to_string().contains("content_hash"), "{err}");
    }

    #[test]
    fn attestation_ids() {
        assert_eq!(DocumentCategory::Passport.attestation_id().0, 1);
        assert_eq!(DocumentCategory::IdCard.attestation_id().0, 2);
        assert_eq!(DocumentCategory::Aadhaar.attestation_id().0, 3);
        assert_eq!("id_card".parse::<DocumentCategory>().unwrap(), DocumentCategory::IdCard);
    }

    #[test]
    fn sex_codes() {
        assert_eq!(Sex::from_mrz_char('F'), Some(Sex::Female));
        assert_eq!(Sex::from_mrz_char('<'), Some(Sex::Unspecified));
        assert_eq!(Sex::from_mrz_char('Q'), None);
        assert_eq!(Sex::Male.as_mrz_char(), 'M');
    }
}
