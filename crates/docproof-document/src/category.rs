//! Structural document classification.

use docproof_core::{ChipData, DocumentCategory, DocumentRecord, RawDocument};
use serde::{Deserialize, Serialize};

use crate::aadhaar::FIELD_COUNT;
use crate::mrz::decompose;

/// Result of [`infer_document_category`]. `Unsupported` is the fallback
/// for anything ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredCategory {
    Passport,
    IdCard,
    Aadhaar,
    Unsupported,
}

impl InferredCategory {
    pub fn category(&self) -> Option<DocumentCategory> {
        match self {
            Self::Passport => Some(DocumentCategory::Passport),
            Self::IdCard => Some(DocumentCategory::IdCard),
            Self::Aadhaar => Some(DocumentCategory::Aadhaar),
            Self::Unsupported => None,
        }
    }
}

impl From<DocumentCategory> for InferredCategory {
    fn from(c: DocumentCategory) -> Self {
        match c {
            DocumentCategory::Passport => Self::Passport,
            DocumentCategory::IdCard => Self::IdCard,
            DocumentCategory::Aadhaar => Self::Aadhaar,
        }
    }
}

/// Classify a record from its raw structure: the MRZ document code for
/// passports and ID cards, the QR field layout for Aadhaar. The stored
/// `category` is not consulted.
pub fn infer_document_category(record: &DocumentRecord) -> InferredCategory {
    match &record.raw {
        RawDocument::Aadhaar(data) => {
            let versioned = data.fields.first().is_some_and(|v| v.starts_with('V'));
            if versioned && data.fields.len() == FIELD_COUNT {
                InferredCategory::Aadhaar
            } else {
                InferredCategory::Unsupported
            }
        }
        RawDocument::Mrz { lines } | RawDocument::Chip(ChipData { mrz_lines: lines, .. }) => decompose(lines)
            .ok()
            .and_then(|f| f.category())
            .map_or(InferredCategory::Unsupported, InferredCategory::from),
    }
}
