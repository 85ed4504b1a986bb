//! # Validated MRZ Primitives
//!
//! Newtypes for the MRZ fields whose shape the rest of the pipeline relies
//! on. Each has a single validating constructor, and deserialization routes
//! through it, so a record read back from JSON satisfies the same
//! invariants as one produced by the parser.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape violation for an MRZ primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Document number empty, longer than nine characters, or containing
    /// characters outside `A-Z0-9`.
    #[error("invalid document number: {0:?}")]
    InvalidDocumentNumber(String),

    /// Date is not exactly six ASCII digits.
    #[error("invalid MRZ date (expected YYMMDD): {0:?}")]
    InvalidDate(String),
}

macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// DocumentNumber
// ---------------------------------------------------------------------------

/// Document number as printed in the MRZ, filler characters removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentNumber(String);

impl_validating_deserialize!(DocumentNumber);

impl DocumentNumber {
    /// Longest document number an MRZ document-number field holds.
    pub const MAX_LEN: usize = 9;

    /// # Errors
    ///
    /// [`ValidationError::InvalidDocumentNumber`] unless the value is 1..=9
    /// characters of `A-Z0-9`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let ok = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !ok {
            return Err(ValidationError::InvalidDocumentNumber(raw));
        }
        Ok(Self(raw))
    }

    /// Build from a raw MRZ field, stripping `<` filler.
    pub fn from_mrz_field(field: &str) -> Result<Self, ValidationError> {
        Self::new(field.trim_end_matches('<'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// MrzDate
// ---------------------------------------------------------------------------

/// A `YYMMDD` date exactly as it appears in the MRZ.
///
/// The century is not encoded; [`MrzDate::to_birth_date`] and
/// [`MrzDate::to_expiry_date`] resolve it for their respective fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MrzDate(String);

impl_validating_deserialize!(MrzDate);

impl MrzDate {
    /// `000000`, used where a credential carries no expiry.
    pub const NO_EXPIRY: &'static str = "000000";

    /// # Errors
    ///
    /// [`ValidationError::InvalidDate`] unless the value is exactly six
    /// ASCII digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidDate(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> u32 {
        self.part(0)
    }

    pub fn month(&self) -> u32 {
        self.part(2)
    }

    pub fn day(&self) -> u32 {
        self.part(4)
    }

    fn part(&self, at: usize) -> u32 {
        // Both bytes are ASCII digits by construction.
        let b = self.0.as_bytes();
        u32::from(b[at] - b'0') * 10 + u32::from(b[at + 1] - b'0')
    }

    pub fn is_no_expiry(&self) -> bool {
        self.0 == Self::NO_EXPIRY
    }

    /// Resolve as a birth date: the latest century that does not put the
    /// date after `today`.
    pub fn to_birth_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        let current = today.year();
        let mut year = (current / 100) * 100 + self.year() as i32;
        if year > current {
            year -= 100;
        }
        let date = NaiveDate::from_ymd_opt(year, self.month(), self.day())?;
        if date > today {
            NaiveDate::from_ymd_opt(year - 100, self.month(), self.day())
        } else {
            Some(date)
        }
    }

    /// Resolve as an expiry date, always in the 2000s.
    pub fn to_expiry_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2000 + self.year() as i32, self.month(), self.day())
    }

    /// Render a calendar date in MRZ form.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!(
            "{:02}{:02}{:02}",
            date.year().rem_euclid(100),
            date.month(),
            date.day()
        ))
    }
}

impl std::fmt::Display for MrzDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
