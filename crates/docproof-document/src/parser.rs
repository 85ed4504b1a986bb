//! # Scan Parser
//!
//! Entry point from the scanner collaborator: turns an opaque scan plus a
//! category hint into a [`DocumentRecord`].

use docproof_core::{
    CertificateError, CurveOrExponent, DocumentCategory, DocumentRecord, ParseError,
    PublicKeyKind, RawDocument, SignatureAlgorithm, SignatureScheme,
};

use crate::aadhaar;
use crate::certificate::{detect_signature_algorithm, parse_certificate};
use crate::chip::{chip_data, ChipPayload};
use crate::mrz::{decompose, split_lines, MrzFields};

/// A captured scan, as handed over by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawScan {
    /// MRZ text from OCR, one MRZ line per text line.
    Mrz(String),
    /// JSON chip payload read over NFC.
    Chip(Vec<u8>),
    /// Decompressed Aadhaar secure-QR bytes.
    Aadhaar(Vec<u8>),
}

/// What the user said they scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryHint {
    Passport,
    IdCard,
    Aadhaar,
    #[default]
    Auto,
}

impl CategoryHint {
    fn expected(&self) -> Option<DocumentCategory> {
        match self {
            Self::Passport => Some(DocumentCategory::Passport),
            Self::IdCard => Some(DocumentCategory::IdCard),
            Self::Aadhaar => Some(DocumentCategory::Aadhaar),
            Self::Auto => None,
        }
    }
}

impl std::str::FromStr for CategoryHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            other => other.parse::<DocumentCategory>().map(|c| match c {
                DocumentCategory::Passport => Self::Passport,
                DocumentCategory::IdCard => Self::IdCard,
                DocumentCategory::Aadhaar => Self::Aadhaar,
            }),
        }
    }
}

/// Parser behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Reject the scan on the first bad check digit instead of leaving it
    /// to [`crate::validate`].
    pub strict: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Parse with default (structural) options.
pub fn parse(raw: &RawScan, hint: CategoryHint) -> Result<DocumentRecord, ParseError> {
    parse_with(raw, hint, ParseOptions::default())
}

pub fn parse_with(
    raw: &RawScan,
    hint: CategoryHint,
    options: ParseOptions,
) -> Result<DocumentRecord, ParseError> {
    let record = match raw {
        RawScan::Mrz(text) => parse_mrz(text, hint, options)?,
        RawScan::Chip(bytes) => parse_chip(bytes, hint, options)?,
        RawScan::Aadhaar(bytes) => parse_aadhaar(bytes, hint)?,
    };
    tracing::debug!(
        category = %record.category,
        signature_algorithm = ?record.signature_algorithm.map(|a| a.to_string()),
        content_hash = %record.content_hash,
        "document parsed"
    );
    Ok(record)
}

fn mrz_fields(lines: &[String], options: ParseOptions) -> Result<MrzFields, ParseError> {
    let fields = decompose(lines)?;
    if options.strict {
        if let Some(bad) = fields.first_invalid() {
            return Err(bad.mismatch());
        }
    }
    Ok(fields)
}

fn resolve_category(fields: &MrzFields, hint: CategoryHint) -> Result<DocumentCategory, ParseError> {
    let implied = fields.category().ok_or_else(|| {
        ParseError::UnsupportedFormat(format!(
            "document code {:?} in a {} MRZ",
            fields.document_code,
            fields.format.as_str()
        ))
    })?;
    match hint.expected() {
        Some(expected) if expected != implied => Err(ParseError::UnsupportedFormat(format!(
            "{expected} hint contradicts {} MRZ with code {:?}",
            fields.format.as_str(),
            fields.document_code
        ))),
        _ => Ok(implied),
    }
}

fn assemble(
    category: DocumentCategory,
    fields: &MrzFields,
    raw: RawDocument,
    signature_algorithm: Option<SignatureAlgorithm>,
    curve_or_exponent: Option<CurveOrExponent>,
) -> Result<DocumentRecord, ParseError> {
    DocumentRecord::new(
        category,
        fields.to_identity()?,
        raw,
        signature_algorithm,
        curve_or_exponent,
    )
    .map_err(|e| ParseError::MalformedInput(e.to_string()))
}

fn parse_mrz(text: &str, hint: CategoryHint, options: ParseOptions) -> Result<DocumentRecord, ParseError> {
    let lines = split_lines(text)?;
    let fields = mrz_fields(&lines, options)?;
    let category = resolve_category(&fields, hint)?;
    assemble(category, &fields, RawDocument::Mrz { lines }, None, None)
}

fn certificate_error(e: CertificateError) -> ParseError {
    match e {
        CertificateError::UnsupportedKeyType(_) => ParseError::UnsupportedFormat(format!("DSC: {e}")),
        _ => ParseError::MalformedInput(format!("DSC: {e}")),
    }
}

fn parse_chip(bytes: &[u8], hint: CategoryHint, options: ParseOptions) -> Result<DocumentRecord, ParseError> {
    let payload = ChipPayload::from_json(bytes)?;
    let lines = split_lines(&payload.mrz)?;
    let fields = mrz_fields(&lines, options)?;
    let category = resolve_category(&fields, hint)?;
    let chip = chip_data(&payload, lines)?;
    let dsc = parse_certificate(payload.dsc.as_bytes()).map_err(certificate_error)?;

    let signature_algorithm = match &payload.signature_algorithm {
        Some(tag) => Some(
            tag.parse::<SignatureAlgorithm>()
                .map_err(ParseError::UnsupportedFormat)?,
        ),
        None => detect_signature_algorithm(&chip.signed_attr, &chip.encrypted_digest, &dsc).ok(),
    };
    if signature_algorithm.is_none() {
        tracing::warn!(dsc = %dsc.subject, "signature algorithm of chip data is unknown");
    }

    let curve_or_exponent = match &payload.curve_or_exponent {
        Some(tag) => {
            let scheme = match (signature_algorithm, dsc.key_kind()) {
                (Some(alg), _) => alg.scheme,
                (None, PublicKeyKind::Rsa) => SignatureScheme::Rsa,
                (None, PublicKeyKind::Ecdsa) => SignatureScheme::Ecdsa,
            };
            CurveOrExponent::parse_for(scheme, tag).map_err(ParseError::UnsupportedFormat)?
        }
        None => dsc.public_key.curve_or_exponent(),
    };

    assemble(
        category,
        &fields,
        RawDocument::Chip(chip),
        signature_algorithm,
        Some(curve_or_exponent),
    )
}

fn parse_aadhaar(bytes: &[u8], hint: CategoryHint) -> Result<DocumentRecord, ParseError> {
    if !matches!(hint, CategoryHint::Aadhaar | CategoryHint::Auto) {
        return Err(ParseError::UnsupportedFormat(
            "Aadhaar QR scanned under a passport or ID-card hint".into(),
        ));
    }
    let data = aadhaar::decode(bytes)?;
    let identity = aadhaar::identity(&data)?;
    DocumentRecord::new(
        DocumentCategory::Aadhaar,
        identity,
        RawDocument::Aadhaar(data),
        Some(aadhaar::SIGNATURE_ALGORITHM),
        Some(aadhaar::SIGNER_EXPONENT),
    )
    .map_err(|e| ParseError::MalformedInput(e.to_string()))
}
