//! # MRZ Parsing (ICAO 9303)
//!
//! Decodes the machine-readable zone of TD1 (3×30), TD2 (2×36) and TD3
//! (2×44) documents into [`HolderIdentity`] fields and the check-digit
//! groups that [`crate::validate`] evaluates.
//!
//! Check digits use the 7-3-1 weighting over character values
//! `0-9 → 0-9`, `A-Z → 10-35`, `< → 0`.

use docproof_core::{
    DocumentCategory, DocumentNumber, HolderIdentity, MrzDate, ParseError, Sex,
};

const WEIGHTS: [u32; 3] = [7, 3, 1];

/// MRZ size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MrzFormat {
    /// Three lines of 30 characters (ID cards).
    Td1,
    /// Two lines of 36 characters.
    Td2,
    /// Two lines of 44 characters (passports).
    Td3,
}

impl MrzFormat {
    pub fn detect(lines: &[String]) -> Result<Self, ParseError> {
        // Field offsets index bytes.
        if let Some(i) = lines.iter().position(|l| !l.is_ascii()) {
            return Err(ParseError::MalformedInput(format!(
                "line {} contains non-ASCII characters",
                i + 1
            )));
        }
        let width = lines.first().map(String::len).unwrap_or(0);
        let format = match (lines.len(), width) {
            (3, 30) => Self::Td1,
            (2, 36) => Self::Td2,
            (2, 44) => Self::Td3,
            (n, w) => {
                return Err(ParseError::MalformedInput(format!(
                    "expected 3x30, 2x36 or 2x44 MRZ, got {n} line(s) of width {w}"
                )))
            }
        };
        if let Some((i, line)) = lines.iter().enumerate().find(|(_, l)| l.len() != width) {
            return Err(ParseError::MalformedInput(format!(
                "line {} has length {}, expected {width}",
                i + 1,
                line.len()
            )));
        }
        Ok(format)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Td1 => "TD1",
            Self::Td2 => "TD2",
            Self::Td3 => "TD3",
        }
    }
}

fn char_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => Some(c as u32 - '0' as u32),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 10),
        '<' => Some(0),
        _ => None,
    }
}

/// ICAO 9303 check digit of `data`, or `None` if it contains a character
/// outside the MRZ alphabet.
pub fn check_digit(data: &str) -> Option<char> {
    let mut sum = 0u32;
    for (i, c) in data.chars().enumerate() {
        sum += char_value(c)? * WEIGHTS[i % 3];
    }
    char::from_digit(sum % 10, 10)
}

/// A data group covered by one check digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedField {
    pub name: &'static str,
    pub data: String,
    pub check: char,
}

impl CheckedField {
    fn new(name: &'static str, data: impl Into<String>, check: char) -> Self {
        Self {
            name,
            data: data.into(),
            check,
        }
    }

    /// An all-filler optional field may carry `<` instead of `0`.
    pub fn is_valid(&self) -> bool {
        if self.check == '<' {
            return self.data.chars().all(|c| c == '<');
        }
        check_digit(&self.data) == Some(self.check)
    }

    pub fn mismatch(&self) -> ParseError {
        let expected = check_digit(&self.data).map_or_else(|| "?".to_string(), String::from);
        ParseError::ChecksumMismatch {
            field: self.name.to_string(),
            detail: format!("expected {expected}, found {}", self.check),
        }
    }
}

/// Field-level decomposition of an MRZ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MrzFields {
    pub format: MrzFormat,
    pub document_code: String,
    pub issuing_state: String,
    pub document_number: String,
    pub nationality: String,
    pub date_of_birth: String,
    pub sex: char,
    pub date_of_expiry: String,
    pub optional_data: String,
    pub surname: String,
    pub given_names: String,
    pub checks: Vec<CheckedField>,
}

impl MrzFields {
    /// Category implied by the document code. Passports carry `P`; `I`,
    /// `A` and `C` are the ICAO codes for ID-sized travel documents.
    pub fn category(&self) -> Option<DocumentCategory> {
        match self.document_code.chars().next()? {
            'P' if self.format == MrzFormat::Td3 => Some(DocumentCategory::Passport),
            'I' | 'A' | 'C' => Some(DocumentCategory::IdCard),
            _ => None,
        }
    }

    pub fn first_invalid(&self) -> Option<&CheckedField> {
        self.checks.iter().find(|c| !c.is_valid())
    }

    pub fn to_identity(&self) -> Result<HolderIdentity, ParseError> {
        let malformed = |field: &str, e: &dyn std::fmt::Display| {
            ParseError::MalformedInput(format!("{field}: {e}"))
        };
        Ok(HolderIdentity {
            document_type: self.document_code.clone(),
            issuing_state: self.issuing_state.clone(),
            document_number: DocumentNumber::from_mrz_field(&self.document_number)
                .map_err(|e| malformed("document_number", &e))?,
            nationality: self.nationality.clone(),
            date_of_birth: MrzDate::new(self.date_of_birth.clone())
                .map_err(|e| malformed("date_of_birth", &e))?,
            date_of_expiry: MrzDate::new(self.date_of_expiry.clone())
                .map_err(|e| malformed("date_of_expiry", &e))?,
            sex: Sex::from_mrz_char(self.sex)
                .ok_or_else(|| malformed("sex", &format!("invalid code {:?}", self.sex)))?,
            surname: self.surname.clone(),
            given_names: self.given_names.clone(),
            optional_data: strip_filler(&self.optional_data),
        })
    }
}

/// Split scanner text into trimmed, non-empty MRZ lines.
pub fn split_lines(text: &str) -> Result<Vec<String>, ParseError> {
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    for line in &lines {
        if let Some(c) = line.chars().find(|c| char_value(*c).is_none()) {
            return Err(ParseError::MalformedInput(format!(
                "character {c:?} is not in the MRZ alphabet"
            )));
        }
    }
    Ok(lines)
}

fn strip_filler(s: &str) -> String {
    s.trim_end_matches('<').replace('<', " ")
}

fn names(field: &str) -> (String, String) {
    let field = field.trim_end_matches('<');
    let (surname, given) = field.split_once("<<").unwrap_or((field, ""));
    (
        surname.replace('<', " ").trim().to_string(),
        given.replace('<', " ").trim().to_string(),
    )
}

fn at(line: &str, i: usize) -> char {
    line.as_bytes()[i] as char
}

/// Decompose validated-shape MRZ lines into fields.
pub fn decompose(lines: &[String]) -> Result<MrzFields, ParseError> {
    let format = MrzFormat::detect(lines)?;
    let l1 = lines[0].as_str();
    let l2 = lines[1].as_str();
    let document_code = l1[0..2].trim_end_matches('<').to_string();
    let issuing_state = l1[2..5].to_string();

    let fields = match format {
        MrzFormat::Td3 | MrzFormat::Td2 => {
            let end = l2.len() - 1;
            let (surname, given_names) = names(&l1[5..]);
            let mut checks = vec![
                CheckedField::new("document_number", &l2[0..9], at(l2, 9)),
                CheckedField::new("date_of_birth", &l2[13..19], at(l2, 19)),
                CheckedField::new("date_of_expiry", &l2[21..27], at(l2, 27)),
            ];
            let optional_end = if format == MrzFormat::Td3 {
                checks.push(CheckedField::new("personal_number", &l2[28..42], at(l2, 42)));
                42
            } else {
                end
            };
            let composite = format!("{}{}{}", &l2[0..10], &l2[13..20], &l2[21..end]);
            checks.push(CheckedField::new("composite", composite, at(l2, end)));
            MrzFields {
                format,
                document_code,
                issuing_state,
                document_number: l2[0..9].to_string(),
                nationality: l2[10..13].to_string(),
                date_of_birth: l2[13..19].to_string(),
                sex: at(l2, 20),
                date_of_expiry: l2[21..27].to_string(),
                optional_data: l2[28..optional_end].to_string(),
                surname,
                given_names,
                checks,
            }
        }
        MrzFormat::Td1 => {
            let l3 = lines[2].as_str();
            let (surname, given_names) = names(l3);
            let composite = format!("{}{}{}{}", &l1[5..30], &l2[0..7], &l2[8..15], &l2[18..29]);
            MrzFields {
                format,
                document_code,
                issuing_state,
                document_number: l1[5..14].to_string(),
                nationality: l2[15..18].to_string(),
                date_of_birth: l2[0..6].to_string(),
                sex: at(l2, 7),
                date_of_expiry: l2[8..14].to_string(),
                optional_data: format!("{}{}", &l1[15..30], &l2[18..29]),
                surname,
                given_names,
                checks: vec![
                    CheckedField::new("document_number", &l1[5..14], at(l1, 14)),
                    CheckedField::new("date_of_birth", &l2[0..6], at(l2, 6)),
                    CheckedField::new("date_of_expiry", &l2[8..14], at(l2, 14)),
                    CheckedField::new("composite", composite, at(l2, 29)),
                ],
            }
        }
    };
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn td3() -> Vec<String> {
        vec![
            "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<".into(),
            "L898902C36UTO7408122F1204159ZE184226B<<<<<10".into(),
        ]
    }

    #[test]
    fn icao_check_digits() {
        assert_eq!(check_digit("L898902C3"), Some('6'));
        assert_eq!(check_digit("740812"), Some('2'));
        assert_eq!(check_digit("120415"), Some('9'));
        assert_eq!(check_digit("ZE184226B<<<<<"), Some('1'));
        assert_eq!(check_digit("<<<<"), Some('0'));
        assert_eq!(check_digit("abc"), None);
    }

    #[test]
    fn multibyte_line_is_malformed() {
        let mut lines = td3();
        lines[0] = lines[0].replacen("<<<", "\u{e9}<", 1);
        assert_eq!(lines[0].len(), 44);
        assert!(matches!(decompose(&lines), Err(ParseError::MalformedInput(_))));
    }

    #[test]
    fn td3_fields() {
        let f = decompose(&td3()).unwrap();
        assert_eq!(f.format, MrzFormat::Td3);
        assert_eq!(f.document_code, "P");
        assert_eq!(f.issuing_state, "UTO");
        assert_eq!(f.document_number, "L898902C3");
        assert_eq!(f.date_of_birth, "740812");
        assert_eq!(f.date_of_expiry, "120415");
        assert_eq!(f.sex, 'F');
        assert_eq!(f.surname, "ERIKSSON");
        assert_eq!(f.given_names, "ANNA MARIA");
        assert_eq!(f.category(), Some(DocumentCategory::Passport));
        assert!(f.first_invalid().is_none());
        assert_eq!(f.checks.len(), 5);
    }

    #[test]
    fn td1_fields() {
        let lines = vec![
            "IDFRAX4RTBPFW46<<<<<<<<<<<<<<<".to_string(),
            "9007138M3002119ESP<<<<<<<<<<<6".to_string(),
            "MARTIN<<SMITH<<<<<<<<<<<<<<<<<".to_string(),
        ];
        let f = decompose(&lines).unwrap();
        assert_eq!(f.format, MrzFormat::Td1);
        assert_eq!(f.issuing_state, "FRA");
        assert_eq!(f.nationality, "ESP");
        assert_eq!(f.document_number, "X4RTBPFW4");
        assert_eq!(f.date_of_birth, "900713");
        assert_eq!(f.date_of_expiry, "300211");
        assert_eq!(f.surname, "MARTIN");
        assert_eq!(f.given_names, "SMITH");
        assert_eq!(f.category(), Some(DocumentCategory::IdCard));
        assert!(f.first_invalid().is_none());
    }

    #[test]
    fn td2_composite_covers_optional_data() {
        let line2 = {
            let head = "D231458907UTO7408122F1204159<<<<<<<";
            let composite: String = [&head[0..10], &head[13..20], &head[21..35]].concat();
            format!("{head}{}", check_digit(&composite).unwrap())
        };
        let lines = vec![
            "I<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<".to_string(),
            line2,
        ];
        let f = decompose(&lines).unwrap();
        assert_eq!(f.format, MrzFormat::Td2);
        assert_eq!(f.document_code, "I");
        assert_eq!(f.document_number, "D23145890");
        assert!(f.first_invalid().is_none());
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let err = decompose(&["P<UTO".to_string()]).unwrap_err();
        assert!(matches!(err, ParseError::MalformedInput(_)));

        let mut lines = td3();
        lines[1].pop();
        assert!(matches!(decompose(&lines), Err(ParseError::MalformedInput(_))));
    }

    #[test]
    fn lower_case_rejected() {
        let err = split_lines("p<utoeriksson\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedInput(_)));
    }

    #[test]
    fn filler_check_on_empty_personal_number() {
        let f = CheckedField::new("personal_number", "<<<<<<<<<<<<<<", '<');
        assert!(f.is_valid());
        let g = CheckedField::new("personal_number", "AB<<<<<<<<<<<<", '<');
        assert!(!g.is_valid());
    }

    #[test]
    fn mismatch_detail_names_expected_digit() {
        let f = CheckedField::new("composite", "L898902C3", '1');
        assert_eq!(
            f.mismatch(),
            ParseError::ChecksumMismatch {
                field: "composite".into(),
                detail: "expected 6, found 1".into(),
            }
        );
    }
}
