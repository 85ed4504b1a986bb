//! # Aadhaar Secure QR
//!
//! The decompressed QR payload is a run of `0xFF`-delimited ISO-8859-1 text
//! fields, followed by the JPEG2000 photo, followed by a 256-byte
//! RSA-2048/SHA-256 signature over everything before it.
//!
//! V2 field order: version, email/mobile indicator, reference id, name,
//! DOB (`DD-MM-YYYY`), gender, care-of, district, landmark, house,
//! location, pincode, post office, state, street, sub-district, VTC,
//! last four digits of the mobile number.

use docproof_core::{
    AadhaarData, CertificateRecord, CurveOrExponent, DocumentNumber, HashAlgorithm,
    HolderIdentity, MrzDate, ParseError, SignatureAlgorithm, SignatureScheme, Sex,
};

use crate::certificate::verify_signature;

pub const DELIMITER: u8 = 0xFF;
pub const SIGNATURE_LEN: usize = 256;
pub const FIELD_COUNT: usize = 18;

/// UIDAI signs with RSA-2048, e = 65537, PKCS#1 v1.5 over SHA-256.
pub const SIGNATURE_ALGORITHM: SignatureAlgorithm =
    SignatureAlgorithm::new(SignatureScheme::Rsa, HashAlgorithm::Sha256);
pub const SIGNER_EXPONENT: CurveOrExponent = CurveOrExponent::Exponent(65537);

/// Positions of the fields this pipeline reads.
pub mod field {
    pub const VERSION: usize = 0;
    pub const REFERENCE_ID: usize = 2;
    pub const NAME: usize = 3;
    pub const DATE_OF_BIRTH: usize = 4;
    pub const GENDER: usize = 5;
    pub const PINCODE: usize = 11;
    pub const STATE: usize = 13;
}

/// Split a decompressed QR payload into text fields, photo and signature.
pub fn decode(bytes: &[u8]) -> Result<AadhaarData, ParseError> {
    if bytes.len() <= SIGNATURE_LEN {
        return Err(ParseError::MalformedInput(format!(
            "QR payload of {} bytes is shorter than its signature",
            bytes.len()
        )));
    }
    let (signed_data, signature) = bytes.split_at(bytes.len() - SIGNATURE_LEN);

    let mut fields = Vec::with_capacity(FIELD_COUNT);
    let mut rest = signed_data;
    while fields.len() < FIELD_COUNT {
        let end = rest.iter().position(|b| *b == DELIMITER).ok_or_else(|| {
            ParseError::MalformedInput(format!(
                "expected {FIELD_COUNT} delimited fields, found {}",
                fields.len()
            ))
        })?;
        // ISO-8859-1 maps bytes to the first 256 code points.
        fields.push(rest[..end].iter().map(|b| char::from(*b)).collect::<String>());
        rest = &rest[end + 1..];
    }

    if fields[field::VERSION] != "V2" {
        return Err(ParseError::UnsupportedFormat(format!(
            "Aadhaar QR version {:?}",
            fields[field::VERSION]
        )));
    }

    Ok(AadhaarData {
        fields,
        photo: rest.to_vec(),
        signed_data: signed_data.to_vec(),
        signature: signature.to_vec(),
    })
}

/// `DD-MM-YYYY` to `YYMMDD`.
fn birth_date(dob: &str) -> Result<MrzDate, ParseError> {
    let parts: Vec<&str> = dob.split(['-', '/']).collect();
    let invalid = || ParseError::MalformedInput(format!("date of birth {dob:?}"));
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    match parts.as_slice() {
        [dd, mm, yyyy] if digits(dd, 2) && digits(mm, 2) && digits(yyyy, 4) => {
            MrzDate::new(format!("{}{mm}{dd}", &yyyy[2..])).map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

/// Map decoded QR fields onto holder fields.
pub fn identity(data: &AadhaarData) -> Result<HolderIdentity, ParseError> {
    let f = &data.fields;
    let reference = &f[field::REFERENCE_ID];
    let last4 = reference.get(..4).filter(|s| s.bytes().all(|b| b.is_ascii_digit()));
    let document_number = last4
        .ok_or_else(|| ParseError::MalformedInput(format!("reference id {reference:?}")))
        .and_then(|n| {
            DocumentNumber::new(n).map_err(|e| ParseError::MalformedInput(e.to_string()))
        })?;
    let sex = match f[field::GENDER].as_str() {
        "M" => Sex::Male,
        "F" => Sex::Female,
        _ => Sex::Unspecified,
    };
    Ok(HolderIdentity {
        document_type: "A".into(),
        issuing_state: "IND".into(),
        document_number,
        nationality: "IND".into(),
        date_of_birth: birth_date(&f[field::DATE_OF_BIRTH])?,
        date_of_expiry: MrzDate::new(MrzDate::NO_EXPIRY)
            .map_err(|e| ParseError::MalformedInput(e.to_string()))?,
        sex,
        surname: f[field::NAME].clone(),
        given_names: String::new(),
        optional_data: f[field::PINCODE].clone(),
    })
}

/// Verify the QR signature against the UIDAI signer certificate.
pub fn verify_qr_signature(data: &AadhaarData, signer: &CertificateRecord) -> bool {
    verify_signature(SIGNATURE_ALGORITHM, signer, &data.signed_data, &data.signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::parse_certificate;

    fn fixture(name: &str) -> Vec<u8> {
        std::fs::read(format!("{}/../../testdata/{name}", env!("CARGO_MANIFEST_DIR"))).unwrap()
    }

    #[test]
    fn decodes_fixture() {
        let data = decode(&fixture("aadhaar_qr.bin")).unwrap();
        assert_eq!(data.fields.len(), FIELD_COUNT);
        assert_eq!(data.fields[field::NAME], "Sumit Kumar");
        assert_eq!(data.photo.len(), 199);
        assert_eq!(data.signature.len(), SIGNATURE_LEN);

        let id = identity(&data).unwrap();
        assert_eq!(id.document_number.as_str(), "2697");
        assert_eq!(id.date_of_birth.as_str(), "840101");
        assert!(id.date_of_expiry.is_no_expiry());
        assert_eq!(id.nationality, "IND");
        assert_eq!(id.sex, Sex::Male);
        assert_eq!(id.optional_data, "110051");
    }

    #[test]
    fn signature_verifies_against_signer() {
        let data = decode(&fixture("aadhaar_qr.bin")).unwrap();
        let signer = parse_certificate(&fixture("uidai_test.pem")).unwrap();
        assert!(verify_qr_signature(&data, &signer));

        let mut tampered = data.clone();
        tampered.signed_data[10] ^= 1;
        assert!(!verify_qr_signature(&tampered, &signer));

        let other = parse_certificate(&fixture("csca_rsa.pem")).unwrap();
        assert!(!verify_qr_signature(&data, &other));
    }

    #[test]
    fn truncated_payload_is_malformed() {
        assert!(matches!(decode(&[0u8; 100]), Err(ParseError::MalformedInput(_))));
        let mut short = b"V2\xff3\xff".to_vec();
        short.extend([0u8; SIGNATURE_LEN]);
        assert!(matches!(decode(&short), Err(ParseError::MalformedInput(_))));
    }

    #[test]
    fn other_versions_unsupported() {
        let mut bytes = fixture("aadhaar_qr.bin");
        bytes[1] = b'9';
        assert!(matches!(decode(&bytes), Err(ParseError::UnsupportedFormat(_))));
    }

    #[test]
    fn birth_date_formats() {
        assert_eq!(birth_date("31-12-1999").unwrap().as_str(), "991231");
        assert_eq!(birth_date("01/02/2003").unwrap().as_str(), "030201");
        assert!(birth_date("1984").is_err());
        assert!(birth_date("1a-01-1999").is_err());
    }

    #[test]
    fn non_ascii_birth_date_is_malformed() {
        let mut payload = Vec::new();
        for (i, value) in [&b"V2"[..], b"3", b"269720190101120000000", b"Test Holder"]
            .into_iter()
            .chain([&b"01-01-1\xe99"[..], b"M"])
            .chain(std::iter::repeat(&b""[..]).take(FIELD_COUNT - 6))
            .enumerate()
        {
            assert!(i < FIELD_COUNT);
            payload.extend_from_slice(value);
            payload.push(DELIMITER);
        }
        payload.extend([0x42u8; 16]);
        payload.extend([0u8; SIGNATURE_LEN]);

        let data = decode(&payload).unwrap();
        assert_eq!(data.fields[field::DATE_OF_BIRTH].chars().count(), 10);
        assert!(matches!(identity(&data), Err(ParseError::MalformedInput(_))));
    }
}
