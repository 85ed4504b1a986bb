//! # Register Inputs
//!
//! Inputs for the circuit that proves "this document was signed by a DSC,
//! and this commitment binds it to my secret". Chip records prove the
//! DG1 → eContent → signed attributes hash chain and the DSC signature over
//! the signed attributes; Aadhaar records prove the UIDAI signature over
//! the QR data.

use docproof_core::{AadhaarData, CertificateRecord, ChipData, DocumentRecord, PublicKeyParams};
use docproof_crypto::hash::digest;
use docproof_crypto::{generate_commitment, generate_nullifier, UserSecret};
use docproof_document::aadhaar;

use crate::encode::{ecdsa_signature_parts, find_offset, limb_count, sha_pad, to_limbs, Signal};
use crate::error::CircuitError;
use crate::inputs::CircuitInputs;
use crate::variant::{CircuitVariant, SignatureVariant};

/// Padded DG1 capacity (TD1 and TD3 DG1 fit two 64-byte blocks).
pub const MAX_DG1_PADDED: usize = 128;
/// Padded eContent capacity.
pub const MAX_ECONTENT_PADDED: usize = 512;
/// Padded signed-attributes capacity.
pub const MAX_SIGNED_ATTR_PADDED: usize = 256;
/// Padded Aadhaar QR data capacity.
pub const MAX_AADHAAR_PADDED: usize = 1536;

/// Build register inputs for `record`, signed by `dsc`.
///
/// # Errors
///
/// - [`CircuitError::MissingData`] for MRZ-only records (no chip data to
///   prove).
/// - [`CircuitError::UnsupportedAlgorithm`] when no circuit exists for the
///   record's algorithm and the DSC key.
/// - [`CircuitError::InputTooLarge`] when a padded input overflows its
///   circuit array.
pub fn generate_register_inputs(
    record: &DocumentRecord,
    dsc: &CertificateRecord,
    secret: &UserSecret,
) -> Result<CircuitInputs, CircuitError> {
    if record.chip().is_none() && record.aadhaar().is_none() {
        return Err(CircuitError::MissingData("chip data (MRZ-only scan)".into()));
    }
    let variant = CircuitVariant::for_register(record, dsc)?;
    let mut inputs = CircuitInputs::new(variant);

    match (&variant, record.chip(), record.aadhaar()) {
        (CircuitVariant::Register { signature, .. }, Some(chip), _) => {
            chip_signals(&mut inputs, chip)?;
            push_signer(&mut inputs, signature, dsc, &chip.encrypted_digest)?;
        }
        (CircuitVariant::RegisterAadhaar, _, Some(data)) => {
            aadhaar_signals(&mut inputs, data)?;
            push_rsa(&mut inputs, dsc, &data.signature)?;
        }
        _ => {
            return Err(CircuitError::MissingData(format!(
                "data matching the {variant} circuit"
            )))
        }
    }

    let attestation_id = record.category.attestation_id();
    inputs
        .set("secret", Signal::field(&secret.to_field()?))
        .set("attestation_id", Signal::number(attestation_id.0))
        .expect("commitment", generate_commitment(secret, record, attestation_id)?)
        .expect("nullifier", generate_nullifier(secret, record)?);

    tracing::debug!(
        circuit = %inputs.circuit_id,
        category = %record.category,
        signals = inputs.signals.len(),
        "register inputs generated"
    );
    Ok(inputs)
}

fn chip_signals(inputs: &mut CircuitInputs, chip: &ChipData) -> Result<(), CircuitError> {
    let (dg1, dg1_len) = sha_pad("dg1", &chip.dg1, chip.dg1_hash_algorithm, MAX_DG1_PADDED)?;
    let (e_content, e_content_len) = sha_pad(
        "e_content",
        &chip.e_content,
        chip.e_content_hash_algorithm,
        MAX_ECONTENT_PADDED,
    )?;
    let signature_hash = match inputs.variant {
        CircuitVariant::Register { signature, .. } => signature.hash(),
        _ => chip.e_content_hash_algorithm,
    };
    let (signed_attr, signed_attr_len) = sha_pad(
        "signed_attr",
        &chip.signed_attr,
        signature_hash,
        MAX_SIGNED_ATTR_PADDED,
    )?;

    let dg1_offset = find_offset(&chip.e_content, &digest(chip.dg1_hash_algorithm, &chip.dg1))
        .ok_or_else(|| CircuitError::MissingData("DG1 digest inside eContent".into()))?;
    let e_content_offset = find_offset(
        &chip.signed_attr,
        &digest(chip.e_content_hash_algorithm, &chip.e_content),
    )
    .ok_or_else(|| CircuitError::MissingData("eContent digest inside signed attributes".into()))?;

    inputs
        .set("dg1", Signal::bytes(&dg1))
        .set("dg1_padded_length", Signal::number(dg1_len as u64))
        .set("e_content", Signal::bytes(&e_content))
        .set("e_content_padded_length", Signal::number(e_content_len as u64))
        .set("dg1_hash_offset", Signal::number(dg1_offset as u64))
        .set("signed_attr", Signal::bytes(&signed_attr))
        .set("signed_attr_padded_length", Signal::number(signed_attr_len as u64))
        .set("e_content_hash_offset", Signal::number(e_content_offset as u64));
    Ok(())
}

fn aadhaar_signals(inputs: &mut CircuitInputs, data: &AadhaarData) -> Result<(), CircuitError> {
    let (qr, qr_len) = sha_pad(
        "qr_data",
        &data.signed_data,
        aadhaar::SIGNATURE_ALGORITHM.hash,
        MAX_AADHAAR_PADDED,
    )?;
    let positions: Vec<usize> = data
        .signed_data
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == aadhaar::DELIMITER)
        .map(|(i, _)| i)
        .take(aadhaar::FIELD_COUNT)
        .collect();
    let Some(&last) = positions.last().filter(|_| positions.len() == aadhaar::FIELD_COUNT) else {
        return Err(CircuitError::MissingData(format!(
            "{} field delimiters in QR data",
            aadhaar::FIELD_COUNT
        )));
    };

    inputs
        .set("qr_data", Signal::bytes(&qr))
        .set("qr_data_padded_length", Signal::number(qr_len as u64))
        .set(
            "delimiter_indices",
            Signal::Array(positions.iter().map(usize::to_string).collect()),
        )
        .set("photo_start", Signal::number(last as u64 + 1));
    Ok(())
}

/// Public key and signature signals for `signer`, in the form the
/// variant's gadget expects.
pub(crate) fn push_signer(
    inputs: &mut CircuitInputs,
    variant: &SignatureVariant,
    signer: &CertificateRecord,
    signature: &[u8],
) -> Result<(), CircuitError> {
    match variant {
        SignatureVariant::Rsa { .. } => push_rsa(inputs, signer, signature),
        SignatureVariant::RsaPss { hash, .. } => {
            push_rsa(inputs, signer, signature)?;
            inputs.set("salt_length", Signal::number(hash.output_len() as u64));
            Ok(())
        }
        SignatureVariant::Ecdsa { curve, .. } => {
            let (x, y) = signer.public_key.ec_coordinates().ok_or_else(|| {
                CircuitError::MissingData(format!("uncompressed {} point in {}", curve.as_str(), signer.subject))
            })?;
            let n = limb_count(curve.bits());
            let (r, s) = ecdsa_signature_parts(signature)?;
            let mut pubkey = to_limbs(x, n);
            pubkey.extend(to_limbs(y, n));
            let mut sig = to_limbs(&r, n);
            sig.extend(to_limbs(&s, n));
            inputs
                .set("pubkey", Signal::Array(pubkey))
                .set("signature", Signal::Array(sig));
            Ok(())
        }
    }
}

fn push_rsa(
    inputs: &mut CircuitInputs,
    signer: &CertificateRecord,
    signature: &[u8],
) -> Result<(), CircuitError> {
    let PublicKeyParams::Rsa { modulus, .. } = &signer.public_key else {
        return Err(CircuitError::MissingData(format!("RSA key in {}", signer.subject)));
    };
    let bits = signer.public_key.bits();
    if signature.len() > bits.div_ceil(8) as usize {
        return Err(CircuitError::MalformedSignature(format!(
            "{} byte RSA signature for a {bits}-bit key",
            signature.len()
        )));
    }
    let n = limb_count(bits);
    inputs
        .set("pubkey", Signal::Array(to_limbs(modulus, n)))
        .set("signature", Signal::Array(to_limbs(signature, n)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproof_core::{DocumentCategory, DocumentNumber, HolderIdentity, MrzDate, RawDocument, Sex};
    use docproof_document::{parse, parse_certificate, CategoryHint, RawScan};

    fn testdata(name: &str) -> Vec<u8> {
        let path = format!("{}/../../testdata/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read(&path).unwrap_or_else(|e| panic!("{path}: {e}"))
    }

    fn chip_record(name: &str) -> (DocumentRecord, CertificateRecord) {
        let record = parse(&RawScan::Chip(testdata(name)), CategoryHint::Auto).unwrap();
        let dsc = parse_certificate(record.chip().unwrap().dsc_pem.as_bytes()).unwrap();
        (record, dsc)
    }

    #[test]
    fn rsa_passport_inputs() {
        let (record, dsc) = chip_record("passport_rsa.json");
        let secret = UserSecret::new(vec![7u8; 32]);
        let inputs = generate_register_inputs(&record, &dsc, &secret).unwrap();

        assert_eq!(inputs.circuit_id, "register_sha256_sha256_sha256_rsa_65537_2048");
        assert_eq!(inputs.signal("dg1").unwrap().as_array().unwrap().len(), MAX_DG1_PADDED);
        assert_eq!(inputs.signal("pubkey").unwrap().as_array().unwrap().len(), 17);
        assert_eq!(inputs.signal("signature").unwrap().as_array().unwrap().len(), 17);
        assert_eq!(inputs.signal("attestation_id").unwrap().as_scalar(), Some("1"));
        assert_eq!(
            inputs.expected("commitment"),
            Some(&generate_commitment(&secret, &record, record.category.attestation_id()).unwrap())
        );
        assert!(inputs.expected("nullifier").is_some());
    }

    #[test]
    fn ecdsa_id_card_inputs() {
        let (record, dsc) = chip_record("id_card_ecdsa.json");
        let inputs = generate_register_inputs(&record, &dsc, &UserSecret::new(vec![1u8; 32])).unwrap();
        assert_eq!(inputs.circuit_id, "register_sha256_sha256_sha256_ecdsa_secp256r1_256");
        // 256-bit coordinates take three limbs each.
        assert_eq!(inputs.signal("pubkey").unwrap().as_array().unwrap().len(), 6);
        assert_eq!(inputs.signal("signature").unwrap().as_array().unwrap().len(), 6);
        assert_eq!(inputs.signal("attestation_id").unwrap().as_scalar(), Some("2"));
    }

    #[test]
    fn aadhaar_inputs() {
        let record = parse(&RawScan::Aadhaar(testdata("aadhaar_qr.bin")), CategoryHint::Aadhaar).unwrap();
        let signer = parse_certificate(&testdata("uidai_test.pem")).unwrap();
        let inputs = generate_register_inputs(&record, &signer, &UserSecret::new(vec![2u8; 32])).unwrap();
        assert_eq!(inputs.circuit_id, "register_aadhaar");
        assert_eq!(
            inputs.signal("delimiter_indices").unwrap().as_array().unwrap().len(),
            aadhaar::FIELD_COUNT
        );
        assert_eq!(inputs.signal("attestation_id").unwrap().as_scalar(), Some("3"));
    }

    #[test]
    fn mrz_only_record_is_missing_data() {
        let (_, dsc) = chip_record("passport_rsa.json");
        let lines = vec![
            "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<".to_string(),
            "L898902C36UTO7408122F1204159ZE184226B<<<<<10".to_string(),
        ];
        let identity = HolderIdentity {
            document_type: "P".into(),
            issuing_state: "UTO".into(),
            document_number: DocumentNumber::new("L898902C3").unwrap(),
            nationality: "UTO".into(),
            date_of_birth: MrzDate::new("740812").unwrap(),
            date_of_expiry: MrzDate::new("120415").unwrap(),
            sex: Sex::Female,
            surname: "ERIKSSON".into(),
            given_names: "ANNA MARIA".into(),
            optional_data: String::new(),
        };
        let record = DocumentRecord::new(
            DocumentCategory::Passport,
            identity,
            RawDocument::Mrz { lines },
            None,
            None,
        )
        .unwrap();
        let err = generate_register_inputs(&record, &dsc, &UserSecret::new(vec![0u8; 32])).unwrap_err();
        assert!(matches!(err, CircuitError::MissingData(_)));
    }

    #[test]
    fn untagged_algorithm_is_unsupported() {
        let (mut record, dsc) = chip_record("passport_rsa.json");
        record.signature_algorithm = None;
        let err = generate_register_inputs(&record, &dsc, &UserSecret::new(vec![0u8; 32])).unwrap_err();
        assert!(matches!(err, CircuitError::UnsupportedAlgorithm(_)));
    }
}
