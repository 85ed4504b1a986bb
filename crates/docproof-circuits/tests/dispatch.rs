//! Dispatch over the sample certificates and the full algorithm grid.

use docproof_core::{
    CertificateRecord, CurveOrExponent, EcCurve, HashAlgorithm, SignatureAlgorithm, SignatureScheme,
};
use docproof_circuits::{CircuitVariant, SignatureVariant};
use docproof_document::{parse, parse_certificate, verify_issued_by, CategoryHint, RawScan};
use proptest::prelude::*;

fn testdata(name: &str) -> Vec<u8> {
    let path = format!("{}/../../testdata/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read(&path).unwrap_or_else(|e| panic!("{path}: {e}"))
}

fn cert(name: &str) -> CertificateRecord {
    parse_certificate(&testdata(name)).unwrap()
}

#[test]
fn every_sample_chain_maps_to_one_dsc_circuit() {
    let chains = [
        ("dsc_rsa.pem", "csca_rsa.pem", "dsc_sha256_rsa_65537_2048"),
        ("dsc_rsapss.pem", "csca_rsa.pem", "dsc_sha256_rsapss_65537_2048"),
        ("dsc_ec.pem", "csca_ec.pem", "dsc_sha384_ecdsa_secp384r1_384"),
    ];
    for (dsc, csca, expected) in chains {
        let (dsc, csca) = (cert(dsc), cert(csca));
        let algorithm = verify_issued_by(&dsc, &csca).unwrap();
        let variant = CircuitVariant::for_dsc(&csca, algorithm).unwrap();
        assert_eq!(variant.circuit_id(), expected);
    }
}

#[test]
fn every_sample_document_maps_to_one_register_circuit() {
    let rsa = parse(&RawScan::Chip(testdata("passport_rsa.json")), CategoryHint::Auto).unwrap();
    let ec = parse(&RawScan::Chip(testdata("id_card_ecdsa.json")), CategoryHint::Auto).unwrap();
    let qr = parse(&RawScan::Aadhaar(testdata("aadhaar_qr.bin")), CategoryHint::Auto).unwrap();

    let chip_dsc = |r: &docproof_core::DocumentRecord| {
        parse_certificate(r.chip().unwrap().dsc_pem.as_bytes()).unwrap()
    };
    let cases = [
        (&rsa, chip_dsc(&rsa), "register_sha256_sha256_sha256_rsa_65537_2048"),
        (&ec, chip_dsc(&ec), "register_sha256_sha256_sha256_ecdsa_secp256r1_256"),
        (&qr, cert("uidai_test.pem"), "register_aadhaar"),
    ];
    for (record, dsc, expected) in cases {
        assert_eq!(CircuitVariant::for_register(record, &dsc).unwrap().circuit_id(), expected);
    }
}

#[test]
fn unsupported_curve_never_defaults() {
    let alg = SignatureAlgorithm::new(SignatureScheme::Ecdsa, HashAlgorithm::Sha256);
    let err = SignatureVariant::select(Some(alg), Some(CurveOrExponent::Exponent(65537)), 256).unwrap_err();
    assert_eq!(err.algorithm, "ecdsa_sha256");
}

fn scheme() -> impl Strategy<Value = SignatureScheme> {
    prop_oneof![
        Just(SignatureScheme::Rsa),
        Just(SignatureScheme::RsaPss),
        Just(SignatureScheme::Ecdsa)
    ]
}

fn curve_or_exponent() -> impl Strategy<Value = CurveOrExponent> {
    prop_oneof![
        prop::sample::select(vec![3u32, 17, 65537]).prop_map(CurveOrExponent::Exponent),
        prop::sample::select(EcCurve::ALL.to_vec()).prop_map(CurveOrExponent::Curve),
    ]
}

proptest! {
    /// Selection either yields a variant that reproduces its inputs or an
    /// error; it never substitutes different parameters.
    #[test]
    fn selection_is_faithful(
        scheme in scheme(),
        hash in prop::sample::select(HashAlgorithm::ALL.to_vec()),
        coe in curve_or_exponent(),
        bits in prop::sample::select(vec![1024u32, 2048, 3072, 4096, 256]),
    ) {
        let alg = SignatureAlgorithm::new(scheme, hash);
        match SignatureVariant::select(Some(alg), Some(coe), bits) {
            Ok(v) => {
                prop_assert_eq!(v.algorithm(), alg);
                match (v, coe) {
                    (SignatureVariant::Ecdsa { curve, .. }, CurveOrExponent::Curve(c)) => prop_assert_eq!(curve, c),
                    (SignatureVariant::Rsa { exponent, bits: b, .. }, CurveOrExponent::Exponent(e))
                    | (SignatureVariant::RsaPss { exponent, bits: b, .. }, CurveOrExponent::Exponent(e)) => {
                        prop_assert_eq!(exponent.value(), e);
                        prop_assert_eq!(b.bits(), bits);
                    }
                    (v, coe) => prop_assert!(false, "{:?} selected for {:?}", v, coe),
                }
            }
            Err(e) => {
                prop_assert_eq!(e.algorithm, alg.to_string());
                prop_assert_eq!(e.curve_or_exponent, coe.to_string());
            }
        }
    }
}
