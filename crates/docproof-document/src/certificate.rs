//! # Certificate Parser
//!
//! Decodes DSC and CSCA certificates (PEM or DER) into
//! [`CertificateRecord`]s and verifies signatures made by them.
//!
//! ## Signature-algorithm detection
//!
//! Chip payloads rarely say which algorithm the DSC used over the signed
//! attributes. [`detect_signature_algorithm`] tries a fixed candidate list
//! per signer key and returns the first that verifies:
//!
//! | signer key | order |
//! |---|---|
//! | RSA | PKCS#1 SHA-256, PSS SHA-256, PKCS#1 SHA-1, PKCS#1 SHA-384, PKCS#1 SHA-512, PSS SHA-384, PSS SHA-512 |
//! | ECDSA P-256 | SHA-256, SHA-384 |
//! | ECDSA P-384 | SHA-384, SHA-256 |
//!
//! Other curves have no verifier and never match.

use docproof_core::{
    CertificateError, CertificateRecord, EcCurve, HashAlgorithm, PublicKeyParams, RsaPssParams,
    SignatureAlgorithm, SignatureScheme,
};
use docproof_crypto::hash::sha256;
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{X509Certificate, X509Name};
use x509_parser::public_key::PublicKey;
use x509_parser::signature_algorithm::SignatureAlgorithm as X509SignatureAlgorithm;

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";

const RSA_CANDIDATES: [SignatureAlgorithm; 7] = [
    SignatureAlgorithm::new(SignatureScheme::Rsa, HashAlgorithm::Sha256),
    SignatureAlgorithm::new(SignatureScheme::RsaPss, HashAlgorithm::Sha256),
    SignatureAlgorithm::new(SignatureScheme::Rsa, HashAlgorithm::Sha1),
    SignatureAlgorithm::new(SignatureScheme::Rsa, HashAlgorithm::Sha384),
    SignatureAlgorithm::new(SignatureScheme::Rsa, HashAlgorithm::Sha512),
    SignatureAlgorithm::new(SignatureScheme::RsaPss, HashAlgorithm::Sha384),
    SignatureAlgorithm::new(SignatureScheme::RsaPss, HashAlgorithm::Sha512),
];

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn malformed(e: impl std::fmt::Debug) -> CertificateError {
    CertificateError::MalformedEncoding(format!("{e:?}"))
}

fn to_der(input: &[u8]) -> Result<Vec<u8>, CertificateError> {
    let start = input.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(input.len());
    let trimmed = &input[start..];
    if trimmed.starts_with(b"-----BEGIN") {
        let (_, pem) = parse_x509_pem(trimmed).map_err(malformed)?;
        if pem.label != "CERTIFICATE" {
            return Err(CertificateError::MalformedEncoding(format!(
                "unexpected PEM label {}",
                pem.label
            )));
        }
        Ok(pem.contents)
    } else {
        Ok(input.to_vec())
    }
}

fn common_name(name: &X509Name<'_>) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| name.to_string())
}

fn exponent_u32(bytes: &[u8]) -> Result<u32, CertificateError> {
    let lead = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let digits = &bytes[lead..];
    if digits.len() > 4 {
        return Err(CertificateError::UnsupportedKeyType(
            "RSA exponent wider than 32 bits".into(),
        ));
    }
    Ok(digits.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
}

fn tagged_algorithm(cert: &X509Certificate<'_>) -> (Option<SignatureAlgorithm>, Option<RsaPssParams>) {
    match X509SignatureAlgorithm::try_from(&cert.signature_algorithm) {
        Ok(X509SignatureAlgorithm::RSASSA_PSS(params)) => {
            let Some(hash) = HashAlgorithm::from_oid(&params.hash_algorithm_oid().to_id_string())
            else {
                return (None, None);
            };
            (
                Some(SignatureAlgorithm::new(SignatureScheme::RsaPss, hash)),
                Some(RsaPssParams {
                    hash,
                    salt_length: params.salt_length(),
                }),
            )
        }
        _ => (
            SignatureAlgorithm::from_oid(&cert.signature_algorithm.algorithm.to_id_string()),
            None,
        ),
    }
}

/// Parse a PEM or DER X.509 certificate.
///
/// # Errors
///
/// - [`CertificateError::MalformedEncoding`] if the bytes are not a
///   certificate.
/// - [`CertificateError::UnsupportedKeyType`] for keys other than RSA or
///   ECDSA over a supported named curve.
pub fn parse_certificate(input: &[u8]) -> Result<CertificateRecord, CertificateError> {
    let der = to_der(input)?;
    let (_, cert) = x509_parser::parse_x509_certificate(&der).map_err(malformed)?;
    let spki = cert.public_key();
    let key_oid = spki.algorithm.algorithm.to_id_string();
    let public_key_bytes = spki.subject_public_key.data.to_vec();
    let (signature_algorithm, pss) = tagged_algorithm(&cert);

    let public_key = match key_oid.as_str() {
        OID_RSA_ENCRYPTION => match spki.parsed().map_err(malformed)? {
            PublicKey::RSA(rsa) => {
                let lead = rsa.modulus.iter().position(|b| *b != 0).unwrap_or(0);
                PublicKeyParams::Rsa {
                    modulus: rsa.modulus[lead..].to_vec(),
                    exponent: exponent_u32(rsa.exponent)?,
                    pss,
                }
            }
            _ => return Err(CertificateError::MalformedEncoding("RSA key body".into())),
        },
        OID_EC_PUBLIC_KEY => {
            let curve_oid = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|p| p.as_oid().ok())
                .map(|oid| oid.to_id_string())
                .ok_or_else(|| {
                    CertificateError::UnsupportedKeyType("EC key without a named curve".into())
                })?;
            let curve = EcCurve::from_oid(&curve_oid).ok_or_else(|| {
                CertificateError::UnsupportedKeyType(format!("named curve {curve_oid}"))
            })?;
            PublicKeyParams::Ecdsa {
                curve,
                point: public_key_bytes.clone(),
            }
        }
        other => {
            return Err(CertificateError::UnsupportedKeyType(format!(
                "public key algorithm {other}"
            )))
        }
    };

    Ok(CertificateRecord {
        public_key,
        public_key_bytes,
        issuer: common_name(cert.issuer()),
        subject: common_name(cert.subject()),
        signature_algorithm,
        tbs: cert.tbs_certificate.as_ref().to_vec(),
        signature: cert.signature_value.data.to_vec(),
        fingerprint: sha256(&der),
    })
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

fn verifier(
    algorithm: SignatureAlgorithm,
    key: &PublicKeyParams,
) -> Option<&'static dyn VerificationAlgorithm> {
    use HashAlgorithm::*;
    use SignatureScheme::*;
    let alg: &'static dyn VerificationAlgorithm = match (algorithm.scheme, algorithm.hash, key) {
        (Rsa, Sha1, PublicKeyParams::Rsa { .. }) => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        (Rsa, Sha256, PublicKeyParams::Rsa { .. }) => &signature::RSA_PKCS1_2048_8192_SHA256,
        (Rsa, Sha384, PublicKeyParams::Rsa { .. }) => &signature::RSA_PKCS1_2048_8192_SHA384,
        (Rsa, Sha512, PublicKeyParams::Rsa { .. }) => &signature::RSA_PKCS1_2048_8192_SHA512,
        (RsaPss, Sha256, PublicKeyParams::Rsa { .. }) => &signature::RSA_PSS_2048_8192_SHA256,
        (RsaPss, Sha384, PublicKeyParams::Rsa { .. }) => &signature::RSA_PSS_2048_8192_SHA384,
        (RsaPss, Sha512, PublicKeyParams::Rsa { .. }) => &signature::RSA_PSS_2048_8192_SHA512,
        (Ecdsa, Sha256, PublicKeyParams::Ecdsa { curve: EcCurve::P256, .. }) => &signature::ECDSA_P256_SHA256_ASN1,
        (Ecdsa, Sha384, PublicKeyParams::Ecdsa { curve: EcCurve::P256, .. }) => &signature::ECDSA_P256_SHA384_ASN1,
        (Ecdsa, Sha256, PublicKeyParams::Ecdsa { curve: EcCurve::P384, .. }) => &signature::ECDSA_P384_SHA256_ASN1,
        (Ecdsa, Sha384, PublicKeyParams::Ecdsa { curve: EcCurve::P384, .. }) => &signature::ECDSA_P384_SHA384_ASN1,
        _ => return None,
    };
    Some(alg)
}

/// Whether `signature` over `message` verifies under `signer`'s key with
/// `algorithm`. Combinations without a verifier report `false`.
pub fn verify_signature(
    algorithm: SignatureAlgorithm,
    signer: &CertificateRecord,
    message: &[u8],
    signature: &[u8],
) -> bool {
    verifier(algorithm, &signer.public_key).is_some_and(|alg| {
        UnparsedPublicKey::new(alg, &signer.public_key_bytes)
            .verify(message, signature)
            .is_ok()
    })
}

/// Candidate algorithms for `signer`, in try order.
pub fn candidates(signer: &CertificateRecord) -> Vec<SignatureAlgorithm> {
    match &signer.public_key {
        PublicKeyParams::Rsa { .. } => RSA_CANDIDATES.to_vec(),
        PublicKeyParams::Ecdsa { curve, .. } => {
            let hashes = match curve {
                EcCurve::P256 => vec![HashAlgorithm::Sha256, HashAlgorithm::Sha384],
                EcCurve::P384 => vec![HashAlgorithm::Sha384, HashAlgorithm::Sha256],
                _ => Vec::new(),
            };
            hashes
                .into_iter()
                .map(|h| SignatureAlgorithm::new(SignatureScheme::Ecdsa, h))
                .collect()
        }
    }
}

/// Brute-force the algorithm `signer` used to produce `signature`.
pub fn detect_signature_algorithm(
    message: &[u8],
    signature: &[u8],
    signer: &CertificateRecord,
) -> Result<SignatureAlgorithm, CertificateError> {
    for candidate in candidates(signer) {
        if verify_signature(candidate, signer, message, signature) {
            tracing::debug!(algorithm = %candidate, signer = %signer.subject, "signature algorithm detected");
            return Ok(candidate);
        }
    }
    tracing::warn!(signer = %signer.subject, "no candidate signature algorithm verified");
    Err(CertificateError::NoMatchingAlgorithm)
}

/// Check that `csca` signed `dsc`, returning the algorithm that verified.
/// The DSC's tagged algorithm is tried before the brute-force list.
pub fn verify_issued_by(
    dsc: &CertificateRecord,
    csca: &CertificateRecord,
) -> Result<SignatureAlgorithm, CertificateError> {
    if let Some(tagged) = dsc.signature_algorithm {
        if verify_signature(tagged, csca, &dsc.tbs, &dsc.signature) {
            return Ok(tagged);
        }
    }
    detect_signature_algorithm(&dsc.tbs, &dsc.signature, csca)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproof_core::{CurveOrExponent, PublicKeyKind};

    fn testdata(name: &str) -> Vec<u8> {
        let path = format!("{}/../../testdata/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read(&path).unwrap_or_else(|e| panic!("{path}: {e}"))
    }

    fn cert(name: &str) -> CertificateRecord {
        parse_certificate(&testdata(name)).unwrap()
    }

    #[test]
    fn rsa_certificate_fields() {
        let c = cert("dsc_rsa.pem");
        assert_eq!(c.key_kind(), PublicKeyKind::Rsa);
        assert_eq!(c.public_key.bits(), 2048);
        assert_eq!(c.public_key.curve_or_exponent(), CurveOrExponent::Exponent(65537));
        assert_eq!(c.issuer, "CSCA Utopia RSA");
        assert_eq!(
            c.signature_algorithm,
            Some(SignatureAlgorithm::new(SignatureScheme::Rsa, HashAlgorithm::Sha256))
        );
        assert_eq!(c.signature.len(), 256);
    }

    #[test]
    fn pss_parameters_extracted() {
        let c = cert("dsc_rsapss.pem");
        match c.public_key {
            PublicKeyParams::Rsa { pss: Some(p), .. } => {
                assert_eq!(p.hash, HashAlgorithm::Sha256);
                assert_eq!(p.salt_length, 32);
            }
            other => panic!("expected PSS parameters, got {other:?}"),
        }
        assert_eq!(c.subject, "DSC Utopia RSA-PSS");
    }

    #[test]
    fn ec_certificate_fields() {
        let c = cert("dsc_ec.pem");
        assert_eq!(c.public_key.curve_or_exponent(), CurveOrExponent::Curve(EcCurve::P256));
        assert_eq!(c.public_key_bytes.len(), 65);
        assert!(c.public_key.ec_coordinates().is_some());
        assert_eq!(
            c.signature_algorithm,
            Some(SignatureAlgorithm::new(SignatureScheme::Ecdsa, HashAlgorithm::Sha384))
        );
        assert_eq!(cert("csca_ec.pem").public_key.bits(), 384);
    }

    #[test]
    fn der_and_pem_agree() {
        let pem = testdata("csca_rsa.pem");
        let (_, block) = parse_x509_pem(&pem).unwrap();
        let from_der = parse_certificate(&block.contents).unwrap();
        assert_eq!(from_der, parse_certificate(&pem).unwrap());
        assert_eq!(from_der.fingerprint, sha256(&block.contents));
    }

    #[test]
    fn secp256k1_is_unsupported() {
        let err = parse_certificate(&testdata("unsupported_secp256k1.pem")).unwrap_err();
        assert!(matches!(err, CertificateError::UnsupportedKeyType(ref m) if m.contains("1.3.132.0.10")));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_certificate(b"not a certificate"),
            Err(CertificateError::MalformedEncoding(_))
        ));
        assert!(matches!(
            parse_certificate(b"-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n"),
            Err(CertificateError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn issuer_chain_verifies() {
        let alg = verify_issued_by(&cert("dsc_rsa.pem"), &cert("csca_rsa.pem")).unwrap();
        assert_eq!(alg.to_string(), "rsa_sha256");

        let alg = verify_issued_by(&cert("dsc_rsapss.pem"), &cert("csca_rsa.pem")).unwrap();
        assert_eq!(alg.to_string(), "rsapss_sha256");

        let alg = verify_issued_by(&cert("dsc_ec.pem"), &cert("csca_ec.pem")).unwrap();
        assert_eq!(alg.to_string(), "ecdsa_sha384");
    }

    #[test]
    fn wrong_issuer_never_matches() {
        let err = verify_issued_by(&cert("dsc_rsa.pem"), &cert("uidai_test.pem")).unwrap_err();
        assert_eq!(err, CertificateError::NoMatchingAlgorithm);
        let err = verify_issued_by(&cert("dsc_ec.pem"), &cert("csca_rsa.pem")).unwrap_err();
        assert_eq!(err, CertificateError::NoMatchingAlgorithm);
    }

    #[test]
    fn brute_force_strips_tag_and_still_finds_pss() {
        let mut dsc = cert("dsc_rsapss.pem");
        dsc.signature_algorithm = None;
        let alg = verify_issued_by(&dsc, &cert("csca_rsa.pem")).unwrap();
        assert_eq!(alg.scheme, SignatureScheme::RsaPss);
    }

    #[test]
    fn candidate_order() {
        let names: Vec<String> = candidates(&cert("csca_rsa.pem"))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            names,
            [
                "rsa_sha256",
                "rsapss_sha256",
                "rsa_sha1",
                "rsa_sha384",
                "rsa_sha512",
                "rsapss_sha384",
                "rsapss_sha512"
            ]
        );
        let ec: Vec<String> = candidates(&cert("csca_ec.pem"))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ec, ["ecdsa_sha384", "ecdsa_sha256"]);
    }
}
