//! # Cert Subcommand
//!
//! Print certificate metadata. With `--issuer`, brute-force the algorithm
//! the issuer signed it with and estimate the DSC proof.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use docproof_circuits::Operation;
use docproof_core::CertificateRecord;
use docproof_document::{parse_certificate, verify_issued_by};
use docproof_state::{AlgorithmFamily, ProvingTimeEstimate};
use serde_json::json;

use crate::Report;

#[derive(Args, Debug)]
pub struct CertArgs {
    /// PEM or DER certificate.
    pub cert: PathBuf,

    /// Certificate of the expected issuer.
    #[arg(long)]
    pub issuer: Option<PathBuf>,
}

pub fn load_certificate(path: &Path) -> anyhow::Result<CertificateRecord> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_certificate(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn describe(cert: &CertificateRecord) -> serde_json::Value {
    json!({
        "subject": cert.subject,
        "issuer": cert.issuer,
        "key_kind": cert.key_kind(),
        "key_bits": cert.public_key.bits(),
        "curve_or_exponent": cert.public_key.curve_or_exponent().to_string(),
        "signature_algorithm": cert.signature_algorithm.map(|a| a.to_string()),
        "fingerprint": hex::encode(cert.fingerprint),
    })
}

pub fn run(args: &CertArgs) -> anyhow::Result<Report> {
    let cert = load_certificate(&args.cert)?;
    let mut body = describe(&cert);

    let Some(issuer_path) = &args.issuer else {
        return Ok(Report::pass(body));
    };
    let issuer = load_certificate(issuer_path)?;
    let verified = match verify_issued_by(&cert, &issuer) {
        Ok(algorithm) => {
            let family = AlgorithmFamily::from_parts(
                Some(algorithm),
                Some(issuer.public_key.curve_or_exponent()),
            );
            body["issued_by"] = json!({
                "subject": issuer.subject,
                "algorithm": algorithm.to_string(),
                "dsc_estimate": ProvingTimeEstimate::for_family(family, Operation::Dsc).to_string(),
            });
            true
        }
        Err(e) => {
            tracing::warn!(issuer = %issuer.subject, error = %e, "issuer check failed");
            body["issued_by"] = json!({ "subject": issuer.subject, "error": e.to_string() });
            false
        }
    };
    Ok(Report::new(body, verified))
}
