//! # Mrz Subcommand
//!
//! Parse a scan, re-run every check and report per-field results. The
//! holder's name and document number are only printed with `--show-identity`.

use clap::Args;
use docproof_document::{infer_document_category, validate};
use serde_json::json;

use crate::scan::ScanArgs;
use crate::Report;

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Include the MRZ-derived identity fields in the output.
    #[arg(long)]
    pub show_identity: bool,
}

pub fn run(args: &CheckArgs) -> anyhow::Result<Report> {
    let record = args.scan.load()?;
    let result = validate(&record);
    let inferred = infer_document_category(&record).category();

    let mut body = json!({
        "category": record.category,
        "inferred_category": inferred,
        "signature_algorithm": record.signature_algorithm.map(|a| a.to_string()),
        "curve_or_exponent": record.curve_or_exponent.map(|c| c.to_string()),
        "content_hash": record.content_hash.to_hex(),
        "validation": result,
    });
    if args.show_identity {
        body["identity"] = serde_json::to_value(&record.identity)?;
    }
    Ok(Report::new(body, result.overall && inferred.is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{CategoryArg, ScanFormat};
    use crate::Verdict;
    use std::path::PathBuf;

    fn scan(name: &str) -> ScanArgs {
        ScanArgs {
            scan: PathBuf::from(format!("{}/../../testdata/{name}", env!("CARGO_MANIFEST_DIR"))),
            format: ScanFormat::Auto,
            category: CategoryArg::Auto,
            strict: false,
        }
    }

    #[test]
    fn valid_passport_passes() {
        let report = run(&CheckArgs {
            scan: scan("passport_rsa.json"),
            show_identity: false,
        })
        .unwrap();
        assert_eq!(report.verdict, Verdict::Pass);
        assert_eq!(report.body["category"], "passport");
        assert_eq!(report.body["validation"]["overall"], true);
        assert_eq!(report.body["signature_algorithm"], "rsa_sha256");
        assert!(report.body.get("identity").is_none());
    }

    #[test]
    fn identity_is_opt_in() {
        let report = run(&CheckArgs {
            scan: scan("passport_rsa.json"),
            show_identity: true,
        })
        .unwrap();
        assert!(report.body["identity"]["surname"].is_string());
    }
}
