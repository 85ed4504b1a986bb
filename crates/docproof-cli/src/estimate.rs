//! # Estimate Subcommand

use clap::Args;
use docproof_state::proving_time_estimate;
use serde_json::json;

use crate::Report;

#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Signature algorithm, e.g. `rsa`, `rsapss_sha256`, `ecdsa`.
    #[arg(long)]
    pub algorithm: String,

    /// Curve name, curve bit size or RSA exponent.
    #[arg(long, default_value = "65537")]
    pub curve: String,

    /// `register`, `dsc` or `disclose`.
    #[arg(long, default_value = "register")]
    pub operation: String,
}

pub fn run(args: &EstimateArgs) -> Report {
    Report::pass(json!({
        "algorithm": args.algorithm,
        "curve_or_exponent": args.curve,
        "operation": args.operation,
        "estimate": proving_time_estimate(&args.algorithm, &args.curve, &args.operation),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_table_value() {
        let report = run(&EstimateArgs {
            algorithm: "ecdsa".into(),
            curve: "secp384r1".into(),
            operation: "register".into(),
        });
        assert_eq!(report.body["estimate"], "90 SECONDS");
    }
}
