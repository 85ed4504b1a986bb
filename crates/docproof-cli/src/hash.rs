//! # Hash Subcommand
//!
//! Content hash, commitment and nullifier of a scan under a user secret.

use clap::Args;
use docproof_crypto::{generate_commitment, generate_nullifier, UserSecret};
use serde_json::json;

use crate::scan::ScanArgs;
use crate::Report;

#[derive(Args, Debug)]
pub struct HashArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// User secret as hex.
    #[arg(long)]
    pub secret: String,
}

pub fn parse_secret(hex_secret: &str) -> anyhow::Result<UserSecret> {
    let bytes = hex::decode(hex_secret.trim().trim_start_matches("0x"))
        .map_err(|e| anyhow::anyhow!("secret is not valid hex: {e}"))?;
    anyhow::ensure!(!bytes.is_empty(), "secret is empty");
    Ok(UserSecret::new(bytes))
}

pub fn run(args: &HashArgs) -> anyhow::Result<Report> {
    let record = args.scan.load()?;
    let secret = parse_secret(&args.secret)?;
    let attestation_id = record.category.attestation_id();
    let commitment = generate_commitment(&secret, &record, attestation_id)?;
    let nullifier = generate_nullifier(&secret, &record)?;
    Ok(Report::pass(json!({
        "category": record.category,
        "attestation_id": attestation_id.0,
        "content_hash": record.content_hash.to_hex(),
        "commitment": commitment,
        "nullifier": nullifier,
    })))
}
