//! # docproof CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::process::ExitCode;

use clap::Parser;
use docproof_cli::{cert, check, estimate, hash, prove, Report};
use tracing_subscriber::EnvFilter;

/// docproof: identity documents to zero-knowledge proofs.
///
/// Checks scans and certificates, estimates proving times and runs proving
/// sessions against a TEE relay.
#[derive(Parser, Debug)]
#[command(name = "docproof", version, about)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Parse and validate a document scan.
    Mrz(check::CheckArgs),
    /// Inspect a certificate and optionally check its issuer.
    Cert(cert::CertArgs),
    /// Proving time estimate for an algorithm.
    Estimate(estimate::EstimateArgs),
    /// Content hash, commitment and nullifier of a scan.
    Hash(hash::HashArgs),
    /// Run a proving session.
    Prove(prove::ProveArgs),
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn dispatch(command: &Commands) -> anyhow::Result<Report> {
    match command {
        Commands::Mrz(args) => check::run(args),
        Commands::Cert(args) => cert::run(args),
        Commands::Estimate(args) => Ok(estimate::run(args)),
        Commands::Hash(args) => hash::run(args),
        Commands::Prove(args) => prove::run(args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let report = match dispatch(&cli.command) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };
    match serde_json::to_string_pretty(&report.body) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    }
    report.verdict.exit_code()
}
