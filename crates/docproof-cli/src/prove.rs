//! # Prove Subcommand
//!
//! Runs one proving session end to end: protocol state from a snapshot
//! file, the relay from configuration, the user secret from the command
//! line. Ctrl-C cancels the session; without `--yes` the proof is only
//! accepted after the operator presses Enter.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use docproof_circuits::{Operation, SelfAppConfig};
use docproof_relay::WsConnector;
use docproof_state::{
    MemorySecretStore, PipelineConfig, ProtocolSnapshot, ProvingMachine, ProvingSession,
    ProvingState, ProvingTimeEstimate, RunOutcome, StaticProtocolState,
};
use serde_json::json;

use crate::cert::load_certificate;
use crate::hash::parse_secret;
use crate::scan::{CategoryArg, ScanArgs, ScanFormat};
use crate::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OperationArg {
    Register,
    Dsc,
    Disclose,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Register => Self::Register,
            OperationArg::Dsc => Self::Dsc,
            OperationArg::Disclose => Self::Disclose,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProveArgs {
    #[arg(long, value_enum, default_value = "register")]
    pub operation: OperationArg,

    /// Document scan; required for register and disclose.
    #[arg(long)]
    pub scan: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    pub format: ScanFormat,

    #[arg(long, value_enum, default_value_t)]
    pub category: CategoryArg,

    /// Protocol snapshot JSON: trees per category and registered nullifiers.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// User secret as hex; required for register and disclose.
    #[arg(long)]
    pub secret: Option<String>,

    /// Document signer certificate. For `dsc`, the certificate being proven.
    #[arg(long)]
    pub dsc: Option<PathBuf>,

    /// Issuing CSCA certificate, for `dsc`.
    #[arg(long)]
    pub csca: Option<PathBuf>,

    /// Disclosure request JSON, for `disclose`.
    #[arg(long)]
    pub app: Option<PathBuf>,

    /// YAML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Accept the proof without asking.
    #[arg(long)]
    pub yes: bool,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

/// Assemble the session from the command line.
pub fn build_session(args: &ProveArgs) -> anyhow::Result<ProvingSession> {
    let mut session = ProvingSession::new(args.operation.into());
    if let Some(scan) = &args.scan {
        let scan = ScanArgs {
            scan: scan.clone(),
            format: args.format,
            category: args.category,
            strict: false,
        };
        session = session.with_document(scan.load()?);
    }
    if let Some(path) = &args.dsc {
        session = session.with_certificate(load_certificate(path)?);
    }
    if let Some(path) = &args.csca {
        session = session.with_issuer(load_certificate(path)?);
    }
    if let Some(path) = &args.app {
        session = session.with_app(read_json::<SelfAppConfig>(path)?);
    }
    Ok(session)
}

pub fn run(args: &ProveArgs) -> anyhow::Result<Report> {
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if args.yes {
        config.auto_confirm = true;
    }
    config
        .tee_public_key_bytes()
        .context("a TEE public key is required to prove")?;

    let snapshot: ProtocolSnapshot = read_json(&args.snapshot)?;
    let protocol = StaticProtocolState::from_snapshot(&snapshot)?;
    let secrets = match &args.secret {
        Some(hex) => MemorySecretStore::new(parse_secret(hex)?),
        None => MemorySecretStore::empty(),
    };
    let mut session = build_session(args)?;
    let connector = WsConnector::new(config.connect_timeout());
    let machine = ProvingMachine::new(secrets, protocol, connector, config);

    let estimate = ProvingTimeEstimate::for_family(session.algorithm_family(), session.operation);
    tracing::info!(session = %session.id, operation = %session.operation, %estimate, "proving");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;
    let outcome = runtime.block_on(async {
        let cancel = machine.cancel_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
        if !machine.config().auto_confirm {
            let confirm = machine.confirm_handle();
            tokio::task::spawn_blocking(move || {
                eprintln!("press Enter to accept the proof once it arrives");
                let mut line = String::new();
                // A retried proof asks again.
                while matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
                    confirm.confirm();
                    line.clear();
                }
            });
        }
        machine.run(&mut session).await
    });
    // The stdin reader may still be blocked.
    runtime.shutdown_background();
    let outcome = outcome?;

    let completed = outcome == RunOutcome::Finished(ProvingState::Completed);
    let body = json!({
        "outcome": match outcome {
            RunOutcome::Finished(state) => state.as_str(),
            RunOutcome::Cancelled(_) => "cancelled",
        },
        "estimate": estimate.to_string(),
        "session": session.report(),
        "proof": session.proof,
    });
    Ok(Report::new(body, completed))
}
