//! # docproof-cli — Operator Command-Line Interface
//!
//! Thin clap front end over the pipeline crates.
//!
//! ## Subcommands
//!
//! - `mrz` — parse and validate a scan, print per-field results
//! - `cert` — certificate metadata, algorithm detection against an issuer
//! - `estimate` — proving time estimate for an algorithm and operation
//! - `hash` — content hash, commitment and nullifier for a scan
//! - `prove` — run the proving state machine against a protocol snapshot
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers; handlers return a
//!   JSON report and a [`Verdict`], `main` prints and exits.
//! - Logs go to stderr so stdout stays machine readable.
//! - Exit codes: 0 success, 1 the input failed a check, 2 anything else.

pub mod cert;
pub mod check;
pub mod estimate;
pub mod hash;
pub mod prove;
pub mod scan;

use std::process::ExitCode;

/// Whether the command's subject passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_bool(ok: bool) -> Self {
        if ok {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Pass => ExitCode::SUCCESS,
            Self::Fail => ExitCode::from(1),
        }
    }
}

/// A handler's result: the JSON printed to stdout and the verdict.
#[derive(Debug)]
pub struct Report {
    pub body: serde_json::Value,
    pub verdict: Verdict,
}

impl Report {
    pub fn pass(body: serde_json::Value) -> Self {
        Self {
            body,
            verdict: Verdict::Pass,
        }
    }

    pub fn new(body: serde_json::Value, ok: bool) -> Self {
        Self {
            body,
            verdict: Verdict::from_bool(ok),
        }
    }
}
