//! # Check Subcommand
//!
//! Validate and classify documents. Never writes to them.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use stamp_engine::RunOptions;

use crate::{conclude, render_findings, render_remediation, GlobalOptions, Session};

/// Arguments for `stamp check`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CheckArgs {
    /// Files or directories to check.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Execute `stamp check`.
///
/// Returns the batch exit code: 0 pass, 1 repairable, 2 fail.
pub fn run_check(args: &CheckArgs, global: &GlobalOptions) -> Result<u8> {
    let session = Session::open(global, &args.paths)?;
    let report = session
        .orchestrator
        .run(&session.documents, &RunOptions::default());

    if global.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", render_findings(&report));
        print!("{}", render_remediation(&report));
    }

    conclude(&report, "check", global, session.started_at)
}
