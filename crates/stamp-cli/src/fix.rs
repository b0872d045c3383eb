//! # Fix Subcommand
//!
//! Plan repairs for documents whose findings are all repairable, and write
//! them only when approved.
//!
//! Without flags nothing is written: every repair is planned and reported
//! as pending. `--approve` writes mechanical proposals (pruning disallowed
//! keys) and normalization. `--include-inferred` additionally applies
//! inferred proposals and requires `--approve`. Documents with fatal
//! findings are reported and left alone.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use stamp_engine::{ApprovalPolicy, BatchReport, RunOptions, TerminalState};

use crate::{conclude, render_findings, render_remediation, GlobalOptions, Session};

/// Arguments for `stamp fix`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct FixArgs {
    /// Files or directories to repair.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Approve writing repaired documents. Without it nothing is written.
    #[arg(long)]
    pub approve: bool,

    /// Also apply inferred proposals (e.g. enum case corrections).
    #[arg(long, requires = "approve")]
    pub include_inferred: bool,

    /// Write repaired documents here instead of in place.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl FixArgs {
    /// The approval policy these flags select.
    pub fn approval(&self) -> ApprovalPolicy {
        match (self.approve, self.include_inferred) {
            (false, _) => ApprovalPolicy::dry_run(),
            (true, false) => ApprovalPolicy::mechanical(),
            (true, true) => ApprovalPolicy::all(),
        }
    }
}

/// Execute `stamp fix`.
pub fn run_fix(args: &FixArgs, global: &GlobalOptions) -> Result<u8> {
    let session = Session::open(global, &args.paths)?;
    let options = RunOptions {
        repair: true,
        output_dir: args.output_dir.clone(),
    };
    let report = session
        .orchestrator
        .with_approver(args.approval())
        .run(&session.documents, &options);

    if global.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", render_findings(&report));
        print!("{}", render_remediation(&report));
        print!("{}", render_repairs(&report));
    }

    conclude(&report, "fix", global, session.started_at)
}

/// What was written, and what was left pending.
pub fn render_repairs(report: &BatchReport) -> String {
    let mut out = String::new();
    for doc in &report.documents {
        match doc.terminal_state {
            TerminalState::Repaired => {
                let target = doc.written_to.as_deref().unwrap_or(&doc.file);
                let _ = writeln!(out, "wrote: {target}");
                for c in &doc.corrections_applied {
                    let _ = writeln!(out, "  - {c}");
                }
                if !doc.applied_proposals.is_empty() {
                    let _ = writeln!(out, "  - applied {} proposal(s)", doc.applied_proposals.len());
                }
            }
            TerminalState::Pending => {
                let _ = writeln!(out, "pending: {} (not written)", doc.file);
            }
            TerminalState::Clean | TerminalState::Rejected => {}
        }
    }
    out
}
