//! # Propose Subcommand
//!
//! Show the fix proposals Stamp would consider for each document, with
//! their classification and whether they need approval. Never writes.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use stamp_engine::{BatchReport, RunOptions};
use stamp_policy::{FixProposal, ProposalSummary};

use crate::{conclude, GlobalOptions, Session};

/// Arguments for `stamp propose`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ProposeArgs {
    /// Files or directories to inspect.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DocumentProposals<'a> {
    file: &'a str,
    proposals: &'a [FixProposal],
    summary: &'a ProposalSummary,
}

/// Execute `stamp propose`.
pub fn run_propose(args: &ProposeArgs, global: &GlobalOptions) -> Result<u8> {
    let session = Session::open(global, &args.paths)?;
    let report = session
        .orchestrator
        .run(&session.documents, &RunOptions::default());

    if global.json {
        let listing: Vec<DocumentProposals<'_>> = report
            .documents
            .iter()
            .map(|d| DocumentProposals {
                file: &d.file,
                proposals: &d.proposals,
                summary: &d.proposal_summary,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print!("{}", render_proposals(&report));
    }

    conclude(&report, "propose", global, session.started_at)
}

/// Human-readable proposal listing.
pub fn render_proposals(report: &BatchReport) -> String {
    let mut out = String::new();
    for doc in &report.documents {
        let s = &doc.proposal_summary;
        let _ = writeln!(
            out,
            "{}: {} proposal(s) ({} mechanical, {} inferred, {} prohibited)",
            doc.file, s.total_proposals, s.mechanical, s.inferred, s.prohibited
        );
        for p in &doc.proposals {
            let gate = if p.prohibited {
                "never applied"
            } else if p.requires_approval {
                "needs approval"
            } else {
                "automatic"
            };
            let target = if p.target.instance_path.is_empty() {
                "(root)"
            } else {
                p.target.instance_path.as_str()
            };
            let _ = writeln!(
                out,
                "  {} {} {} [{gate}]: {}",
                p.action.as_str(),
                target,
                &p.id[..12.min(p.id.len())],
                p.notes
            );
        }
    }
    out
}
