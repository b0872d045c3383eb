//! # stamp-cli — Command-Line Interface for Stamp
//!
//! ```bash
//! stamp check docs/
//! stamp propose docs/spec.md --json
//! stamp fix docs/
//! stamp fix docs/ --approve --output-dir fixed/
//! stamp --trace trace.json fix docs/ --approve --include-inferred
//! ```
//!
//! ## Subcommands
//!
//! - `stamp check`: validate and classify; never writes.
//! - `stamp propose`: list fix proposals per document; never writes.
//! - `stamp fix`: plan mechanical repairs and normalization for
//!   repairable documents; writes only with `--approve` (inferred
//!   proposals need `--include-inferred` as well).
//!
//! ## Exit Codes
//!
//! `0` every document passes, `1` at least one is repairable and none
//! fatal, `2` any fatal finding or an operational error.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; every decision is made in the library
//!   crates.
//! - Operational errors are `anyhow` with context and map to exit code 2.

pub mod check;
pub mod fix;
pub mod propose;

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stamp_core::{Clock, SystemClock, Timestamp};
use stamp_engine::{discover, BatchReport, ExecutionTrace, Orchestrator};
use stamp_policy::PolicyConfig;
use stamp_schema::{resolve_schema, SchemaSource};

/// Schema used when `--schema` is not given.
pub const DEFAULT_SCHEMA: &str = "schemas/ari-metadata.schema.json";

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GlobalOptions {
    /// JSON Schema governing document metadata.
    #[arg(long, global = true, default_value = DEFAULT_SCHEMA)]
    pub schema: String,

    /// Policy configuration file (YAML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Write an execution trace to this file.
    #[arg(long, global = true, value_name = "FILE")]
    pub trace: Option<PathBuf>,
}

/// Everything a subcommand needs to run a batch.
#[derive(Debug)]
pub struct Session {
    pub orchestrator: Orchestrator,
    pub documents: Vec<PathBuf>,
    pub started_at: Timestamp,
}

impl Session {
    /// Load policy and schema, check the schema compiles, and discover
    /// documents under `paths`.
    pub fn open(global: &GlobalOptions, paths: &[PathBuf]) -> Result<Self> {
        let started_at = SystemClock.now();

        let config = match &global.config {
            Some(path) => PolicyConfig::load(path)
                .with_context(|| format!("failed to load policy config {}", path.display()))?,
            None => PolicyConfig::default(),
        };

        let schema = resolve_schema(SchemaSource::from_arg(&global.schema))
            .with_context(|| format!("failed to resolve schema {}", global.schema))?;
        tracing::info!(schema = %schema.identifier, origin = schema.origin.as_str(), "resolved schema");

        let documents = discover(paths, &config).context("failed to discover documents")?;
        tracing::info!(documents = documents.len(), "discovered documents");

        let orchestrator = Orchestrator::new(schema, config);
        orchestrator
            .preflight()
            .context("schema could not be compiled")?;

        Ok(Self {
            orchestrator,
            documents,
            started_at,
        })
    }
}

/// Write the trace if requested and return the batch exit code.
pub fn conclude(
    report: &BatchReport,
    command: &str,
    global: &GlobalOptions,
    started_at: Timestamp,
) -> Result<u8> {
    if let Some(path) = &global.trace {
        let trace = ExecutionTrace::record(
            command,
            env!("CARGO_PKG_VERSION"),
            started_at,
            SystemClock.now(),
            report,
        );
        trace
            .write_json(path)
            .with_context(|| format!("failed to write trace {}", path.display()))?;
    }
    Ok(report.exit_code)
}

/// One line per finding, indented under a status line per document.
pub fn render_findings(report: &BatchReport) -> String {
    let mut out = String::new();
    for doc in &report.documents {
        let _ = writeln!(out, "{:<10} {}", doc.status.as_str().to_uppercase(), doc.file);
        for f in &doc.findings.fatal_errors {
            let _ = writeln!(out, "  [fatal] {}", f.message);
        }
        for f in &doc.findings.repairable_errors {
            let _ = writeln!(out, "  [repairable] {}", f.message);
        }
        for f in &doc.findings.warnings {
            let _ = writeln!(out, "  [warning] {}", f.message);
        }
    }
    let _ = writeln!(
        out,
        "\n{} document(s): {} pass, {} repairable, {} fail",
        report.documents.len(),
        report.count(stamp_policy::Status::Pass),
        report.count(stamp_policy::Status::Repairable),
        report.count(stamp_policy::Status::Fail),
    );
    out
}

/// Remaining human decisions, per document that has any.
pub fn render_remediation(report: &BatchReport) -> String {
    let mut out = String::new();
    for summary in &report.remediation {
        let action = &summary.human_action_required;
        if action.item_count == 0 {
            continue;
        }
        let blocking = if action.blocking { " (blocking)" } else { "" };
        let _ = writeln!(out, "action required: {}{blocking}", summary.artifact);
        for item in &action.items {
            let _ = writeln!(
                out,
                "  - {} [{}] {}",
                item.field,
                item.action_type.as_str(),
                item.reason
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn global(schema: &Path) -> GlobalOptions {
        GlobalOptions {
            schema: schema.display().to_string(),
            config: None,
            json: false,
            trace: None,
        }
    }

    fn schema_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas/ari-metadata.schema.json")
    }

    #[test]
    fn open_rejects_remote_schema() {
        let mut g = global(&schema_path());
        g.schema = "https://example.com/schema.json".to_string();
        let dir = tempfile::tempdir().unwrap();
        let err = Session::open(&g, &[dir.path().to_path_buf()]).unwrap_err();
        assert!(format!("{err:#}").contains("remote schema sources are not supported"));
    }

    #[test]
    fn open_rejects_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("stamp.yaml");
        std::fs::write(&config, "bogus_field: true\n").unwrap();
        let mut g = global(&schema_path());
        g.config = Some(config);
        let err = Session::open(&g, &[dir.path().to_path_buf()]).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load policy config"));
    }

    #[test]
    fn open_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = Session::open(&global(&schema_path()), &[dir.path().join("nope")]).unwrap_err();
        assert!(format!("{err:#}").contains("path does not exist"));
    }

    #[test]
    fn open_discovers_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# a\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        let session = Session::open(&global(&schema_path()), &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(session.documents, vec![dir.path().join("a.md")]);
    }
}
