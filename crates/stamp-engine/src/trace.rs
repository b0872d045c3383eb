//! # Execution Trace
//!
//! A small audit record of one CLI invocation: what ran, against which
//! schema, when, with what exit code, and a pass/diagnostic-count line per
//! artifact. Written as indented JSON when `--trace` is given.

use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use stamp_core::Timestamp;
use stamp_policy::Status;

use crate::error::EngineError;
use crate::report::BatchReport;

pub const TOOL_NAME: &str = "stamp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactTrace {
    pub artifact: String,
    pub passed: bool,
    pub diagnostic_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionTrace {
    pub run_id: Uuid,
    pub tool: String,
    pub tool_version: String,
    pub command: String,
    pub schema: String,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub exit_code: u8,
    pub artifacts: Vec<ArtifactTrace>,
}

impl ExecutionTrace {
    /// Record a finished batch under a fresh run id.
    pub fn record(
        command: &str,
        tool_version: &str,
        started_at: Timestamp,
        finished_at: Timestamp,
        report: &BatchReport,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            tool: TOOL_NAME.to_string(),
            tool_version: tool_version.to_string(),
            command: command.to_string(),
            schema: report.schema.clone(),
            started_at,
            finished_at,
            exit_code: report.exit_code,
            artifacts: report
                .documents
                .iter()
                .map(|d| ArtifactTrace {
                    artifact: d.file.clone(),
                    passed: d.status == Status::Pass,
                    diagnostic_count: d.diagnostics.len(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), EngineError> {
        std::fs::write(path, self.to_json()?).map_err(|e| EngineError::io(path, e))?;
        tracing::info!(path = %path.display(), run_id = %self.run_id, "wrote execution trace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_of_empty_batch() {
        let t0 = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let t1 = Timestamp::parse("2026-01-01T00:00:05Z").unwrap();
        let report = BatchReport::new("ari-metadata", Vec::new(), Vec::new());
        let trace = ExecutionTrace::record("check", "0.1.0", t0, t1, &report);
        assert_eq!(trace.exit_code, 0);
        assert!(trace.artifacts.is_empty());
        assert_eq!(trace.run_id.get_version_num(), 4);

        let json: serde_json::Value = serde_json::from_str(&trace.to_json().unwrap()).unwrap();
        assert_eq!(json["tool"], "stamp");
        assert_eq!(json["schema"], "ari-metadata");
        assert_eq!(json["started_at"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn distinct_run_ids() {
        let t = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let report = BatchReport::new("s", Vec::new(), Vec::new());
        let a = ExecutionTrace::record("check", "0.1.0", t, t, &report);
        let b = ExecutionTrace::record("check", "0.1.0", t, t, &report);
        assert_ne!(a.run_id, b.run_id);
    }
}
