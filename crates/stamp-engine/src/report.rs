//! # Reports
//!
//! [`DocumentReport`] is the machine-readable result for one document;
//! [`BatchReport`] aggregates a run. Both serialize with stable field
//! order, and every list inside them is already deterministically ordered
//! by the stage that produced it.

use serde::Serialize;

use stamp_core::text_digest;
use stamp_policy::{ClassificationResult, Cycle, FixProposal, ProposalSummary, Status};
use stamp_schema::Cdo;

use crate::error::EngineError;
use crate::remediation::RemediationSummary;

/// Where a document ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    /// Passed; nothing to do.
    Clean,
    /// Repairable, and the repair was written.
    Repaired,
    /// Has fatal findings.
    Rejected,
    /// Repairable, but not written (fixing not requested, not approved, or
    /// nothing could be changed automatically).
    Pending,
}

/// Result for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub file: String,
    pub status: Status,
    pub exit_code: u8,
    pub terminal_state: TerminalState,
    #[serde(flatten)]
    pub findings: ClassificationResult,
    /// Sorted diagnostics.
    pub diagnostics: Vec<Cdo>,
    pub proposals: Vec<FixProposal>,
    pub proposal_summary: ProposalSummary,
    /// Ids of proposals applied in the written repair.
    pub applied_proposals: Vec<String>,
    /// Normalizer corrections in the written repair.
    pub corrections_applied: Vec<String>,
    /// Declared dependencies, as written in the metadata.
    pub dependencies: Vec<String>,
    /// SHA-256 of the loaded text.
    pub original_hash: String,
    /// SHA-256 of the written text.
    pub rewritten_hash: Option<String>,
    pub written_to: Option<String>,
}

/// SHA-256 hex of document text.
pub fn content_hash(text: &str) -> String {
    text_digest(text).to_hex()
}

/// Result for a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub status: Status,
    pub exit_code: u8,
    /// Identifier of the governing schema.
    pub schema: String,
    pub documents: Vec<DocumentReport>,
    /// Every dependency cycle found, in detection order.
    pub cycles: Vec<Cycle>,
    /// What is left for a person to decide, one entry per document.
    pub remediation: Vec<RemediationSummary>,
}

impl BatchReport {
    /// Aggregate per-document reports. The batch status is the most severe
    /// document status; an empty batch passes.
    pub fn new(schema: impl Into<String>, documents: Vec<DocumentReport>, cycles: Vec<Cycle>) -> Self {
        let schema = schema.into();
        let status = documents
            .iter()
            .map(|d| d.status)
            .max()
            .unwrap_or(Status::Pass);
        let remediation = documents
            .iter()
            .map(|d| RemediationSummary::for_document(d, &schema))
            .collect();
        Self {
            status,
            exit_code: status.exit_code(),
            schema,
            documents,
            cycles,
            remediation,
        }
    }

    /// Number of documents with `status`.
    pub fn count(&self, status: Status) -> usize {
        self.documents.iter().filter(|d| d.status == status).count()
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
