//! # Collaborator Seams
//!
//! The orchestrator touches the outside world only through these traits.
//! Filesystem implementations live in [`crate::fs`] and [`crate::extract`];
//! tests substitute in-memory ones.
//!
//! Validation goes through [`ValidationEngine`], re-exported from
//! `stamp-schema`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use stamp_policy::{FixProposal, MetadataState};

use crate::error::EngineError;

pub use stamp_schema::ValidationEngine;

/// Raw document text, or the reasons it could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedDocument {
    /// Content with newlines normalized to `\n`. Empty when `errors` is not.
    pub text: String,
    pub errors: Vec<String>,
}

impl LoadedDocument {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            errors: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            errors: vec![error.into()],
        }
    }
}

/// Reads documents.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> LoadedDocument;
}

/// How the metadata block was delimited in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStyle {
    /// `---` fenced YAML at the top of the file.
    Frontmatter,
    /// A leading `<!-- ... -->` comment.
    HtmlComment,
    /// No block was found.
    Absent,
}

/// A document split into metadata and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub metadata: MetadataState,
    /// Everything after the metadata block.
    pub body: String,
    pub style: BlockStyle,
}

/// Splits documents into metadata and body, and reassembles them.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path, text: &str) -> Extraction;

    /// Reassemble a document in `style`. [`BlockStyle::Absent`] renders as
    /// frontmatter.
    fn render(&self, metadata: &Mapping, body: &str, style: BlockStyle) -> Result<String, EngineError>;
}

/// Persists rewritten documents.
pub trait DocumentWriter: Send + Sync {
    /// Write `content` for the document at `path`, into `output_dir` when
    /// given, in place otherwise. Returns the path written.
    fn write(&self, path: &Path, content: &str, output_dir: Option<&Path>) -> Result<PathBuf, EngineError>;
}

/// Everything a repair would do to one document, shown to the [`Approver`]
/// before anything is written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairPlan {
    /// Proposal ids that were applied to the metadata.
    pub applied_proposals: Vec<String>,
    /// Proposal ids left unapplied, with the reason.
    pub skipped_proposals: Vec<(String, String)>,
    /// Normalizer corrections, in order.
    pub corrections: Vec<String>,
    /// The full rewritten document.
    pub rewritten: String,
}

/// Gatekeeper for changes.
pub trait Approver: Send + Sync {
    /// Whether a proposal that requires approval may be applied.
    fn approve_proposal(&self, _path: &Path, _proposal: &FixProposal) -> bool {
        false
    }

    /// Whether the plan may be written.
    fn approve(&self, path: &Path, plan: &RepairPlan) -> bool;
}

/// Non-interactive approval settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApprovalPolicy {
    /// Allow writing repaired documents.
    pub write: bool,
    /// Allow inferred proposals (e.g. enum case corrections).
    pub inferred: bool,
}

impl ApprovalPolicy {
    /// Approve nothing; repairs are planned but never written.
    pub fn dry_run() -> Self {
        Self::default()
    }

    /// Write mechanical repairs and normalization only.
    pub fn mechanical() -> Self {
        Self {
            write: true,
            inferred: false,
        }
    }

    /// Write, including inferred proposals.
    pub fn all() -> Self {
        Self {
            write: true,
            inferred: true,
        }
    }
}

impl Approver for ApprovalPolicy {
    fn approve_proposal(&self, _path: &Path, proposal: &FixProposal) -> bool {
        self.inferred && !proposal.prohibited
    }

    fn approve(&self, _path: &Path, _plan: &RepairPlan) -> bool {
        self.write
    }
}
