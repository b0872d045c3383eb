//! # stamp-engine — Batch Orchestration for Stamp
//!
//! Drives a set of Markdown documents through the governance pipeline:
//!
//! 1. [`fs::discover`] expands roots into a sorted list of governed files.
//! 2. The [`Orchestrator`] loads, extracts, validates and classifies each
//!    document, then checks the batch's dependency graph for cycles.
//! 3. When repair is requested, repairable documents get proposals applied,
//!    are normalized and rendered, and are written only with approval.
//! 4. The result is a [`BatchReport`], from which a per-document
//!    [`RemediationSummary`] and an [`ExecutionTrace`] can be derived.
//!
//! All I/O goes through the traits in [`collaborators`]; filesystem
//! implementations are the defaults.
//!
//! ## Crate Policy
//!
//! - Document problems are findings in the report, never `Err`.
//! - `EngineError` is reserved for failures of the run itself: an
//!   unreadable schema, a missing root, an unwritable output.

pub mod collaborators;
pub mod error;
pub mod extract;
pub mod fs;
pub mod orchestrator;
pub mod remediation;
pub mod report;
pub mod trace;

pub use collaborators::{
    ApprovalPolicy, Approver, BlockStyle, DocumentLoader, DocumentWriter, Extraction,
    LoadedDocument, MetadataExtractor, RepairPlan, ValidationEngine,
};
pub use error::EngineError;
pub use extract::FrontmatterExtractor;
pub use fs::{discover, FsLoader, FsWriter};
pub use orchestrator::{Orchestrator, RunOptions};
pub use remediation::{action_type, ActionType, RemediationSummary};
pub use report::{content_hash, BatchReport, DocumentReport, TerminalState};
pub use trace::{ArtifactTrace, ExecutionTrace};
