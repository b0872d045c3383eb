//! # Orchestrator
//!
//! Runs a batch of documents through the governance pipeline.
//!
//! ## Per-document phase
//!
//! `Loaded → Extracted → Validated → Classified`. Each document is assessed
//! independently over its in-memory text; the result carries the document's
//! diagnostics, classification and declared dependencies. A failure inside
//! this phase (a validation engine error, or a panic) becomes a synthetic
//! fatal `internal.error` diagnostic and a matching `InternalError` finding
//! for that document. The rest of the batch is unaffected.
//!
//! ## Barrier
//!
//! Once every document is classified, the declared dependencies are merged
//! into one [`DependencyGraph`] and cycle detection runs. If any cycle
//! exists, every document in the batch gains a fatal `CircularDependency`
//! finding naming the first cycle.
//!
//! ## Repair phase
//!
//! Only when repair is requested, and only for documents that are still
//! `repairable` after the barrier: build proposals, apply the mechanical
//! ones (plus any the [`Approver`] accepts), normalize, render, and ask the
//! approver before writing. Documents with fatal findings never reach the
//! normalizer.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use serde_yaml::{Mapping, Value as Yaml};

use stamp_core::{Clock, SystemClock};
use stamp_policy::{
    apply, build, classify, normalize, ClassificationResult, DependencyGraph, Finding, FindingKind,
    FixProposal, MetadataState, PolicyConfig, ProposalSummary, Status,
};
use stamp_schema::{
    yaml_to_json_value, Cdo, DiagnosticTranslator, Provenance, ResolvedSchema, SchemaEngine,
    SchemaError, ValidationEngine,
};

use crate::collaborators::{
    ApprovalPolicy, Approver, BlockStyle, DocumentLoader, DocumentWriter, MetadataExtractor,
    RepairPlan,
};
use crate::error::EngineError;
use crate::extract::FrontmatterExtractor;
use crate::fs::{FsLoader, FsWriter};
use crate::report::{content_hash, BatchReport, DocumentReport, TerminalState};

/// What a run should do beyond assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Attempt to repair and write repairable documents.
    pub repair: bool,
    /// Write repaired documents here instead of in place.
    pub output_dir: Option<PathBuf>,
}

/// One document after the per-document phase.
#[derive(Debug)]
struct Assessment {
    path: PathBuf,
    text: String,
    metadata: MetadataState,
    body: String,
    style: BlockStyle,
    diagnostics: Vec<Cdo>,
    classification: ClassificationResult,
    dependencies: Vec<String>,
}

impl Assessment {
    fn internal_failure(path: &Path, text: String, translator: &DiagnosticTranslator, reason: &str) -> Self {
        let mut assessment = Self::failed(path, text, ClassificationResult::default());
        assessment.record_internal_error(translator, reason);
        assessment
    }

    /// Add a synthetic fatal diagnostic and its `InternalError` finding.
    fn record_internal_error(&mut self, translator: &DiagnosticTranslator, reason: &str) {
        let cdo = translator.internal_error(reason);
        let finding = Finding::new(FindingKind::InternalError, cdo.message.clone()).with_diagnostic(cdo.clone());
        self.diagnostics.push(cdo);
        self.classification.escalate(finding);
    }

    fn failed(path: &Path, text: String, classification: ClassificationResult) -> Self {
        Self {
            path: path.to_path_buf(),
            body: text.clone(),
            text,
            metadata: MetadataState::Missing,
            style: BlockStyle::Absent,
            diagnostics: Vec::new(),
            classification,
            dependencies: Vec::new(),
        }
    }
}

/// Outcome of the repair phase for one document.
#[derive(Debug, Default)]
struct Repair {
    applied: Vec<String>,
    corrections: Vec<String>,
    rewritten: Option<String>,
    written_to: Option<PathBuf>,
}

/// Batch pipeline over pluggable collaborators.
pub struct Orchestrator {
    schema: ResolvedSchema,
    config: PolicyConfig,
    loader: Box<dyn DocumentLoader>,
    extractor: Box<dyn MetadataExtractor>,
    engine: Box<dyn ValidationEngine>,
    writer: Box<dyn DocumentWriter>,
    approver: Box<dyn Approver>,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("schema", &self.schema.identifier)
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Filesystem collaborators, the `jsonschema` engine, the system clock,
    /// and an approver that approves nothing.
    pub fn new(schema: ResolvedSchema, config: PolicyConfig) -> Self {
        Self {
            schema,
            config,
            loader: Box::new(FsLoader),
            extractor: Box::new(FrontmatterExtractor),
            engine: Box::new(SchemaEngine::new()),
            writer: Box::new(FsWriter),
            approver: Box::new(ApprovalPolicy::dry_run()),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_extractor(mut self, extractor: impl MetadataExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_engine(mut self, engine: impl ValidationEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn with_writer(mut self, writer: impl DocumentWriter + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    pub fn with_approver(mut self, approver: impl Approver + 'static) -> Self {
        self.approver = Box::new(approver);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Compile the schema up front so a broken schema is an operational
    /// error rather than a finding on every document.
    pub fn preflight(&self) -> Result<(), EngineError> {
        self.engine.validate(&Value::Object(Map::new()), &self.schema)?;
        Ok(())
    }

    /// Run the pipeline over `paths`, in the order given.
    pub fn run(&self, paths: &[PathBuf], options: &RunOptions) -> BatchReport {
        let translator = DiagnosticTranslator::new(Provenance::new(
            self.clock.as_ref(),
            self.config.stamp_version.as_str(),
            self.schema.identifier.as_str(),
            self.engine.name(),
        ));

        let mut assessments: Vec<Assessment> = paths
            .iter()
            .map(|path| self.assess_guarded(path, &translator))
            .collect();

        let cycles = self.dependency_barrier(&mut assessments);

        let documents: Vec<DocumentReport> = assessments
            .into_iter()
            .map(|a| self.finish(a, &translator, options))
            .collect();

        let report = BatchReport::new(self.schema.identifier.as_str(), documents, cycles);
        tracing::info!(
            documents = report.documents.len(),
            pass = report.count(Status::Pass),
            repairable = report.count(Status::Repairable),
            fail = report.count(Status::Fail),
            status = %report.status,
            "batch complete"
        );
        report
    }

    fn assess_guarded(&self, path: &Path, translator: &DiagnosticTranslator) -> Assessment {
        let loaded = match catch_unwind(AssertUnwindSafe(|| self.loader.load(path))) {
            Ok(loaded) => loaded,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::warn!(path = %path.display(), %reason, "loading panicked");
                return Assessment::internal_failure(path, String::new(), translator, &reason);
            }
        };
        if !loaded.errors.is_empty() {
            let classification = classify(&MetadataState::Missing, &[], &loaded.errors, &self.config);
            return Assessment::failed(path, loaded.text, classification);
        }

        match catch_unwind(AssertUnwindSafe(|| self.assess(path, &loaded.text, translator))) {
            Ok(Ok(assessment)) => assessment,
            Ok(Err(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "validation failed");
                Assessment::internal_failure(path, loaded.text, translator, &e.to_string())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::warn!(path = %path.display(), %reason, "document processing panicked");
                Assessment::internal_failure(path, loaded.text, translator, &reason)
            }
        }
    }

    fn assess(&self, path: &Path, text: &str, translator: &DiagnosticTranslator) -> Result<Assessment, SchemaError> {
        let extraction = self.extractor.extract(path, text);

        let diagnostics = match validation_instance(&extraction.metadata)? {
            Some(instance) => {
                let raw = self.engine.validate(&instance, &self.schema)?;
                translator.translate_all(&raw)
            }
            None => Vec::new(),
        };

        let classification = classify(&extraction.metadata, &diagnostics, &[], &self.config);
        let dependencies = extraction
            .metadata
            .mapping()
            .map(declared_dependencies)
            .unwrap_or_default();

        tracing::debug!(
            path = %path.display(),
            diagnostics = diagnostics.len(),
            status = %classification.status(),
            "classified document"
        );

        Ok(Assessment {
            path: path.to_path_buf(),
            text: text.to_string(),
            metadata: extraction.metadata,
            body: extraction.body,
            style: extraction.style,
            diagnostics,
            classification,
            dependencies,
        })
    }

    /// Merge every document's edges, then detect cycles. Any cycle makes
    /// every document fatal.
    fn dependency_barrier(&self, assessments: &mut [Assessment]) -> Vec<stamp_policy::Cycle> {
        let mut graph = DependencyGraph::new(&self.config);
        for a in assessments.iter() {
            graph.add_edges(&graph_key(&a.path), &a.dependencies);
        }
        tracing::debug!(nodes = graph.node_count(), edges = graph.edge_count(), "built dependency graph");

        let cycles = graph.detect_cycles();
        if let Some(first) = cycles.first() {
            let message = format!("Circular dependency detected: {first}");
            tracing::warn!(documents = assessments.len(), cycle = %first, "escalating batch to fail");
            for a in assessments.iter_mut() {
                a.classification
                    .escalate(Finding::new(FindingKind::CircularDependency, message.clone()));
            }
        }
        cycles
    }

    fn finish(
        &self,
        mut assessment: Assessment,
        translator: &DiagnosticTranslator,
        options: &RunOptions,
    ) -> DocumentReport {
        let proposals = build(&assessment.diagnostics);
        let status = assessment.classification.status();

        let repair = if options.repair && status == Status::Repairable {
            let guarded = catch_unwind(AssertUnwindSafe(|| {
                self.repair(&assessment, &proposals, options.output_dir.as_deref())
            }));
            match guarded {
                Ok(Ok(repair)) => repair,
                Ok(Err(e)) => {
                    tracing::warn!(path = %assessment.path.display(), error = %e, "repair failed");
                    assessment.record_internal_error(translator, &e.to_string());
                    Repair::default()
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    tracing::warn!(path = %assessment.path.display(), %reason, "repair panicked");
                    assessment.record_internal_error(translator, &reason);
                    Repair::default()
                }
            }
        } else {
            Repair::default()
        };

        let status = assessment.classification.status();
        let terminal_state = match status {
            Status::Pass => TerminalState::Clean,
            Status::Fail => TerminalState::Rejected,
            Status::Repairable if repair.written_to.is_some() => TerminalState::Repaired,
            Status::Repairable => TerminalState::Pending,
        };
        let written = repair.written_to.is_some();

        DocumentReport {
            file: assessment.path.display().to_string(),
            status,
            exit_code: status.exit_code(),
            terminal_state,
            findings: assessment.classification,
            diagnostics: assessment.diagnostics,
            proposal_summary: ProposalSummary::of(&proposals),
            proposals,
            applied_proposals: if written { repair.applied } else { Vec::new() },
            corrections_applied: if written { repair.corrections } else { Vec::new() },
            dependencies: assessment.dependencies,
            original_hash: content_hash(&assessment.text),
            rewritten_hash: repair.rewritten.as_deref().filter(|_| written).map(content_hash),
            written_to: repair.written_to.map(|p| p.display().to_string()),
        }
    }

    fn repair(
        &self,
        assessment: &Assessment,
        proposals: &[FixProposal],
        output_dir: Option<&Path>,
    ) -> Result<Repair, EngineError> {
        let path = assessment.path.as_path();
        let metadata = match &assessment.metadata {
            MetadataState::Present(m) => m.clone(),
            MetadataState::Missing | MetadataState::Empty => Mapping::new(),
            // Rewriting would discard the unreadable block.
            MetadataState::Unparseable(_) | MetadataState::Malformed(_) => return Ok(Repair::default()),
        };

        let approved: BTreeSet<String> = proposals
            .iter()
            .filter(|p| p.requires_approval && self.approver.approve_proposal(path, p))
            .map(|p| p.id.clone())
            .collect();
        let outcome = apply(&metadata, proposals, &approved);
        let normalized = normalize(&outcome.metadata, &assessment.body, self.clock.as_ref(), &self.config);
        let rewritten = self
            .extractor
            .render(&normalized.metadata, &normalized.body, assessment.style)?;

        let mut repair = Repair {
            applied: outcome.applied.clone(),
            corrections: normalized.corrections.clone(),
            rewritten: Some(rewritten.clone()),
            written_to: None,
        };
        if rewritten == assessment.text {
            tracing::debug!(path = %path.display(), "repair produced no change");
            return Ok(repair);
        }

        let plan = RepairPlan {
            applied_proposals: outcome.applied,
            skipped_proposals: outcome.skipped,
            corrections: normalized.corrections,
            rewritten,
        };
        if !self.approver.approve(path, &plan) {
            tracing::debug!(path = %path.display(), "repair not approved");
            return Ok(repair);
        }

        repair.written_to = Some(self.writer.write(path, &plan.rewritten, output_dir)?);
        tracing::info!(
            path = %path.display(),
            applied = plan.applied_proposals.len(),
            corrections = plan.corrections.len(),
            "repaired document"
        );
        Ok(repair)
    }
}

/// The JSON instance to validate, or `None` when the block is unusable.
/// A missing or empty block validates as `{}` so required-field diagnostics
/// are still produced.
fn validation_instance(metadata: &MetadataState) -> Result<Option<Value>, SchemaError> {
    match metadata {
        MetadataState::Present(m) => yaml_to_json_value(&Yaml::Mapping(m.clone())).map(Some),
        MetadataState::Missing | MetadataState::Empty | MetadataState::Unparseable(_) => {
            Ok(Some(Value::Object(Map::new())))
        }
        MetadataState::Malformed(_) => Ok(None),
    }
}

fn declared_dependencies(metadata: &Mapping) -> Vec<String> {
    match metadata.get("dependencies") {
        Some(Yaml::Sequence(items)) => items
            .iter()
            .filter_map(Yaml::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn graph_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
