//! # Policy Classification
//!
//! Sorts everything known about one document into three tiers:
//!
//! - **fatal**: the document cannot be repaired automatically;
//! - **repairable**: normalization or an approved fix can resolve it;
//! - **warning**: informational only.
//!
//! Rules are applied in order and are non-exclusive, so a document may
//! collect findings in several tiers. A loader failure short-circuits all
//! other rules. The classifier never errors: a metadata shape it does not
//! expect becomes a fatal finding.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as Yaml};

use stamp_core::parse_date;
use stamp_schema::Cdo;

use crate::config::{PolicyConfig, TypeMismatchPolicy};

/// Aggregate document status. Ordered `Pass < Repairable < Fail`, so the
/// batch status is the maximum over documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Repairable,
    Fail,
}

impl Status {
    /// Process exit code for this status.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Repairable => 1,
            Self::Fail => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Repairable => "repairable",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the extractor found where the metadata block should be.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataState {
    /// No block at all.
    Missing,
    /// A block with no content.
    Empty,
    /// A block whose YAML could not be parsed (or was never terminated).
    Unparseable(String),
    /// A block that parsed to something other than a mapping.
    Malformed(String),
    /// A well-formed mapping.
    Present(Mapping),
}

impl MetadataState {
    /// The mapping, if present.
    pub fn mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Present(m) => Some(m),
            _ => None,
        }
    }
}

/// Finding taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    LoaderFailure,
    MissingMetadataBlock,
    EmptyMetadataBlock,
    MalformedMetadata,
    SchemaRequired,
    SchemaEnum,
    SchemaType,
    SchemaAdditionalProperties,
    UnknownKeyword,
    PolicyInconsistency,
    CircularDependency,
    InternalError,
}

/// One classified observation about a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub message: String,
    /// Top-level metadata field concerned, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Source diagnostic for schema findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Cdo>,
}

impl Finding {
    pub fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            diagnostic: None,
        }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_diagnostic(mut self, cdo: Cdo) -> Self {
        self.diagnostic = Some(cdo);
        self
    }

    fn from_diagnostic(kind: FindingKind, cdo: &Cdo, field: Option<String>) -> Self {
        let location = if cdo.instance_path.is_empty() {
            "(root)"
        } else {
            cdo.instance_path.as_str()
        };
        Self {
            kind,
            message: format!("{location}: {}", cdo.message),
            field,
            diagnostic: Some(cdo.clone()),
        }
    }
}

/// Tiered findings for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub fatal_errors: Vec<Finding>,
    pub repairable_errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ClassificationResult {
    /// A result holding a single fatal finding.
    pub fn fatal(finding: Finding) -> Self {
        Self {
            fatal_errors: vec![finding],
            ..Self::default()
        }
    }

    /// `fail` if any fatal, else `repairable` if any repairable, else `pass`.
    pub fn status(&self) -> Status {
        if !self.fatal_errors.is_empty() {
            Status::Fail
        } else if !self.repairable_errors.is_empty() {
            Status::Repairable
        } else {
            Status::Pass
        }
    }

    /// Force the document to `fail` with a batch-level finding.
    pub fn escalate(&mut self, finding: Finding) {
        self.fatal_errors.push(finding);
    }

    /// All findings, fatal first.
    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.fatal_errors
            .iter()
            .chain(&self.repairable_errors)
            .chain(&self.warnings)
    }
}

/// Classify one document.
///
/// `loader_errors` are I/O or encoding failures reported while loading the
/// document; any entry makes the document fatal and skips every other rule.
pub fn classify(
    metadata: &MetadataState,
    cdos: &[Cdo],
    loader_errors: &[String],
    config: &PolicyConfig,
) -> ClassificationResult {
    if !loader_errors.is_empty() {
        return ClassificationResult::fatal(Finding::new(
            FindingKind::LoaderFailure,
            format!("Failed to load document: {}", loader_errors.join("; ")),
        ));
    }

    let mut result = ClassificationResult::default();

    match metadata {
        MetadataState::Missing => result.repairable_errors.push(Finding::new(
            FindingKind::MissingMetadataBlock,
            "No metadata block found.",
        )),
        MetadataState::Empty => result.repairable_errors.push(Finding::new(
            FindingKind::EmptyMetadataBlock,
            "Metadata block is empty.",
        )),
        MetadataState::Unparseable(reason) => result.repairable_errors.push(Finding::new(
            FindingKind::EmptyMetadataBlock,
            format!("Metadata block could not be parsed: {reason}"),
        )),
        MetadataState::Malformed(found) => result.fatal_errors.push(Finding::new(
            FindingKind::MalformedMetadata,
            format!("Metadata block must be a mapping, found {found}."),
        )),
        MetadataState::Present(_) => {}
    }

    for cdo in cdos {
        classify_diagnostic(cdo, config, &mut result);
    }

    if let Some(mapping) = metadata.mapping() {
        domain_rules(mapping, config, &mut result);
    }

    result
}

fn classify_diagnostic(cdo: &Cdo, config: &PolicyConfig, result: &mut ClassificationResult) {
    let top_field = cdo
        .instance_path
        .strip_prefix('/')
        .and_then(|p| p.split('/').next())
        .map(stamp_core::unescape_segment);

    match cdo.schema_keyword.as_str() {
        "required" => {
            let field = if cdo.instance_path.is_empty() {
                cdo.detail_str("missing_property").map(str::to_string)
            } else {
                top_field
            };
            result
                .fatal_errors
                .push(Finding::from_diagnostic(FindingKind::SchemaRequired, cdo, field));
        }
        "enum" => result
            .fatal_errors
            .push(Finding::from_diagnostic(FindingKind::SchemaEnum, cdo, top_field)),
        "type" => {
            let finding = Finding::from_diagnostic(FindingKind::SchemaType, cdo, top_field);
            match config.type_mismatch {
                TypeMismatchPolicy::Repairable => result.repairable_errors.push(finding),
                TypeMismatchPolicy::Fatal => result.fatal_errors.push(finding),
            }
        }
        "additionalProperties" => {
            let field = if cdo.instance_path.is_empty() {
                cdo.detail_str("property").map(str::to_string)
            } else {
                top_field
            };
            let finding =
                Finding::from_diagnostic(FindingKind::SchemaAdditionalProperties, cdo, field);
            if cdo.is_fixable() {
                result.repairable_errors.push(finding);
            } else {
                result.fatal_errors.push(finding);
            }
        }
        _ => result
            .fatal_errors
            .push(Finding::from_diagnostic(FindingKind::UnknownKeyword, cdo, top_field)),
    }
}

/// Non-null and, for strings, not blank.
fn has_content(value: Option<&Yaml>) -> bool {
    match value {
        None | Some(Yaml::Null) => false,
        Some(Yaml::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn date_field(mapping: &Mapping, key: &str) -> Option<chrono::NaiveDate> {
    mapping.get(key).and_then(Yaml::as_str).and_then(parse_date)
}

fn domain_rules(mapping: &Mapping, config: &PolicyConfig, result: &mut ClassificationResult) {
    let inconsistency = |msg: String, field: &str| {
        Finding::new(FindingKind::PolicyInconsistency, msg).on_field(field)
    };

    let details_present = has_content(mapping.get("ai_assistance_details"));
    match mapping.get("ai_assisted").and_then(Yaml::as_str) {
        Some(level @ ("partial" | "extensive")) if !details_present => {
            result.repairable_errors.push(inconsistency(
                format!("ai_assisted is '{level}' but ai_assistance_details is missing."),
                "ai_assistance_details",
            ));
        }
        Some("none") if details_present => {
            result.repairable_errors.push(inconsistency(
                "ai_assisted is 'none' but ai_assistance_details is present.".to_string(),
                "ai_assistance_details",
            ));
        }
        _ => {}
    }

    let created = date_field(mapping, "created");
    let updated = date_field(mapping, "updated");
    if let (Some(c), Some(u)) = (created, updated) {
        if u < c {
            result.repairable_errors.push(inconsistency(
                format!("updated ({u}) is earlier than created ({c})."),
                "updated",
            ));
        }
    }
    if let Some(u) = updated {
        if u > config.far_future_sentinel {
            result.warnings.push(inconsistency(
                format!(
                    "updated ({u}) is after {}; check the date.",
                    config.far_future_sentinel
                ),
                "updated",
            ));
        }
    }

    match mapping.get("anchors") {
        None => {}
        Some(Yaml::Sequence(items)) if items.is_empty() => {
            result.repairable_errors.push(inconsistency(
                "anchors list is empty.".to_string(),
                "anchors",
            ));
        }
        Some(Yaml::Sequence(_)) => {}
        Some(_) => result.repairable_errors.push(inconsistency(
            "anchors must be a list.".to_string(),
            "anchors",
        )),
    }

    if let Some(deps) = mapping.get("dependencies") {
        if !deps.is_sequence() {
            result.repairable_errors.push(inconsistency(
                "dependencies must be a list.".to_string(),
                "dependencies",
            ));
        }
    }
}
