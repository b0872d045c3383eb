//! # Remediation Summary
//!
//! Explains, per document, what is left for a person to decide after
//! validation (and any automatic repair). Each diagnostic is assigned an
//! [`ActionType`]:
//!
//! | diagnostic | action type |
//! |---|---|
//! | conditional keywords (`if`, `then`, `else`, `not`, `allOf`, `anyOf`, `oneOf`) | `disclosure_decision` |
//! | `enum.invalid` | `governance_decision` |
//! | `object.no_additional_properties` with a fix | `auto_fixable` |
//! | everything else | `author_decision` |
//!
//! The summary never enforces anything; it only describes.

use serde::Serialize;

use stamp_schema::{Cdo, Severity};

use crate::report::{DocumentReport, TerminalState};

const CONDITIONAL_KEYWORDS: [&str; 7] = ["if", "then", "else", "not", "allOf", "anyOf", "oneOf"];

/// Who has to act on a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AutoFixable,
    AuthorDecision,
    DisclosureDecision,
    GovernanceDecision,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AutoFixable => "auto_fixable",
            Self::AuthorDecision => "author_decision",
            Self::DisclosureDecision => "disclosure_decision",
            Self::GovernanceDecision => "governance_decision",
        }
    }
}

pub fn action_type(cdo: &Cdo) -> ActionType {
    if CONDITIONAL_KEYWORDS.contains(&cdo.schema_keyword.as_str()) {
        return ActionType::DisclosureDecision;
    }
    match cdo.id.as_str() {
        "enum.invalid" => ActionType::GovernanceDecision,
        "object.no_additional_properties" if cdo.is_fixable() => ActionType::AutoFixable,
        _ => ActionType::AuthorDecision,
    }
}

/// `<root>` for the empty pointer, otherwise the pointer with `/` as `.`.
pub fn field_path(instance_path: &str) -> String {
    if instance_path.is_empty() {
        "<root>".to_string()
    } else {
        instance_path.trim_start_matches('/').replace('/', ".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationItem {
    pub field: String,
    pub rule: String,
    pub reason: String,
    pub action_type: ActionType,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub passed: bool,
    pub diagnostic_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoFixSummary {
    pub applied: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HumanAction {
    pub required: bool,
    /// True if any remaining item is an error.
    pub blocking: bool,
    pub item_count: usize,
    pub items: Vec<RemediationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationSummary {
    pub artifact: String,
    pub schema: String,
    pub validation: ValidationSummary,
    pub auto_fix: AutoFixSummary,
    pub human_action_required: HumanAction,
}

impl RemediationSummary {
    /// Summarize one document. Auto-fixable items are omitted once a repair
    /// has been written.
    pub fn for_document(report: &DocumentReport, schema: &str) -> Self {
        let repaired = report.terminal_state == TerminalState::Repaired;
        let passed = report.diagnostics.is_empty();
        let applied = report.applied_proposals.len();

        let items: Vec<RemediationItem> = report
            .diagnostics
            .iter()
            .filter_map(|d| {
                let action_type = action_type(d);
                if repaired && action_type == ActionType::AutoFixable {
                    return None;
                }
                Some(RemediationItem {
                    field: field_path(&d.instance_path),
                    rule: d.schema_keyword.clone(),
                    reason: d.message.clone(),
                    action_type,
                    severity: d.severity,
                })
            })
            .collect();

        Self {
            artifact: report.file.clone(),
            schema: schema.to_string(),
            validation: ValidationSummary {
                passed,
                diagnostic_count: report.diagnostics.len(),
            },
            auto_fix: AutoFixSummary {
                applied,
                skipped: report.diagnostics.len().saturating_sub(applied),
            },
            human_action_required: HumanAction {
                required: !passed,
                blocking: items.iter().any(|i| i.severity == Severity::Error),
                item_count: items.len(),
                items,
            },
        }
    }
}
