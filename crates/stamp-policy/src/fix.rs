//! # Fix Proposals
//!
//! [`build`] derives proposals from diagnostics without touching any
//! document. Three rules, one per proposal classification:
//!
//! | Rule | Trigger | Action | Applied automatically |
//! |------|---------|--------|-----------------------|
//! | mechanical prune | `fix.strategy == prune` | `remove` | yes |
//! | inferred enum | `enum`, one case-insensitive match | `replace` | only when approved |
//! | prohibited addition | `required` | `add` | never |
//!
//! A proposal id is the SHA-256 of
//! `diagnostic_id + instance_path + action + canonical_json(proposed_value)`,
//! so the same diagnostic always yields the same id.
//!
//! [`apply`] executes proposals against a metadata mapping, honouring
//! classification and approval.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_yaml::{Mapping, Value as Yaml};

use stamp_core::{canonical_json, parse_pointer, text_digest};
use stamp_schema::{Cdo, FixStrategy};

/// Mutation a proposal performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixAction {
    Remove,
    Replace,
    Add,
}

impl FixAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::Add => "add",
        }
    }
}

/// How much judgement a proposal embodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalClassification {
    /// Provably safe; no approval needed.
    Mechanical,
    /// Likely correct; needs approval.
    Inferred,
    /// Documented for visibility; never applied.
    Prohibited,
}

/// Where a proposal points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTarget {
    pub instance_path: String,
    pub schema_path: String,
}

/// A suggested change derived from one diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixProposal {
    pub id: String,
    pub diagnostic_id: String,
    pub target: ProposalTarget,
    pub action: FixAction,
    pub classification: ProposalClassification,
    pub basis: String,
    pub confidence: String,
    pub requires_approval: bool,
    pub prohibited: bool,
    pub current_value: Value,
    pub proposed_value: Value,
    pub notes: String,
    /// Key removed by a prune, relative to `target.instance_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// `sha256(diagnostic_id + instance_path + action + canonical_json(proposed_value))`.
pub fn proposal_id(diagnostic_id: &str, instance_path: &str, action: FixAction, proposed_value: &Value) -> String {
    let material = format!(
        "{diagnostic_id}{instance_path}{}{}",
        action.as_str(),
        canonical_json(proposed_value)
    );
    text_digest(&material).to_hex()
}

impl FixProposal {
    fn new(
        cdo: &Cdo,
        action: FixAction,
        classification: ProposalClassification,
        basis: &str,
        current_value: Value,
        proposed_value: Value,
        notes: String,
    ) -> Self {
        let prohibited = classification == ProposalClassification::Prohibited;
        Self {
            id: proposal_id(&cdo.id, &cdo.instance_path, action, &proposed_value),
            diagnostic_id: cdo.id.clone(),
            target: ProposalTarget {
                instance_path: cdo.instance_path.clone(),
                schema_path: cdo.schema_path.clone(),
            },
            action,
            classification,
            basis: basis.to_string(),
            confidence: "high".to_string(),
            requires_approval: classification != ProposalClassification::Mechanical,
            prohibited,
            current_value,
            proposed_value,
            notes,
            key: None,
        }
    }
}

/// Derive proposals from diagnostics. Pure; provenance is ignored.
pub fn build(cdos: &[Cdo]) -> Vec<FixProposal> {
    cdos.iter().filter_map(propose).collect()
}

fn propose(cdo: &Cdo) -> Option<FixProposal> {
    if let Some(fix) = cdo.fix.as_ref().filter(|f| f.strategy == FixStrategy::Prune) {
        let key = fix.key().unwrap_or_default();
        let current = cdo.details.get("value").cloned().unwrap_or(Value::Null);
        let mut proposal = FixProposal::new(
            cdo,
            FixAction::Remove,
            ProposalClassification::Mechanical,
            "schema_strictness",
            current,
            Value::Null,
            format!("Removing field '{key}' explicitly forbidden by schema."),
        );
        proposal.key = Some(key.to_string());
        return Some(proposal);
    }

    match cdo.schema_keyword.as_str() {
        "enum" => {
            let value = cdo.details.get("value")?.as_str()?;
            let folded = value.to_lowercase();
            let allowed = cdo.details.get("allowed_values")?.as_array()?;
            let mut matches = allowed
                .iter()
                .filter_map(Value::as_str)
                .filter(|a| a.to_lowercase() == folded);
            let candidate = matches.next()?;
            if matches.next().is_some() {
                return None;
            }
            Some(FixProposal::new(
                cdo,
                FixAction::Replace,
                ProposalClassification::Inferred,
                "case_normalization",
                Value::String(value.to_string()),
                Value::String(candidate.to_string()),
                format!("Value matches allowed enum '{candidate}' via case-insensitive comparison."),
            ))
        }
        "required" => {
            let missing = cdo.detail_str("missing_property").unwrap_or("unknown");
            Some(FixProposal::new(
                cdo,
                FixAction::Add,
                ProposalClassification::Prohibited,
                "policy_constraint",
                Value::Null,
                Value::Null,
                format!("Automated assignment of '{missing}' is prohibited by governance policy."),
            ))
        }
        _ => None,
    }
}

/// Counts over a proposal set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSummary {
    pub total_proposals: usize,
    pub requires_approval_count: usize,
    pub mechanical: usize,
    pub inferred: usize,
    pub prohibited: usize,
}

impl ProposalSummary {
    pub fn of(proposals: &[FixProposal]) -> Self {
        let count = |c| proposals.iter().filter(|p| p.classification == c).count();
        Self {
            total_proposals: proposals.len(),
            requires_approval_count: proposals.iter().filter(|p| p.requires_approval).count(),
            mechanical: count(ProposalClassification::Mechanical),
            inferred: count(ProposalClassification::Inferred),
            prohibited: count(ProposalClassification::Prohibited),
        }
    }
}

/// Result of [`apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub metadata: Mapping,
    /// Ids of proposals that changed the mapping.
    pub applied: Vec<String>,
    /// Ids of proposals left unapplied, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Apply proposals to top-level metadata keys.
///
/// Prohibited proposals are never applied. Proposals that require approval
/// are applied only if their id is in `approved`. Targets deeper than one
/// level, and keys that no longer exist, are skipped.
pub fn apply(metadata: &Mapping, proposals: &[FixProposal], approved: &BTreeSet<String>) -> ApplyOutcome {
    let mut out = metadata.clone();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for p in proposals {
        if p.prohibited {
            skipped.push((p.id.clone(), "prohibited".to_string()));
            continue;
        }
        if p.requires_approval && !approved.contains(&p.id) {
            skipped.push((p.id.clone(), "not approved".to_string()));
            continue;
        }

        match apply_one(&mut out, p) {
            Ok(()) => applied.push(p.id.clone()),
            Err(reason) => skipped.push((p.id.clone(), reason)),
        }
    }

    ApplyOutcome {
        metadata: out,
        applied,
        skipped,
    }
}

fn apply_one(map: &mut Mapping, p: &FixProposal) -> Result<(), String> {
    match p.action {
        FixAction::Remove => {
            // Prune proposals target the object holding the offending key.
            if !p.target.instance_path.is_empty() {
                return Err("nested targets are not supported".to_string());
            }
            let key = p.key.as_deref().ok_or_else(|| "proposal names no key".to_string())?;
            if !map.contains_key(key) {
                return Err(format!("key '{key}' not present"));
            }
            *map = std::mem::take(map)
                .into_iter()
                .filter(|(k, _)| k.as_str() != Some(key))
                .collect();
            Ok(())
        }
        FixAction::Replace => {
            let segments = parse_pointer(&p.target.instance_path).map_err(|e| e.to_string())?;
            let [key] = segments.as_slice() else {
                return Err("only top-level keys can be replaced".to_string());
            };
            let slot = map
                .get_mut(key.as_str())
                .ok_or_else(|| format!("key '{key}' not present"))?;
            *slot = serde_yaml::to_value(&p.proposed_value).map_err(|e| e.to_string())?;
            Ok(())
        }
        FixAction::Add => Err("additions are never applied".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use serde_json::json;
    use stamp_core::FixedClock;
    use stamp_schema::{DiagnosticTranslator, Provenance, RawError};

    fn translator_at(day: u32) -> DiagnosticTranslator {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2026, 1, day).unwrap());
        DiagnosticTranslator::new(Provenance::new(&clock, "0.1.0", "s", "jsonschema"))
    }

    fn enum_cdo(allowed: Value, value: &str) -> Cdo {
        translator_at(1).translate(
            &RawError::new("enum", json!(value))
                .at(&["status"])
                .schema_at(&["properties", "status", "enum"])
                .expecting(allowed),
        )
    }

    fn prune_cdo(key: &str) -> Cdo {
        translator_at(1).translate(
            &RawError::new("additionalProperties", json!({key: 123}))
                .schema_at(&["additionalProperties"])
                .for_property(key),
        )
    }

    #[test]
    fn inferred_enum_case_fold() {
        let proposals = build(&[enum_cdo(json!(["Draft", "Final"]), "draft")]);
        assert_eq!(proposals.len(), 1);
        let p = &proposals[0];
        assert_eq!(p.classification, ProposalClassification::Inferred);
        assert_eq!(p.action, FixAction::Replace);
        assert_eq!(p.proposed_value, json!("Draft"));
        assert_eq!(p.current_value, json!("draft"));
        assert!(p.requires_approval);
        assert!(!p.prohibited);
    }

    #[test]
    fn ambiguous_or_absent_enum_match_yields_nothing() {
        assert!(build(&[enum_cdo(json!(["Draft", "DRAFT"]), "draft")]).is_empty());
        assert!(build(&[enum_cdo(json!(["Draft", "Final"]), "drafty")]).is_empty());
        // No trimming.
        assert!(build(&[enum_cdo(json!(["Draft"]), " draft")]).is_empty());
    }

    #[test]
    fn mechanical_prune() {
        let proposals = build(&[prune_cdo("internal_id")]);
        assert_eq!(proposals.len(), 1);
        let p = &proposals[0];
        assert_eq!(p.classification, ProposalClassification::Mechanical);
        assert_eq!(p.action, FixAction::Remove);
        assert!(!p.requires_approval);
        assert_eq!(p.proposed_value, Value::Null);
    }

    #[test]
    fn required_is_prohibited() {
        let cdo = translator_at(1).translate(&RawError::new("required", json!({})).for_property("license"));
        let p = &build(&[cdo])[0];
        assert_eq!(p.classification, ProposalClassification::Prohibited);
        assert!(p.prohibited && p.requires_approval);
        assert_eq!(p.action, FixAction::Add);
    }

    #[test]
    fn proposal_id_matches_formula() {
        let p = &build(&[enum_cdo(json!(["Draft"]), "draft")])[0];
        let expected = text_digest("enum.invalid/statusreplace\"Draft\"").to_hex();
        assert_eq!(p.id, expected);
        assert_eq!(p.id.len(), 64);
    }

    #[test]
    fn proposal_id_ignores_key_order_of_proposed_value() {
        let mut forward = serde_json::Map::new();
        forward.insert("name".into(), json!("A"));
        forward.insert("orcid".into(), json!("0000"));
        let mut reverse = serde_json::Map::new();
        reverse.insert("orcid".into(), json!("0000"));
        reverse.insert("name".into(), json!("A"));

        let a = proposal_id("enum.invalid", "/author", FixAction::Replace, &Value::Object(forward));
        let b = proposal_id("enum.invalid", "/author", FixAction::Replace, &Value::Object(reverse));
        assert_eq!(a, b);
        assert_eq!(
            a,
            text_digest(r#"enum.invalid/authorreplace{"name":"A","orcid":"0000"}"#).to_hex()
        );
    }

    #[test]
    fn summary_counts() {
        let cdos = vec![
            prune_cdo("x"),
            enum_cdo(json!(["Draft"]), "DRAFT"),
            translator_at(1).translate(&RawError::new("required", json!({})).for_property("t")),
        ];
        let s = ProposalSummary::of(&build(&cdos));
        assert_eq!(s.total_proposals, 3);
        assert_eq!(s.requires_approval_count, 2);
        assert_eq!((s.mechanical, s.inferred, s.prohibited), (1, 1, 1));
    }

    #[test]
    fn apply_respects_gates() {
        let meta: Mapping = serde_yaml::from_str("title: T\nstatus: draft\ninternal_id: 123\nlicense: MIT\n").unwrap();
        let proposals = build(&[
            prune_cdo("internal_id"),
            enum_cdo(json!(["Draft"]), "draft"),
            translator_at(1).translate(&RawError::new("required", json!({})).for_property("author")),
        ]);

        let none = apply(&meta, &proposals, &BTreeSet::new());
        assert_eq!(none.applied.len(), 1);
        assert!(none.metadata.get("internal_id").is_none());
        assert_eq!(none.metadata.get("status").and_then(Yaml::as_str), Some("draft"));
        assert_eq!(none.skipped.len(), 2);

        let keys: Vec<_> = none.metadata.keys().filter_map(Yaml::as_str).collect();
        assert_eq!(keys, vec!["title", "status", "license"]);

        let approved: BTreeSet<String> = proposals.iter().map(|p| p.id.clone()).collect();
        let all = apply(&meta, &proposals, &approved);
        assert_eq!(all.applied.len(), 2);
        assert_eq!(all.metadata.get("status").and_then(Yaml::as_str), Some("Draft"));
        assert!(all.metadata.get("author").is_none());
    }

    proptest! {
        #[test]
        fn build_ignores_provenance(day in 1u32..28, value in "[a-zA-Z]{1,8}") {
            let raw = RawError::new("enum", json!(value.clone()))
                .at(&["status"])
                .expecting(json!(["Draft", "Final", value.to_uppercase()]));
            let a = build(&[translator_at(day).translate(&raw)]);
            let b = build(&[translator_at(1).translate(&raw)]);
            prop_assert_eq!(a, b);
        }
    }
}
