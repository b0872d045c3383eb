//! # Metadata Normalization
//!
//! Deterministic rewrite of a metadata mapping. Steps, in order:
//!
//! 1. reorder keys into the configured canonical order, unknown keys
//!    appended in their original relative order;
//! 2. `anchors` / `dependencies` that are null or `""` become `[]`;
//! 3. a versioned document without a released DOI gets `TBD-<version>`;
//! 4. `ai_assistance_details` is removed when `ai_assisted: none` and
//!    filled with a placeholder when `ai_assisted` is `partial` or
//!    `extensive` and details are missing;
//! 5. if anything above changed, `updated` is set to the clock's date.
//!
//! Step 5 never fires on its own, so a second pass over normalized output
//! records no corrections and changes nothing:
//! `normalize(normalize(m)) == normalize(m)` under a fixed clock.
//!
//! The document body passes through untouched.

use serde::Serialize;
use serde_yaml::{Mapping, Value as Yaml};

use stamp_core::Clock;

use crate::config::PolicyConfig;

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationReport {
    /// The normalized mapping, in canonical key order.
    pub metadata: Mapping,
    /// The document body, unchanged.
    pub body: String,
    /// Human-readable description of each change, in application order.
    pub corrections: Vec<String>,
    /// Whether step 5 rewrote `updated`.
    pub timestamp_bumped: bool,
}

impl NormalizationReport {
    /// True if normalization changed anything.
    pub fn changed(&self) -> bool {
        !self.corrections.is_empty()
    }
}

/// Normalize one document's metadata.
pub fn normalize(
    metadata: &Mapping,
    body: &str,
    clock: &dyn Clock,
    config: &PolicyConfig,
) -> NormalizationReport {
    let mut corrections = Vec::new();

    let mut map = canonical_order(metadata, &config.canonical_order);
    if keys(&map) != keys(metadata) {
        corrections.push("Reordered metadata fields into canonical order.".to_string());
    }

    default_lists(&mut map, &mut corrections);
    placeholder_doi(&mut map, &mut corrections);
    ai_disclosure(&mut map, config, &mut corrections);

    let mut timestamp_bumped = false;
    if !corrections.is_empty() {
        let today = clock.today().format("%Y-%m-%d").to_string();
        if map.get("updated").and_then(Yaml::as_str) != Some(today.as_str()) {
            map.insert(Yaml::from("updated"), Yaml::String(today.clone()));
            corrections.push(format!("Updated 'updated' timestamp to {today} (due to repairs)."));
            timestamp_bumped = true;
            tracing::debug!(updated = %today, "bumped updated timestamp");
        }
    }

    // Keys inserted by later steps land at their canonical position.
    let map = canonical_order(&map, &config.canonical_order);

    NormalizationReport {
        metadata: map,
        body: body.to_string(),
        corrections,
        timestamp_bumped,
    }
}

fn keys(map: &Mapping) -> Vec<&Yaml> {
    map.keys().collect()
}

fn canonical_order(map: &Mapping, order: &[String]) -> Mapping {
    let mut out = Mapping::new();
    for key in order {
        if let Some(v) = map.get(key.as_str()) {
            out.insert(Yaml::String(key.clone()), v.clone());
        }
    }
    for (k, v) in map {
        if !out.contains_key(k) {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

fn is_blank(value: &Yaml) -> bool {
    match value {
        Yaml::Null => true,
        Yaml::String(s) => s.is_empty(),
        _ => false,
    }
}

fn default_lists(map: &mut Mapping, corrections: &mut Vec<String>) {
    for key in ["anchors", "dependencies"] {
        if let Some(slot) = map.get_mut(key) {
            if is_blank(slot) {
                *slot = Yaml::Sequence(Vec::new());
                corrections.push(format!("Injected empty {key} list."));
            }
        }
    }
}

/// Render a scalar as text. Non-scalars have no textual form here.
fn scalar_text(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn placeholder_doi(map: &mut Mapping, corrections: &mut Vec<String>) {
    let Some(version) = map
        .get("version")
        .and_then(scalar_text)
        .filter(|v| !v.is_empty())
    else {
        return;
    };

    let unreleased = match map.get("doi") {
        None | Some(Yaml::Null) => true,
        Some(Yaml::String(doi)) => doi.starts_with("TBD"),
        Some(_) => false,
    };
    if !unreleased {
        return;
    }

    let placeholder = format!("TBD-{version}");
    if map.get("doi").and_then(Yaml::as_str) != Some(placeholder.as_str()) {
        map.insert(Yaml::from("doi"), Yaml::String(placeholder.clone()));
        corrections.push(format!("Added placeholder DOI: {placeholder}"));
    }
}

fn ai_disclosure(map: &mut Mapping, config: &PolicyConfig, corrections: &mut Vec<String>) {
    const DETAILS: &str = "ai_assistance_details";

    let level = map.get("ai_assisted").and_then(Yaml::as_str).map(str::to_string);
    let details = map.get(DETAILS);
    let key_present = details.is_some();
    let has_details = match details {
        None | Some(Yaml::Null) => false,
        Some(Yaml::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    };

    match level.as_deref() {
        Some("none") if key_present => {
            *map = std::mem::take(map)
                .into_iter()
                .filter(|(k, _)| k.as_str() != Some(DETAILS))
                .collect();
            corrections.push("Removed ai_assistance_details (ai_assisted='none').".to_string());
        }
        Some("partial" | "extensive") if !has_details => {
            map.insert(
                Yaml::from(DETAILS),
                Yaml::String(config.ai_details_placeholder.clone()),
            );
            corrections.push("Inserted ai_assistance_details for AI-assisted document.".to_string());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use stamp_core::FixedClock;

    fn clock() -> FixedClock {
        FixedClock::at_date(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
    }

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn run(yaml: &str) -> NormalizationReport {
        normalize(&mapping(yaml), "body\n", &clock(), &PolicyConfig::default())
    }

    fn key_order(map: &Mapping) -> Vec<&str> {
        map.keys().filter_map(Yaml::as_str).collect()
    }

    #[test]
    fn ai_partial_gets_details_and_bump() {
        let r = run("ai_assisted: partial\n");
        let details = r.metadata.get("ai_assistance_details").and_then(Yaml::as_str).unwrap();
        assert!(!details.is_empty());
        assert!(r.timestamp_bumped);
        assert!(r.corrections.iter().any(|c| c.contains("'updated'")));
        assert_eq!(r.metadata.get("updated").and_then(Yaml::as_str), Some("2026-03-15"));
        assert_eq!(key_order(&r.metadata), vec!["updated", "ai_assisted", "ai_assistance_details"]);
    }

    #[test]
    fn ai_none_removes_details() {
        let r = run("ai_assisted: none\nai_assistance_details: ''\nanchors: [a]\n");
        assert!(r.metadata.get("ai_assistance_details").is_none());
        assert!(r.changed());
    }

    #[test]
    fn already_canonical_is_untouched() {
        let src = "title: T\nversion: 1.0.0\ndoi: 10.5281/zenodo.1\nupdated: 2020-01-01\nai_assisted: none\nanchors: [a]\n";
        let r = run(src);
        assert!(r.corrections.is_empty(), "{:?}", r.corrections);
        assert!(!r.timestamp_bumped);
        assert_eq!(r.metadata, mapping(src));
        assert_eq!(r.body, "body\n");
    }

    #[test]
    fn reorders_and_keeps_unknown_keys_in_relative_order() {
        let r = run("zeta: 1\nanchors: [a]\nalpha: 2\ntitle: T\n");
        assert_eq!(
            key_order(&r.metadata),
            vec!["title", "updated", "anchors", "zeta", "alpha"]
        );
        assert_eq!(r.corrections[0], "Reordered metadata fields into canonical order.");
    }

    #[test]
    fn blank_lists_become_empty() {
        let r = run("dependencies: ''\nanchors:\n");
        assert_eq!(r.metadata.get("anchors"), Some(&Yaml::Sequence(vec![])));
        assert_eq!(r.metadata.get("dependencies"), Some(&Yaml::Sequence(vec![])));
    }

    #[test]
    fn doi_placeholder_rules() {
        let added = run("version: 0.2.0\n");
        assert_eq!(added.metadata.get("doi").and_then(Yaml::as_str), Some("TBD-0.2.0"));

        let stale = run("version: 0.2.0\ndoi: TBD-0.1.0\n");
        assert_eq!(stale.metadata.get("doi").and_then(Yaml::as_str), Some("TBD-0.2.0"));

        let released = run("version: 0.2.0\ndoi: 10.5281/zenodo.99\n");
        assert!(released.corrections.is_empty());

        let current = run("version: 0.2.0\ndoi: TBD-0.2.0\n");
        assert!(current.corrections.is_empty());
    }

    #[test]
    fn updated_already_today_is_not_a_bump() {
        let r = run("updated: 2026-03-15\nversion: 1.0.0\n");
        assert!(r.changed());
        assert!(!r.timestamp_bumped);
    }

    #[test]
    fn second_pass_is_a_fixed_point() {
        let first = run("anchors:\nai_assisted: extensive\nversion: 2.0.0\ntitle: T\nextra: x\n");
        let second = normalize(&first.metadata, &first.body, &clock(), &PolicyConfig::default());
        assert!(second.corrections.is_empty(), "{:?}", second.corrections);
        assert_eq!(second.metadata, first.metadata);
    }

    fn arb_value() -> impl Strategy<Value = Yaml> {
        prop_oneof![
            Just(Yaml::Null),
            Just(Yaml::String(String::new())),
            "[a-z0-9. ]{0,8}".prop_map(Yaml::String),
            any::<i32>().prop_map(Yaml::from),
            Just(Yaml::Sequence(vec![Yaml::from("a")])),
        ]
    }

    fn arb_key() -> impl Strategy<Value = String> {
        prop_oneof![
            proptest::sample::select(
                crate::config::DEFAULT_CANONICAL_ORDER
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
            ),
            "[a-z]{1,6}",
        ]
    }

    fn arb_mapping() -> impl Strategy<Value = Mapping> {
        let ai = prop_oneof![
            Just(None),
            Just(Some("none")),
            Just(Some("partial")),
            Just(Some("extensive")),
        ];
        (proptest::collection::vec((arb_key(), arb_value()), 0..12), ai).prop_map(|(entries, ai)| {
            let mut m = Mapping::new();
            for (k, v) in entries {
                if k != "ai_assisted" {
                    m.insert(Yaml::String(k), v);
                }
            }
            if let Some(level) = ai {
                m.insert(Yaml::from("ai_assisted"), Yaml::from(level));
            }
            m
        })
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(m in arb_mapping()) {
            let config = PolicyConfig::default();
            let once = normalize(&m, "", &clock(), &config);
            let twice = normalize(&once.metadata, "", &clock(), &config);
            prop_assert_eq!(&twice.metadata, &once.metadata);
            prop_assert!(twice.corrections.is_empty());
        }
    }
}
