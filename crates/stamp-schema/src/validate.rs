//! # Validation Engine Adapter
//!
//! Runs JSON Schema validation (Draft 2020-12) through the `jsonschema`
//! crate and reduces every error to a [`RawError`].
//!
//! ## Engine Contract
//!
//! The engine is a black box behind [`ValidationEngine`]. The adapter
//! supplies, for each violation, the data the translator needs to name the
//! offending field without reading message text:
//!
//! - the keyword, taken from the last non-index segment of the schema path;
//! - unescaped instance and schema path segments;
//! - the violated schema value and its enclosing schema object, looked up
//!   by walking the schema path from the root and following every `$ref`
//!   segment into its target (local fragment or companion document);
//! - the single property concerned, for `required` and
//!   `additionalProperties`. An `additionalProperties` error listing several
//!   unexpected keys becomes one raw error per key.
//!
//! ## Schema Resolution
//!
//! `$ref`s are resolved from the schema itself and its local companions
//! (see [`ResolvedSchema::companions`]). Any other URI fails the build, so
//! validation never reaches the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Retrieve, Uri, ValidationError, ValidationOptions, Validator};
use serde_json::Value;
use thiserror::Error;

use stamp_core::{canonical_json, parse_pointer};

use crate::cdo::RawError;
use crate::resolve::ResolvedSchema;

/// Name recorded as `provenance.validator_engine`.
pub const ENGINE_NAME: &str = "jsonschema";

/// Meta-schema host. References here are answered with a permissive schema.
const META_SCHEMA_HOST: &str = "json-schema.org";

/// Error raised while resolving, compiling or preparing input for a schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema file could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    Load {
        /// Schema file or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The schema could not be compiled (invalid schema or unresolved `$ref`).
    #[error("validator build error for schema '{schema_name}': {reason}")]
    Build {
        /// Schema identifier.
        schema_name: String,
        /// Reason reported by the engine.
        reason: String,
    },

    /// A remote schema URL was given.
    #[error("remote schema sources are not supported: {url}")]
    RemoteNotSupported {
        /// The rejected URL.
        url: String,
    },

    /// Metadata could not be represented as JSON.
    #[error("YAML-to-JSON conversion failed: {0}")]
    Conversion(String),
}

/// A JSON Schema validation engine.
pub trait ValidationEngine: Send + Sync {
    /// Engine name for diagnostic provenance.
    fn name(&self) -> &str;

    /// Validate `instance`, returning every violation found.
    ///
    /// An empty vector means the instance conforms. Order is not
    /// significant; the translator sorts.
    fn validate(&self, instance: &Value, schema: &ResolvedSchema) -> Result<Vec<RawError>, SchemaError>;
}

/// Local retriever that resolves `$ref` URIs to schemas held in memory.
struct LocalSchemaRetriever {
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(&self, uri: &Uri<&str>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        if let Some(value) = self.schemas_by_uri.get(filename) {
            return Ok(value.clone());
        }

        if uri_str.contains(META_SCHEMA_HOST) {
            return Ok(serde_json::json!({}));
        }

        Err(format!("unresolvable schema reference (network access disabled): {uri_str}").into())
    }
}

/// The `jsonschema`-backed engine.
///
/// Compiled validators are cached per distinct schema document, so a batch
/// compiles its schema once.
#[derive(Default)]
pub struct SchemaEngine {
    cache: Mutex<HashMap<String, Arc<Validator>>>,
}

impl std::fmt::Debug for SchemaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaEngine").finish_non_exhaustive()
    }
}

impl SchemaEngine {
    /// A new engine with an empty validator cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn build_options(schema: &ResolvedSchema) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        opts.should_validate_formats(true);

        let mut schemas_by_uri: HashMap<String, Value> = HashMap::new();
        for (filename, value) in &schema.companions {
            if let Some(id) = value.get("$id").and_then(Value::as_str) {
                schemas_by_uri.insert(id.to_string(), value.clone());
            }
            schemas_by_uri.insert(filename.clone(), value.clone());
        }
        opts.with_retriever(LocalSchemaRetriever { schemas_by_uri });

        opts
    }

    /// Compile (or fetch from cache) the validator for `schema`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Build` if the engine rejects the schema.
    pub fn build_validator(&self, schema: &ResolvedSchema) -> Result<Arc<Validator>, SchemaError> {
        let key = canonical_json(&schema.schema);
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(v) = cache.get(&key) {
            return Ok(Arc::clone(v));
        }

        let validator = Self::build_options(schema)
            .build(&schema.schema)
            .map_err(|e| SchemaError::Build {
                schema_name: schema.identifier.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(schema = %schema.identifier, "compiled validator");

        let validator = Arc::new(validator);
        cache.insert(key, Arc::clone(&validator));
        Ok(validator)
    }
}

impl ValidationEngine for SchemaEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn validate(&self, instance: &Value, schema: &ResolvedSchema) -> Result<Vec<RawError>, SchemaError> {
        let validator = self.build_validator(schema)?;
        let raw: Vec<RawError> = validator
            .iter_errors(instance)
            .flat_map(|e| to_raw_errors(schema, e))
            .collect();
        Ok(raw)
    }
}

/// Reduce one engine error to raw errors.
fn to_raw_errors(schema: &ResolvedSchema, error: ValidationError<'_>) -> Vec<RawError> {
    let message = error.to_string();
    let schema_pointer = error.schema_path.to_string();
    let instance_path = parse_pointer(&error.instance_path.to_string()).unwrap_or_default();
    let schema_path = parse_pointer(&schema_pointer).unwrap_or_default();

    let keyword = schema_path
        .iter()
        .rev()
        .find(|s| !s.chars().all(|c| c.is_ascii_digit()))
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    let expected_value = schema_at(schema, &schema_path).cloned();
    let parent_schema = schema_path
        .split_last()
        .and_then(|(_, parent)| schema_at(schema, parent))
        .cloned();

    let properties: Vec<Option<String>> = match &error.kind {
        ValidationErrorKind::Required { property } => {
            vec![property.as_str().map(str::to_string)]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } if !unexpected.is_empty() => {
            unexpected.iter().cloned().map(Some).collect()
        }
        _ => vec![None],
    };

    let actual_instance = error.instance.into_owned();

    properties
        .into_iter()
        .map(|property| RawError {
            keyword: keyword.clone(),
            instance_path: instance_path.clone(),
            schema_path: schema_path.clone(),
            message: message.clone(),
            expected_value: expected_value.clone(),
            actual_instance: actual_instance.clone(),
            parent_schema: parent_schema.clone(),
            property,
        })
        .collect()
}

/// Follow schema path `segments` from the root schema.
///
/// A `$ref` segment continues inside the referenced schema: a bare fragment
/// resolves against the current document, anything else against the root
/// (by `$id`) or a companion (by `$id` or file name).
fn schema_at<'a>(schema: &'a ResolvedSchema, segments: &[String]) -> Option<&'a Value> {
    let mut document = &schema.schema;
    let mut node = document;
    for segment in segments {
        if segment == "$ref" {
            let reference = node.get("$ref")?.as_str()?;
            let (target, fragment) = reference.split_once('#').unwrap_or((reference, ""));
            if !target.is_empty() {
                document = referenced_document(schema, target)?;
            }
            node = document.pointer(fragment)?;
            continue;
        }
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

fn referenced_document<'a>(schema: &'a ResolvedSchema, target: &str) -> Option<&'a Value> {
    if schema.uri.as_deref() == Some(target) {
        return Some(&schema.schema);
    }
    let by_id = schema
        .companions
        .values()
        .find(|v| v.get("$id").and_then(Value::as_str) == Some(target));
    by_id.or_else(|| {
        let filename = target.rsplit('/').next().unwrap_or(target);
        schema.companions.get(filename)
    })
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Non-string mapping keys are stringified. YAML tags are dropped and the
/// inner value converted.
///
/// # Errors
///
/// Returns `SchemaError::Conversion` for non-finite floats and composite
/// mapping keys.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, SchemaError> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| SchemaError::Conversion(format!("cannot represent float {f} in JSON")))
            } else {
                Err(SchemaError::Conversion(format!("unsupported YAML number: {n:?}")))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, SchemaError> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Null => "null".to_string(),
                    other => {
                        return Err(SchemaError::Conversion(format!(
                            "unsupported YAML map key type: {other:?}"
                        )))
                    }
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> ResolvedSchema {
        ResolvedSchema::inline(value)
    }

    fn closed_object() -> ResolvedSchema {
        schema(json!({
            "type": "object",
            "required": ["title", "status"],
            "properties": {
                "title": {"type": "string", "minLength": 1},
                "status": {"enum": ["Draft", "Final"]},
                "created": {"type": "string", "format": "date"},
                "nested": {
                    "type": "object",
                    "properties": {"a/b": {"type": "integer"}}
                }
            },
            "additionalProperties": false
        }))
    }

    #[test]
    fn conforming_instance_has_no_errors() {
        let engine = SchemaEngine::new();
        let raw = engine
            .validate(&json!({"title": "T", "status": "Draft"}), &closed_object())
            .unwrap();
        assert!(raw.is_empty(), "{raw:?}");
    }

    #[test]
    fn required_errors_isolate_each_property() {
        let engine = SchemaEngine::new();
        let raw = engine.validate(&json!({}), &closed_object()).unwrap();
        let mut props: Vec<_> = raw
            .iter()
            .filter(|r| r.keyword == "required")
            .filter_map(|r| r.property.clone())
            .collect();
        props.sort();
        assert_eq!(props, vec!["status".to_string(), "title".to_string()]);
        let first = raw.iter().find(|r| r.keyword == "required").unwrap();
        assert!(first.instance_path.is_empty());
        assert_eq!(first.expected_value, Some(json!(["title", "status"])));
    }

    #[test]
    fn additional_properties_exploded_per_key() {
        let engine = SchemaEngine::new();
        let raw = engine
            .validate(
                &json!({"title": "T", "status": "Draft", "x": 1, "y": 2}),
                &closed_object(),
            )
            .unwrap();
        let mut props: Vec<_> = raw
            .iter()
            .filter(|r| r.keyword == "additionalProperties")
            .filter_map(|r| r.property.clone())
            .collect();
        props.sort();
        assert_eq!(props, vec!["x".to_string(), "y".to_string()]);
        let parent = raw[0].parent_schema.as_ref().unwrap();
        assert!(parent.get("properties").is_some());
    }

    #[test]
    fn enum_error_carries_allowed_values_and_path() {
        let engine = SchemaEngine::new();
        let raw = engine
            .validate(&json!({"title": "T", "status": "draft"}), &closed_object())
            .unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].keyword, "enum");
        assert_eq!(raw[0].instance_path, vec!["status".to_string()]);
        assert_eq!(raw[0].expected_value, Some(json!(["Draft", "Final"])));
        assert_eq!(raw[0].actual_instance, json!("draft"));
    }

    #[test]
    fn constraints_behind_ref_keep_their_values() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "status": {"$ref": "#/$defs/status"},
                "name": {"$ref": "#/$defs/name"}
            },
            "$defs": {
                "status": {"enum": ["Draft", "Final"]},
                "name": {"type": "string", "minLength": 3}
            }
        }));
        let raw = SchemaEngine::new()
            .validate(&json!({"status": "draft", "name": "a"}), &s)
            .unwrap();

        let status = raw.iter().find(|r| r.keyword == "enum").unwrap();
        assert_eq!(status.expected_value, Some(json!(["Draft", "Final"])));
        assert_eq!(status.parent_schema, Some(json!({"enum": ["Draft", "Final"]})));

        let name = raw.iter().find(|r| r.keyword == "minLength").unwrap();
        assert_eq!(name.expected_value, Some(json!(3)));
        assert_eq!(name.parent_schema.as_ref().and_then(|p| p.get("type")), Some(&json!("string")));
    }

    #[test]
    fn schema_walk_follows_companion_refs() {
        let mut s = schema(json!({"properties": {"party": {"$ref": "party.schema.json#/$defs/party"}}}));
        s.companions.insert(
            "party.schema.json".to_string(),
            json!({"$defs": {"party": {"required": ["name"]}}}),
        );
        let path: Vec<String> = ["properties", "party", "$ref", "required"]
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(schema_at(&s, &path), Some(&json!(["name"])));
        assert_eq!(schema_at(&s, &path[..2]), s.schema.pointer("/properties/party"));
    }

    #[test]
    fn format_is_asserted() {
        let engine = SchemaEngine::new();
        let raw = engine
            .validate(
                &json!({"title": "T", "status": "Draft", "created": "yesterday"}),
                &closed_object(),
            )
            .unwrap();
        assert!(raw.iter().any(|r| r.keyword == "format"), "{raw:?}");
    }

    #[test]
    fn instance_path_segments_are_unescaped() {
        let engine = SchemaEngine::new();
        let raw = engine
            .validate(
                &json!({"title": "T", "status": "Draft", "nested": {"a/b": "nope"}}),
                &closed_object(),
            )
            .unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].keyword, "type");
        assert_eq!(raw[0].instance_path, vec!["nested".to_string(), "a/b".to_string()]);
    }

    #[test]
    fn conditional_branch_prefix_preserved() {
        let s = schema(json!({
            "type": "object",
            "if": {"properties": {"kind": {"const": "x"}}, "required": ["kind"]},
            "then": {"required": ["detail"]}
        }));
        let engine = SchemaEngine::new();
        let raw = engine.validate(&json!({"kind": "x"}), &s).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].schema_path, vec!["then".to_string(), "required".to_string()]);
        assert_eq!(raw[0].property.as_deref(), Some("detail"));
    }

    #[test]
    fn validator_cache_reuses_compiled_schema() {
        let engine = SchemaEngine::new();
        let s = closed_object();
        let a = engine.build_validator(&s).unwrap();
        let b = engine.build_validator(&s).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unresolvable_remote_ref_fails_build() {
        let s = schema(json!({"$ref": "https://example.invalid/remote.schema.json"}));
        let err = SchemaEngine::new().build_validator(&s).unwrap_err();
        assert!(matches!(err, SchemaError::Build { .. }), "{err}");
    }

    #[test]
    fn test_yaml_to_json_conversion() {
        let yaml_str = r#"
title: Example
version: "1.0.0"
count: 42
enabled: true
anchors:
  - one
  - two
"#;
        let yaml_value: serde_yaml::Value = serde_yaml::from_str(yaml_str).unwrap();
        let json_value = yaml_to_json_value(&yaml_value).unwrap();

        assert_eq!(json_value["title"], "Example");
        assert_eq!(json_value["version"], "1.0.0");
        assert_eq!(json_value["count"], 42);
        assert_eq!(json_value["enabled"], true);
        assert_eq!(json_value["anchors"][0], "one");
    }

    #[test]
    fn yaml_non_string_keys_are_stringified() {
        let yaml_value: serde_yaml::Value = serde_yaml::from_str("1: a\ntrue: b\n").unwrap();
        let json_value = yaml_to_json_value(&yaml_value).unwrap();
        assert_eq!(json_value["1"], "a");
        assert_eq!(json_value["true"], "b");
    }
}
