//! # Canonical Diagnostic Objects
//!
//! The stable, schema-agnostic record emitted for one validation violation,
//! and the raw engine error it is translated from.
//!
//! ## Wire Shape
//!
//! Field order and names are consumed by downstream tooling and must not
//! change:
//!
//! ```text
//! { id, severity, schema_keyword, instance_path, schema_path,
//!   message, details, fix, provenance }
//! ```
//!
//! `fix` is always present and serializes as `null` when no mechanical
//! repair is known.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stamp_core::{canonical_json, Clock, Timestamp};

/// Diagnostic severity. Translation only ever emits `Error`; `Warning` is
/// used by policy findings that are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocking violation.
    Error,
    /// Informational.
    Warning,
}

/// The mutation a fixable diagnostic supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixStrategy {
    /// Remove a key.
    Prune,
    /// Replace a value.
    Replace,
    /// Add a key.
    Add,
}

impl FixStrategy {
    /// Wire name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prune => "prune",
            Self::Replace => "replace",
            Self::Add => "add",
        }
    }
}

/// Machine-applicable repair attached to a CDO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixCapability {
    /// Whether the repair is safe without semantic judgement.
    pub fixable: bool,
    /// Kind of mutation.
    pub strategy: FixStrategy,
    /// Strategy-specific parameters (`{"key": ...}` for prune).
    pub parameters: Map<String, Value>,
}

impl FixCapability {
    /// A prune of `key` from the object at the diagnostic's instance path.
    pub fn prune(key: &str) -> Self {
        let mut parameters = Map::new();
        parameters.insert("key".to_string(), Value::String(key.to_string()));
        Self {
            fixable: true,
            strategy: FixStrategy::Prune,
            parameters,
        }
    }

    /// The `key` parameter, if present.
    pub fn key(&self) -> Option<&str> {
        self.parameters.get("key").and_then(Value::as_str)
    }
}

/// Where and when a diagnostic was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// When translation ran (UTC, seconds precision).
    pub timestamp: Timestamp,
    /// Version of the Stamp tool.
    pub stamp_version: String,
    /// Identifier or version of the governing schema; empty when unknown.
    pub schema_version: String,
    /// Name of the validation engine that produced the raw errors.
    pub validator_engine: String,
}

impl Provenance {
    /// Sample `clock` once and record the tool/schema/engine identity.
    pub fn new(
        clock: &dyn Clock,
        stamp_version: impl Into<String>,
        schema_version: impl Into<String>,
        validator_engine: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: clock.now(),
            stamp_version: stamp_version.into(),
            schema_version: schema_version.into(),
            validator_engine: validator_engine.into(),
        }
    }
}

/// Canonical Diagnostic Object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cdo {
    /// Stable semantic identifier, e.g. `required.missing`.
    pub id: String,
    /// Severity.
    pub severity: Severity,
    /// The violated JSON Schema keyword.
    pub schema_keyword: String,
    /// JSON Pointer into the instance; `""` is the root.
    pub instance_path: String,
    /// JSON Pointer into the schema.
    pub schema_path: String,
    /// Human-readable text.
    pub message: String,
    /// Keyword-specific structured data.
    pub details: Map<String, Value>,
    /// Mechanical repair, when one is proven safe.
    pub fix: Option<FixCapability>,
    /// Production metadata.
    pub provenance: Provenance,
}

impl Cdo {
    /// The ordering key `(instance_path, schema_keyword, id)`.
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.instance_path, &self.schema_keyword, &self.id)
    }

    /// Look up a string entry in `details`.
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }

    /// True when the attached fix is present and marked fixable.
    pub fn is_fixable(&self) -> bool {
        self.fix.as_ref().is_some_and(|f| f.fixable)
    }

    /// The same diagnostic with provenance stripped of its timestamp
    /// dependence, for comparing runs.
    pub fn without_timestamp(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(prov) = value.get_mut("provenance").and_then(Value::as_object_mut) {
            prov.remove("timestamp");
        }
        value
    }
}

/// Sort diagnostics into their canonical total order.
///
/// The primary key is `(instance_path, schema_keyword, id)`. Several raw
/// errors can share that key (two missing properties at the root), so ties
/// are broken by `schema_path`, then the canonical JSON of `details`, then
/// `message`. The result is independent of the order the engine produced
/// the errors in.
pub fn sort_diagnostics(diagnostics: &mut [Cdo]) {
    diagnostics.sort_by_cached_key(|d| {
        (
            d.instance_path.clone(),
            d.schema_keyword.clone(),
            d.id.clone(),
            d.schema_path.clone(),
            canonical_json(&Value::Object(d.details.clone())),
            d.message.clone(),
        )
    });
}

/// One violation as reported by the validation engine, before translation.
///
/// Paths are kept as unescaped segments; the translator applies JSON
/// Pointer escaping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawError {
    /// The violated keyword (`required`, `enum`, ...).
    pub keyword: String,
    /// Unescaped segments locating the offending instance.
    pub instance_path: Vec<String>,
    /// Unescaped segments locating the keyword in the schema, including
    /// any `if`/`then`/`allOf` branch prefix.
    pub schema_path: Vec<String>,
    /// Engine message. Informational only.
    pub message: String,
    /// The keyword's value in the schema (required list, enum options,
    /// pattern, ...), when it could be located.
    pub expected_value: Option<Value>,
    /// The instance value at `instance_path`.
    pub actual_instance: Value,
    /// The schema object that holds the keyword. Used to compute which
    /// properties an `additionalProperties` violation refers to.
    pub parent_schema: Option<Value>,
    /// The single property this error concerns, when the engine isolates
    /// one (`required`, `additionalProperties`).
    pub property: Option<String>,
}

impl RawError {
    /// A raw error with only the mandatory fields set.
    pub fn new(keyword: impl Into<String>, actual_instance: Value) -> Self {
        Self {
            keyword: keyword.into(),
            instance_path: Vec::new(),
            schema_path: Vec::new(),
            message: String::new(),
            expected_value: None,
            actual_instance,
            parent_schema: None,
            property: None,
        }
    }

    /// Set the instance path segments.
    pub fn at(mut self, segments: &[&str]) -> Self {
        self.instance_path = segments.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the schema path segments.
    pub fn schema_at(mut self, segments: &[&str]) -> Self {
        self.schema_path = segments.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the violated schema value.
    pub fn expecting(mut self, value: Value) -> Self {
        self.expected_value = Some(value);
        self
    }

    /// Set the enclosing schema object.
    pub fn within(mut self, parent: Value) -> Self {
        self.parent_schema = Some(parent);
        self
    }

    /// Set the isolated property name.
    pub fn for_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Set the engine message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}
