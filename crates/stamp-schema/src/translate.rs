//! # Diagnostic Translation
//!
//! Maps each [`RawError`] to exactly one [`Cdo`].
//!
//! Dispatch goes through [`KEYWORD_TABLE`], a fixed table from keyword name
//! to [`Keyword`]; each `Keyword` owns one pure handler. Keywords missing
//! from the table take the fallback handler, whose id is
//! `<keyword>.violation`.
//!
//! Handlers compute offending property names from schema and instance
//! data. Engine message text is never parsed.

use serde_json::{Map, Value};

use stamp_core::to_pointer;

use crate::cdo::{sort_diagnostics, Cdo, FixCapability, Provenance, RawError, Severity};

/// Keywords with a dedicated translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Required,
    AdditionalProperties,
    Enum,
    Type,
    Pattern,
    Format,
    Const,
    MinLength,
    MaxLength,
}

/// Keyword name to [`Keyword`].
pub const KEYWORD_TABLE: [(&str, Keyword); 9] = [
    ("required", Keyword::Required),
    ("additionalProperties", Keyword::AdditionalProperties),
    ("enum", Keyword::Enum),
    ("type", Keyword::Type),
    ("pattern", Keyword::Pattern),
    ("format", Keyword::Format),
    ("const", Keyword::Const),
    ("minLength", Keyword::MinLength),
    ("maxLength", Keyword::MaxLength),
];

/// Keyword-specific part of a CDO.
struct Translation {
    id: String,
    message: String,
    details: Map<String, Value>,
    fix: Option<FixCapability>,
    default_schema_path: Option<&'static str>,
}

impl Translation {
    fn new(id: impl Into<String>, message: impl Into<String>, details: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            details,
            fix: None,
            default_schema_path: None,
        }
    }
}

type Handler = fn(&RawError) -> Translation;

impl Keyword {
    /// Look up a keyword by name.
    pub fn lookup(name: &str) -> Option<Self> {
        KEYWORD_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, k)| *k)
    }

    /// The stable diagnostic id emitted for this keyword.
    pub fn diagnostic_id(self) -> &'static str {
        match self {
            Self::Required => "required.missing",
            Self::AdditionalProperties => "object.no_additional_properties",
            Self::Enum => "enum.invalid",
            Self::Type => "type.mismatch",
            Self::Pattern => "string.pattern_mismatch",
            Self::Format => "format.invalid",
            Self::Const => "const.mismatch",
            Self::MinLength | Self::MaxLength => "string.length_invalid",
        }
    }

    fn handler(self) -> Handler {
        match self {
            Self::Required => required,
            Self::AdditionalProperties => additional_properties,
            Self::Enum => enumeration,
            Self::Type => type_mismatch,
            Self::Pattern => pattern,
            Self::Format => format,
            Self::Const => constant,
            Self::MinLength | Self::MaxLength => length,
        }
    }
}

/// Id of the diagnostic synthesized for a processing failure.
pub const INTERNAL_ERROR_ID: &str = "internal.error";

/// `schema_keyword` of the diagnostic synthesized for a processing failure.
pub const INTERNAL_KEYWORD: &str = "internal";

/// Translates raw engine errors into CDOs carrying one provenance block.
#[derive(Debug, Clone)]
pub struct DiagnosticTranslator {
    provenance: Provenance,
}

impl DiagnosticTranslator {
    pub fn new(provenance: Provenance) -> Self {
        Self { provenance }
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Translate one raw error.
    pub fn translate(&self, raw: &RawError) -> Cdo {
        let t = match Keyword::lookup(&raw.keyword) {
            Some(k) => (k.handler())(raw),
            None => fallback(raw),
        };

        let schema_path = match (raw.schema_path.is_empty(), t.default_schema_path) {
            (true, Some(default)) => default.to_string(),
            _ => to_pointer(&raw.schema_path),
        };

        Cdo {
            id: t.id,
            severity: Severity::Error,
            schema_keyword: raw.keyword.clone(),
            instance_path: to_pointer(&raw.instance_path),
            schema_path,
            message: t.message,
            details: t.details,
            fix: t.fix,
            provenance: self.provenance.clone(),
        }
    }

    /// A fatal diagnostic for a document whose processing failed outside
    /// validation proper (an engine error or a panic).
    pub fn internal_error(&self, reason: &str) -> Cdo {
        Cdo {
            id: INTERNAL_ERROR_ID.to_string(),
            severity: Severity::Error,
            schema_keyword: INTERNAL_KEYWORD.to_string(),
            instance_path: String::new(),
            schema_path: String::new(),
            message: format!("Internal error while processing: {reason}"),
            details: details([("reason", Value::String(reason.to_string()))]),
            fix: None,
            provenance: self.provenance.clone(),
        }
    }

    /// Translate every raw error and return the CDOs in canonical order.
    /// Nothing is deduplicated.
    pub fn translate_all(&self, raws: &[RawError]) -> Vec<Cdo> {
        let mut cdos: Vec<Cdo> = raws.iter().map(|r| self.translate(r)).collect();
        sort_diagnostics(&mut cdos);
        cdos
    }
}

fn details<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn expected(raw: &RawError) -> Value {
    raw.expected_value.clone().unwrap_or(Value::Null)
}

/// JSON type name of a value. Integers report `number`.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn missing_property(raw: &RawError) -> String {
    if let Some(p) = &raw.property {
        return p.clone();
    }
    let present = raw.actual_instance.as_object();
    raw.expected_value
        .as_ref()
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|k| present.is_some_and(|o| !o.contains_key(*k)))
        .unwrap_or("unknown")
        .to_string()
}

fn matches_pattern(pattern: &str, key: &str) -> bool {
    jsonschema::validator_for(&serde_json::json!({ "pattern": pattern }))
        .map(|v| v.is_valid(&Value::String(key.to_string())))
        .unwrap_or(false)
}

fn unexpected_property(raw: &RawError) -> String {
    if let Some(p) = &raw.property {
        return p.clone();
    }
    let parent = raw.parent_schema.as_ref();
    let declared = parent.and_then(|p| p.get("properties")).and_then(Value::as_object);
    let patterns: Vec<&str> = parent
        .and_then(|p| p.get("patternProperties"))
        .and_then(Value::as_object)
        .map(|o| o.keys().map(String::as_str).collect())
        .unwrap_or_default();

    raw.actual_instance
        .as_object()
        .into_iter()
        .flat_map(|o| o.keys())
        .find(|k| {
            !declared.is_some_and(|d| d.contains_key(*k))
                && !patterns.iter().any(|p| matches_pattern(p, k))
        })
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

fn required(raw: &RawError) -> Translation {
    let missing = missing_property(raw);
    let mut t = Translation::new(
        Keyword::Required.diagnostic_id(),
        format!("Required property '{missing}' is missing."),
        details([("missing_property", Value::String(missing))]),
    );
    t.default_schema_path = Some("/required");
    t
}

fn additional_properties(raw: &RawError) -> Translation {
    let prop = unexpected_property(raw);
    let mut t = Translation::new(
        Keyword::AdditionalProperties.diagnostic_id(),
        format!("Property '{prop}' is not allowed."),
        details([("property", Value::String(prop.clone()))]),
    );
    t.fix = Some(FixCapability::prune(&prop));
    t.default_schema_path = Some("/additionalProperties");
    t
}

fn enumeration(raw: &RawError) -> Translation {
    let allowed = match &raw.expected_value {
        Some(Value::Array(a)) => Value::Array(a.clone()),
        _ => Value::Array(Vec::new()),
    };
    Translation::new(
        Keyword::Enum.diagnostic_id(),
        "Value is not allowed.",
        details([("allowed_values", allowed), ("value", raw.actual_instance.clone())]),
    )
}

fn type_mismatch(raw: &RawError) -> Translation {
    let expected_type = match &raw.expected_value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(a)) => a
            .first()
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        _ => "unknown".to_string(),
    };
    Translation::new(
        Keyword::Type.diagnostic_id(),
        "Value does not match the expected type.",
        details([
            ("expected_type", Value::String(expected_type)),
            ("actual_type", Value::String(type_name(&raw.actual_instance).to_string())),
            ("value", raw.actual_instance.clone()),
        ]),
    )
}

fn pattern(raw: &RawError) -> Translation {
    Translation::new(
        Keyword::Pattern.diagnostic_id(),
        "Value does not match required pattern.",
        details([("pattern", expected(raw)), ("value", raw.actual_instance.clone())]),
    )
}

fn format(raw: &RawError) -> Translation {
    let fmt = expected(raw);
    let name = fmt.as_str().unwrap_or("unknown").to_string();
    Translation::new(
        Keyword::Format.diagnostic_id(),
        format!("Value does not match required format '{name}'."),
        details([("format", fmt), ("value", raw.actual_instance.clone())]),
    )
}

fn constant(raw: &RawError) -> Translation {
    Translation::new(
        Keyword::Const.diagnostic_id(),
        "Value does not match required constant.",
        details([("allowed_value", expected(raw)), ("value", raw.actual_instance.clone())]),
    )
}

fn length(raw: &RawError) -> Translation {
    let comparator = if raw.keyword == "minLength" { "min" } else { "max" };
    let actual_length = raw
        .actual_instance
        .as_str()
        .map(|s| s.chars().count())
        .unwrap_or(0);
    Translation::new(
        Keyword::MinLength.diagnostic_id(),
        "String length is invalid.",
        details([
            ("limit", expected(raw)),
            ("actual_length", Value::from(actual_length)),
            ("comparator", Value::String(comparator.to_string())),
        ]),
    )
}

fn fallback(raw: &RawError) -> Translation {
    Translation::new(
        format!("{}.violation", raw.keyword),
        format!("Value violates the '{}' constraint.", raw.keyword),
        details([("validator_value", expected(raw)), ("value", raw.actual_instance.clone())]),
    )
}
