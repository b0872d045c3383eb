//! # Schema Resolution
//!
//! Turns a schema reference into a parsed JSON Schema plus the identity
//! recorded in diagnostic provenance.
//!
//! Local files and inline values are supported. Remote URLs are rejected:
//! Stamp never performs network I/O.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::validate::SchemaError;

/// Identifier used for inline schemas without `$id`.
pub const INLINE_IDENTIFIER: &str = "inline-schema";

/// A schema reference as given by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// A JSON file on disk.
    File(PathBuf),
    /// An already-parsed schema.
    Inline(Value),
    /// An `http://` or `https://` URL. Always rejected.
    Url(String),
}

impl SchemaSource {
    /// Classify a command-line argument as a file path or a URL.
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::Url(arg.to_string())
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// Where a resolved schema came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOrigin {
    /// Loaded from the given file.
    Local(PathBuf),
    /// Supplied inline.
    Inline,
}

impl SchemaOrigin {
    /// `local` or `inline`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Inline => "inline",
        }
    }
}

/// A parsed schema with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    /// Where the schema was loaded from.
    pub origin: SchemaOrigin,
    /// `$id` when present, else the file name (or `inline-schema`).
    pub identifier: String,
    /// The schema's `$id`, if it declares one.
    pub uri: Option<String>,
    /// The schema document.
    pub schema: Value,
    /// Other `*.schema.json` files found next to a local schema, keyed by
    /// file name. Used to satisfy cross-file `$ref`s without the network.
    pub companions: BTreeMap<String, Value>,
}

impl ResolvedSchema {
    /// Wrap an inline schema value.
    pub fn inline(schema: Value) -> Self {
        let uri = declared_id(&schema);
        Self {
            origin: SchemaOrigin::Inline,
            identifier: uri.clone().unwrap_or_else(|| INLINE_IDENTIFIER.to_string()),
            uri,
            schema,
            companions: BTreeMap::new(),
        }
    }
}

/// Resolve a schema reference.
///
/// # Errors
///
/// - `SchemaError::Load` if the file cannot be read or is not JSON.
/// - `SchemaError::RemoteNotSupported` for URL sources.
pub fn resolve_schema(source: SchemaSource) -> Result<ResolvedSchema, SchemaError> {
    match source {
        SchemaSource::Inline(schema) => Ok(ResolvedSchema::inline(schema)),
        SchemaSource::Url(url) => Err(SchemaError::RemoteNotSupported { url }),
        SchemaSource::File(path) => resolve_file(&path),
    }
}

fn resolve_file(path: &Path) -> Result<ResolvedSchema, SchemaError> {
    let schema = read_json(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let uri = declared_id(&schema);
    let identifier = uri.clone().unwrap_or_else(|| file_name.clone());

    let mut companions = BTreeMap::new();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let p = entry.path();
                let Some(name) = p.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if name == file_name || !name.ends_with(".schema.json") {
                    continue;
                }
                match read_json(&p) {
                    Ok(v) => {
                        companions.insert(name.to_string(), v);
                    }
                    Err(e) => tracing::debug!(file = %p.display(), error = %e, "skipping companion schema"),
                }
            }
        }
    }

    tracing::debug!(schema = %identifier, companions = companions.len(), "resolved local schema");

    Ok(ResolvedSchema {
        origin: SchemaOrigin::Local(path.to_path_buf()),
        identifier,
        uri,
        schema,
        companions,
    })
}

fn read_json(path: &Path) -> Result<Value, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|e| SchemaError::Load {
        schema_name: path.display().to_string(),
        reason: format!("cannot read file: {e}"),
    })?;
    serde_json::from_str(&text).map_err(|e| SchemaError::Load {
        schema_name: path.display().to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

fn declared_id(schema: &Value) -> Option<String> {
    schema.get("$id").and_then(Value::as_str).map(str::to_string)
}
