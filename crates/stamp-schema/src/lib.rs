//! # stamp-schema — Schema Resolution, Validation & Diagnostic Translation
//!
//! Everything between a JSON Schema and a sorted list of Canonical
//! Diagnostic Objects.
//!
//! ## Schema Resolution (`resolve`)
//!
//! [`resolve_schema`] loads a schema from a local file or accepts an inline
//! JSON value, and derives its identifier from `$id` (falling back to the
//! file name). Remote URLs are rejected: Stamp never touches the network.
//!
//! ## Validation Engine (`validate`)
//!
//! [`SchemaEngine`] wraps the `jsonschema` crate (Draft 2020-12) behind the
//! [`ValidationEngine`] trait and reduces its errors to [`RawError`] records:
//! keyword, unescaped instance/schema path segments, message, the schema
//! value that was violated, and the offending instance. Errors that bundle
//! several properties (`additionalProperties`) are split so each raw error
//! names exactly one property.
//!
//! ## Diagnostic Translation (`translate`)
//!
//! [`DiagnosticTranslator`] maps each raw error to one [`Cdo`] through a
//! fixed keyword table, and [`DiagnosticTranslator::translate_all`] returns
//! them totally ordered by `(instance_path, schema_keyword, id)`.
//!
//! ## Crate Policy
//!
//! - Depends only on `stamp-core` internally.
//! - Translation is pure: the only non-input data in a CDO is the
//!   provenance block, sampled once from an injected clock.
//! - Offending field names are computed from schema and instance data,
//!   never parsed out of engine message text.

pub mod cdo;
pub mod resolve;
pub mod translate;
pub mod validate;

pub use cdo::{sort_diagnostics, Cdo, FixCapability, FixStrategy, Provenance, RawError, Severity};
pub use resolve::{resolve_schema, ResolvedSchema, SchemaOrigin, SchemaSource};
pub use translate::{
    DiagnosticTranslator, Keyword, INTERNAL_ERROR_ID, INTERNAL_KEYWORD, KEYWORD_TABLE,
};
pub use validate::{
    yaml_to_json_value, SchemaEngine, SchemaError, ValidationEngine, ENGINE_NAME,
};
