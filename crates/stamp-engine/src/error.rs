//! Operational errors raised by the engine.
//!
//! Anything wrong with a *document* is a finding, never one of these. An
//! `EngineError` means the batch itself could not proceed or its output
//! could not be persisted.

use thiserror::Error;

use stamp_policy::ConfigError;
use stamp_schema::SchemaError;

/// Engine-level failure.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Filesystem access failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A discovery root does not exist.
    #[error("path does not exist: {0}")]
    MissingRoot(String),

    /// Schema resolution or compilation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Policy configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Normalized metadata could not be serialized back to YAML.
    #[error("failed to render metadata: {0}")]
    Render(#[from] serde_yaml::Error),

    /// A report or trace could not be serialized.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
