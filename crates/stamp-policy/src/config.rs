//! # Policy Configuration
//!
//! Tunables for classification, normalization and discovery. Loaded from a
//! YAML file; every field has a default so an empty file (or no file) gives
//! the standard ARI policy.
//!
//! ```yaml
//! stamp_version: 0.1.0
//! type_mismatch: fatal
//! far_future_sentinel: 2100-01-01
//! governed_suffixes: [".md"]
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical ARI key order.
pub const DEFAULT_CANONICAL_ORDER: [&str; 17] = [
    "title",
    "filetype",
    "type",
    "domain",
    "version",
    "doi",
    "status",
    "created",
    "updated",
    "author",
    "maintainer",
    "license",
    "copyright",
    "ai_assisted",
    "ai_assistance_details",
    "dependencies",
    "anchors",
];

/// Directories never descended into during discovery.
pub const DEFAULT_EXCLUDED_DIRS: [&str; 6] = [
    ".git",
    "__pycache__",
    ".venv",
    "node_modules",
    "archive",
    "target",
];

/// Error loading a policy file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read policy config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid policy YAML.
    #[error("invalid policy config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A field parsed but holds an unusable value.
    #[error("invalid policy config: {0}")]
    Invalid(String),
}

/// How `type` keyword violations are tiered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeMismatchPolicy {
    /// Coercible; the document can be repaired.
    #[default]
    Repairable,
    /// Blocking.
    Fatal,
}

/// Governance policy tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Version string recorded in diagnostic provenance and traces.
    pub stamp_version: String,
    /// Engine name recorded in diagnostic provenance.
    pub validator_engine: String,
    /// Key order the normalizer enforces.
    pub canonical_order: Vec<String>,
    /// File suffixes that are governed documents (and valid dependency
    /// targets). Compared case-insensitively.
    pub governed_suffixes: Vec<String>,
    /// `updated` dates after this raise a warning.
    pub far_future_sentinel: NaiveDate,
    /// Tier for `type` violations.
    pub type_mismatch: TypeMismatchPolicy,
    /// Text inserted when an AI-assisted document lacks details.
    pub ai_details_placeholder: String,
    /// Directory names skipped by discovery.
    pub excluded_dirs: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            stamp_version: env!("CARGO_PKG_VERSION").to_string(),
            validator_engine: stamp_schema::ENGINE_NAME.to_string(),
            canonical_order: DEFAULT_CANONICAL_ORDER.iter().map(|s| s.to_string()).collect(),
            governed_suffixes: vec![".md".to_string()],
            far_future_sentinel: NaiveDate::from_ymd_opt(2100, 1, 1).unwrap_or(NaiveDate::MAX),
            type_mismatch: TypeMismatchPolicy::Repairable,
            ai_details_placeholder: "AI-assisted normalization performed by Stamp.".to_string(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PolicyConfig {
    /// Parse policy YAML. An empty document yields the defaults.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?
        };
        config.check()?;
        Ok(config)
    }

    /// Load policy YAML from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&text, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), "loaded policy config");
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.governed_suffixes.is_empty() {
            return Err(ConfigError::Invalid(
                "governed_suffixes must list at least one suffix".to_string(),
            ));
        }
        if let Some(bad) = self.governed_suffixes.iter().find(|s| !s.starts_with('.')) {
            return Err(ConfigError::Invalid(format!(
                "governed suffix {bad:?} must start with '.'"
            )));
        }
        // A blank placeholder reads as missing details on the next run.
        if self.ai_details_placeholder.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ai_details_placeholder must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// True if `name` ends with a governed suffix (case-insensitive).
    pub fn is_governed(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.governed_suffixes
            .iter()
            .any(|s| lower.ends_with(&s.to_lowercase()))
    }

    /// True if discovery should skip a directory with this name.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }
}
