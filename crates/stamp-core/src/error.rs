//! # Error Types
//!
//! Operational errors shared by the Stamp crates. Governance findings
//! (missing fields, cycles, loader failures) are never errors: they are
//! diagnostics. The types here cover the remaining failures where the tool
//! itself cannot proceed.

use thiserror::Error;

/// Top-level error type for foundational operations.
#[derive(Error, Debug)]
pub enum StampError {
    /// A timestamp or calendar date could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A JSON Pointer string was malformed.
    #[error("invalid JSON pointer {pointer:?}: {reason}")]
    InvalidPointer {
        /// The offending pointer text.
        pointer: String,
        /// Why it was rejected.
        reason: String,
    },
}
