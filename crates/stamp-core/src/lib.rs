//! # stamp-core — Foundational Types for Stamp
//!
//! Leaf crate of the Stamp workspace. It holds the primitives every other
//! crate relies on to keep governance output deterministic:
//!
//! 1. **Canonical JSON.** Every value that takes part in an identifier
//!    (fix proposal ids) or a sort key (the diagnostic tie-break) is rendered
//!    by `canonical_json()`, which emits RFC 8785 (JCS) JSON. Identifiers are
//!    the SHA-256 of that material via `text_digest()`.
//!
//! 2. **`Clock` injection.** Nothing in the core reads ambient time. The
//!    normalizer and the diagnostic translator receive a `Clock` (or a
//!    timestamp sampled from one), so runs under `FixedClock` are exactly
//!    reproducible.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with a `Z` suffix and
//!    seconds precision.
//!
//! 4. **JSON Pointer helpers.** RFC 6901 escaping lives in one place so the
//!    translator, the proposal builder and the fix applier agree on paths.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `stamp-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod pointer;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::canonical_json;
pub use digest::{text_digest, ContentDigest, DigestAlgorithm};
pub use error::StampError;
pub use pointer::{escape_segment, parse_pointer, to_pointer, unescape_segment};
pub use temporal::{parse_date, Clock, FixedClock, SystemClock, Timestamp};
