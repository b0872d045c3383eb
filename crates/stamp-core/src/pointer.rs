//! # JSON Pointer (RFC 6901)
//!
//! Diagnostics address fields by JSON Pointer. The empty string is the
//! document root; every other pointer is `/`-prefixed with `~` escaped as
//! `~0` and `/` escaped as `~1`.

use crate::error::StampError;

/// Escape one reference token.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Unescape one reference token. `~1` is decoded before `~0` so that
/// `~01` round-trips to `~1`.
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Join unescaped segments into a pointer. No segments yields `""`.
pub fn to_pointer<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", escape_segment(s.as_ref())))
        .collect()
}

/// Split a pointer into unescaped segments.
///
/// # Errors
///
/// Returns `StampError::InvalidPointer` for a non-empty pointer that does
/// not start with `/`.
pub fn parse_pointer(pointer: &str) -> Result<Vec<String>, StampError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer
        .strip_prefix('/')
        .ok_or_else(|| StampError::InvalidPointer {
            pointer: pointer.to_string(),
            reason: "pointer must be empty or start with '/'".to_string(),
        })?;
    Ok(rest.split('/').map(unescape_segment).collect())
}
