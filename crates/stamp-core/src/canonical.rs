//! # Canonical Serialization — JCS Text
//!
//! `canonical_json` is the sole rendering of JSON values that feed
//! identifiers and sort keys in Stamp (fix proposal ids, the diagnostic
//! tie-break key).
//!
//! ## Determinism Invariant
//!
//! Output goes through `serde_jcs` (RFC 8785): sorted object keys, compact
//! separators, ECMAScript number formatting. Two structurally equal values
//! always render identically regardless of the order their map entries were
//! inserted in, which keeps proposal ids stable when a metadata mapping is
//! re-read with a different key order.

use serde_json::Value;

/// Render a JSON value as canonical JSON text.
///
/// Falls back to `serde_json`'s compact rendering (also key-sorted) if JCS
/// serialization fails, which cannot happen for a well-formed `Value`.
pub fn canonical_json(value: &Value) -> String {
    serde_jcs::to_string(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_are_sorted() {
        let data = json!({"b": 2, "a": 1, "c": "hello"});
        assert_eq!(canonical_json(&data), r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn test_nested() {
        let data = json!({
            "outer": {"b": 2, "a": 1},
            "list": [3, 2, 1]
        });
        assert_eq!(canonical_json(&data), r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn test_null_and_string() {
        assert_eq!(canonical_json(&Value::Null), "null");
        assert_eq!(canonical_json(&json!("Draft")), "\"Draft\"");
    }

    #[test]
    fn test_floats_are_accepted() {
        // `version: 1.5` parses as a float and still takes part in ids.
        assert_eq!(canonical_json(&json!({"version": 1.5})), r#"{"version":1.5}"#);
    }

    #[test]
    fn test_insertion_order_is_irrelevant() {
        let mut forward = serde_json::Map::new();
        forward.insert("title".into(), json!("T"));
        forward.insert("status".into(), json!("Draft"));
        let mut reverse = serde_json::Map::new();
        reverse.insert("status".into(), json!("Draft"));
        reverse.insert("title".into(), json!("T"));
        assert_eq!(
            canonical_json(&Value::Object(forward)),
            canonical_json(&Value::Object(reverse))
        );
    }

    #[test]
    fn test_unicode_passthrough() {
        let data = json!({"name": "\u{00e9}\u{00e8}"});
        assert!(canonical_json(&data).contains('\u{00e9}'));
    }
}
