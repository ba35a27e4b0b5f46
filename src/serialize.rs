//! JSON helpers for turning framework payloads into decision context

use serde::Serialize;
use serde_json::Value;

/// Convert any serializable value to JSON, falling back to null
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("Failed to serialize payload: {}", e);
            Value::Null
        }
    }
}

/// First `max` characters of `s`
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Clip strings to `max` characters and arrays to `max` elements
pub fn clip_value(value: Value, max: usize) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_chars(&s, max)),
        Value::Array(mut items) => {
            items.truncate(max);
            Value::Array(items)
        }
        other => other,
    }
}

/// Human-readable rendering: strings verbatim, everything else compact JSON
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_clip_value() {
        assert_eq!(clip_value(json!("abcdef"), 3), json!("abc"));
        assert_eq!(clip_value(json!([1, 2, 3, 4]), 2), json!([1, 2]));
        assert_eq!(clip_value(json!({"k": "abcdef"}), 3), json!({"k": "abcdef"}));
        assert_eq!(clip_value(json!(42), 1), json!(42));
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&json!("plain")), "plain");
        assert_eq!(render(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(render(&Value::Null), "null");
    }

    #[test]
    fn test_to_json() {
        #[derive(Serialize)]
        struct Args {
            query: &'static str,
        }
        assert_eq!(to_json(&Args { query: "rust" }), json!({"query": "rust"}));
    }
}
