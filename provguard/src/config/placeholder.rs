//! Placeholder detection for configuration templates.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// A value wrapped in angle brackets, e.g. `<PLACEHOLDER>` or `<path/to/data>`.
#[allow(clippy::expect_used)]
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<[^<>]*>\s*$").expect("placeholder pattern is valid"));

/// Returns true if the string is an unresolved template placeholder.
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER.is_match(value)
}

/// Returns true if the value (or any string nested inside it) is a placeholder.
#[must_use]
pub fn contains_placeholder(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => is_placeholder(s),
        serde_json::Value::Array(items) => items.iter().any(contains_placeholder),
        serde_json::Value::Object(map) => map.values().any(contains_placeholder),
        _ => false,
    }
}

/// Collects the keys whose values are still placeholders, in key order.
#[must_use]
pub fn placeholder_keys(values: &BTreeMap<String, serde_json::Value>) -> Vec<String> {
    values
        .iter()
        .filter(|(_, v)| contains_placeholder(v))
        .map(|(k, _)| k.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_placeholder() {
        assert!(is_placeholder("<PLACEHOLDER>"));
        assert!(is_placeholder("<path/to/data>"));
        assert!(is_placeholder("  <SET ME>  "));
        assert!(is_placeholder("<>"));
    }

    #[test]
    fn test_is_not_placeholder() {
        assert!(!is_placeholder("/data/study"));
        assert!(!is_placeholder("a <b> c"));
        assert!(!is_placeholder("<<nested>>"));
        assert!(!is_placeholder("x < y"));
        assert!(!is_placeholder(""));
    }

    #[test]
    fn test_contains_placeholder_in_arrays() {
        let value = serde_json::json!(["ok", "<FILL>"]);
        assert!(contains_placeholder(&value));
        assert!(!contains_placeholder(&serde_json::json!([1, 2, 3])));
        assert!(!contains_placeholder(&serde_json::json!(true)));
    }

    #[test]
    fn test_placeholder_keys_sorted() {
        let mut values = BTreeMap::new();
        values.insert("env_path".to_string(), serde_json::json!("<ENV>"));
        values.insert("data_path".to_string(), serde_json::json!("<DATA>"));
        values.insert("log_level".to_string(), serde_json::json!("info"));

        assert_eq!(placeholder_keys(&values), vec!["data_path", "env_path"]);
    }
}
