/// Expression token resolution
///
/// Node configuration values may reference prior node outputs with
/// `{{nodeId.path.path2}}` tokens. Resolution is a pure function over the
/// run's accumulated output map and never fails: an unresolvable token is
/// left in place as literal text.
///
/// Two modes:
/// - a config value that IS a token ("{{a.b}}") resolves to the stored value
///   with its native JSON type preserved
/// - a token embedded in a longer string ("x={{a.b}}") is replaced by the
///   value's string representation

use crate::runtime::coerce::display_string;
use serde_json::Value;
use std::collections::HashMap;

/// Recursively resolve expression tokens throughout a configuration value
///
/// Walks objects and arrays structurally so nested fields are all expanded
/// before node execution. Non-string leaves pass through untouched.
pub fn resolve(config: &Value, outputs: &HashMap<String, Value>) -> Value {
    match config {
        Value::String(raw) => resolve_string(raw, outputs),
        Value::Array(items) => Value::Array(items.iter().map(|item| resolve(item, outputs)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), resolve(value, outputs)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve a single string config value
fn resolve_string(raw: &str, outputs: &HashMap<String, Value>) -> Value {
    // Full match: the entire value is one token. The resolved value keeps its
    // native type (number, object, array, bool) instead of being stringified.
    if raw.len() > 4 && raw.starts_with("{{") && raw.ends_with("}}") {
        let path = &raw[2..raw.len() - 2];
        return match lookup(path, outputs) {
            Some(value) => value,
            None => Value::String(raw.to_string()),
        };
    }

    // Mixed string: replace each embedded token with its string form,
    // leaving unresolved tokens as literal text.
    let mut resolved = String::new();
    let mut rest = raw;
    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        resolved.push_str(&rest[..start]);
        match lookup(&after_open[..end], outputs) {
            Some(value) => resolved.push_str(&display_string(&value)),
            None => resolved.push_str(&rest[start..start + end + 4]),
        }
        rest = &after_open[end + 2..];
    }
    resolved.push_str(rest);
    Value::String(resolved)
}

/// Walk a dotted path against the output map
///
/// The first segment names a node; the remainder walks into its stored
/// output. Object keys and array indices are both valid segments. Any miss
/// returns None (the caller keeps the literal token).
fn lookup(path: &str, outputs: &HashMap<String, Value>) -> Option<Value> {
    let mut segments = path.split('.');
    let node_id = segments.next()?;
    let mut current = outputs.get(node_id)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs() -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert("a".to_string(), json!({ "b": 5, "flag": true }));
        map.insert("list".to_string(), json!({ "items": [10, 20, 30] }));
        map.insert("raw".to_string(), json!("plain"));
        map
    }

    #[test]
    fn full_match_preserves_native_type() {
        assert_eq!(resolve(&json!("{{a.b}}"), &outputs()), json!(5));
        assert_eq!(resolve(&json!("{{a.flag}}"), &outputs()), json!(true));
        assert_eq!(resolve(&json!("{{a}}"), &outputs()), json!({ "b": 5, "flag": true }));
    }

    #[test]
    fn mixed_match_stringifies() {
        assert_eq!(resolve(&json!("x={{a.b}}"), &outputs()), json!("x=5"));
        assert_eq!(
            resolve(&json!("{{a.b}} and {{a.flag}}!"), &outputs()),
            json!("5 and true!")
        );
    }

    #[test]
    fn brace_bounded_multi_token_string_is_one_full_match() {
        // A value that starts with {{ and ends with }} is treated as a single
        // token even when more tokens sit inside; the whole-string lookup
        // misses, so the literal survives.
        assert_eq!(
            resolve(&json!("{{a.b}} and {{a.flag}}"), &outputs()),
            json!("{{a.b}} and {{a.flag}}")
        );
    }

    #[test]
    fn unresolved_token_stays_literal() {
        assert_eq!(resolve(&json!("{{missing.b}}"), &outputs()), json!("{{missing.b}}"));
        assert_eq!(resolve(&json!("v={{a.nope}}"), &outputs()), json!("v={{a.nope}}"));
    }

    #[test]
    fn array_index_segments_walk() {
        assert_eq!(resolve(&json!("{{list.items.1}}"), &outputs()), json!(20));
        assert_eq!(resolve(&json!("{{list.items.9}}"), &outputs()), json!("{{list.items.9}}"));
    }

    #[test]
    fn path_into_scalar_misses() {
        assert_eq!(resolve(&json!("{{raw.deeper}}"), &outputs()), json!("{{raw.deeper}}"));
    }

    #[test]
    fn resolution_recurses_through_structures() {
        let config = json!({
            "url": "https://api.example.com/{{a.b}}",
            "fields": [{ "key": "n", "value": "{{a.b}}" }],
            "count": 7
        });
        let resolved = resolve(&config, &outputs());
        assert_eq!(resolved["url"], json!("https://api.example.com/5"));
        assert_eq!(resolved["fields"][0]["value"], json!(5));
        assert_eq!(resolved["count"], json!(7));
    }

    #[test]
    fn non_string_values_pass_through() {
        assert_eq!(resolve(&json!(42), &outputs()), json!(42));
        assert_eq!(resolve(&Value::Null, &outputs()), Value::Null);
    }
}
