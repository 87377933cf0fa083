/// Loose value coercion helpers
///
/// Workflow definitions come from a loosely-typed editor: switch case values
/// and condition targets are strings even when the matched output is a
/// number. These helpers implement the loose comparison semantics the
/// definitions rely on (numeric strings compare numerically, booleans
/// coerce to 0/1).

use serde_json::Value;

/// Loose equality across JSON types
///
/// Same-type values compare strictly; string/number and bool/number pairs
/// compare numerically. Null equals only null.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(_), Value::Number(_)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        (Value::Array(_), _) | (_, Value::Array(_)) => false,
        (Value::Object(_), _) | (_, Value::Object(_)) => false,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Loose greater-than
///
/// Two strings compare lexicographically; anything else compares
/// numerically when both sides coerce to a number, and is false otherwise.
pub fn loosely_greater(a: &Value, b: &Value) -> bool {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return x > y;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x > y,
        _ => false,
    }
}

/// Numeric coercion: numbers as-is, numeric strings parsed, bools as 0/1
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// String representation used when a token is embedded in a longer string
///
/// Strings render without quotes; everything else renders as compact JSON.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_compare_loosely() {
        assert!(loosely_equal(&json!(1), &json!("1")));
        assert!(loosely_equal(&json!("2.5"), &json!(2.5)));
        assert!(!loosely_equal(&json!(1), &json!("2")));
        assert!(!loosely_equal(&json!("abc"), &json!(1)));
    }

    #[test]
    fn null_only_equals_null() {
        assert!(loosely_equal(&Value::Null, &Value::Null));
        assert!(!loosely_equal(&Value::Null, &json!(0)));
        assert!(!loosely_equal(&Value::Null, &json!("")));
    }

    #[test]
    fn greater_than_coerces() {
        assert!(loosely_greater(&json!(10), &json!("9")));
        assert!(!loosely_greater(&json!(5), &json!("9")));
        // two strings compare lexicographically
        assert!(!loosely_greater(&json!("10"), &json!("9")));
        assert!(loosely_greater(&json!("b"), &json!("a")));
    }

    #[test]
    fn display_strings_are_unquoted() {
        assert_eq!(display_string(&json!("hi")), "hi");
        assert_eq!(display_string(&json!(5)), "5");
        assert_eq!(display_string(&json!(true)), "true");
        assert_eq!(display_string(&json!({"a": 1})), "{\"a\":1}");
    }
}
