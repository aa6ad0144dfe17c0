//! Helper functions for lenient JSON access
//!
//! Provider output and editor payloads are loosely typed; these helpers read
//! them without panicking and with predictable fallbacks.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Render a scalar for display in a table cell or text block.
/// Null becomes the empty string; integral floats drop their fraction.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Shallow merge: keys of `overlay` replace keys of `base`.
/// Non-object inputs yield `overlay` unless it is null.
pub fn merge_objects(base: &Value, overlay: Option<&Value>) -> Value {
    match (base, overlay) {
        (Value::Object(b), Some(Value::Object(o))) => {
            let mut merged: Map<String, Value> = b.clone();
            for (k, v) in o {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        (_, Some(o)) if !o.is_null() => o.clone(),
        (b, _) => b.clone(),
    }
}

/// Deserialize a string that the editor sometimes writes as a number
pub fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_text() {
        assert_eq!(value_to_text(&json!(null)), "");
        assert_eq!(value_to_text(&json!(3.0)), "3");
        assert_eq!(value_to_text(&json!(3.25)), "3.25");
        assert_eq!(value_to_text(&json!(7)), "7");
        assert_eq!(value_to_text(&json!("x")), "x");
        assert_eq!(value_to_text(&json!(true)), "true");
    }

    #[test]
    fn merge_overlay_wins() {
        let merged = merge_objects(&json!({"a": 1, "b": 2}), Some(&json!({"b": 3})));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
        assert_eq!(merge_objects(&json!({"a": 1}), None), json!({"a": 1}));
        assert_eq!(merge_objects(&json!({"a": 1}), Some(&json!(null))), json!({"a": 1}));
    }
}
