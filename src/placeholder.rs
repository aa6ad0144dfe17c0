//! `$CURRENT` placeholder resolution
//!
//! Templates refer to the subject of the current render pass (typically a
//! sensor or a site) through reserved tokens:
//!
//! * `$CURRENT` is the subject value itself,
//! * `$CURRENT_<field>` is one field of the context.
//!
//! A string that is exactly one token is replaced by the value with its JSON
//! type preserved. Tokens embedded in longer strings are interpolated as text.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::json_helpers::value_to_text;

/// Run-time values the `$CURRENT` tokens resolve against
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaceholderContext {
    pub current: Option<Value>,
    pub fields: Map<String, Value>,
}

impl PlaceholderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current(mut self, current: Value) -> Self {
        self.current = Some(current);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Value for a field; missing and null both read as absent
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}

fn token_regex() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"\$CURRENT(?:_([A-Za-z0-9_]+))?\b").ok())
        .as_ref()
}

/// Resolve every `$CURRENT` token in `value`, recursing into objects and arrays
pub fn resolve(value: &Value, context: &PlaceholderContext) -> Value {
    match value {
        Value::String(s) => resolve_str(s, context),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_str(s: &str, context: &PlaceholderContext) -> Value {
    let Some(re) = token_regex() else {
        return Value::String(s.to_string());
    };
    if let Some(caps) = re.captures(s) {
        let whole = caps.get(0).map(|m| m.as_str() == s).unwrap_or(false);
        if whole {
            return match caps.get(1) {
                None => match &context.current {
                    Some(current) => current.clone(),
                    None => Value::String(s.to_string()),
                },
                Some(field) => context
                    .field(field.as_str())
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new())),
            };
        }
    } else {
        return Value::String(s.to_string());
    }
    Value::String(interpolate(s, context))
}

/// Textual substitution of every token in `s`
pub fn interpolate(s: &str, context: &PlaceholderContext) -> String {
    let Some(re) = token_regex() else {
        return s.to_string();
    };
    re.replace_all(s, |caps: &Captures| match caps.get(1) {
        None => match &context.current {
            Some(current) => value_to_text(current),
            None => caps[0].to_string(),
        },
        Some(field) => context.field(field.as_str()).map(value_to_text).unwrap_or_default(),
    })
    .into_owned()
}
