//! Record transformation pipeline.
//!
//! Stages run in a fixed order over JSON-object records:
//! [`normalize`] → [`derive`] → [`merge`] → validation annotation
//! (see [`crate::validation`]) → [`finalize`]. The [`pipeline`] module
//! orchestrates the CSV→CSV conversion paths on top of them.

pub mod derive;
pub mod finalize;
pub mod merge;
pub mod normalize;
pub mod pipeline;

use serde_json::Value;

/// A field rendered as text. Numbers are formatted, everything else is empty.
pub(crate) fn text(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Set a field on an object record.
pub(crate) fn set(record: &mut Value, key: &str, value: Value) {
    if let Value::Object(map) = record {
        map.insert(key.to_string(), value);
    }
}

/// Set a string field on an object record.
pub(crate) fn set_text(record: &mut Value, key: &str, value: impl Into<String>) {
    set(record, key, Value::String(value.into()));
}
