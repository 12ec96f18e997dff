//! Normalization of function-call arguments.
//!
//! Providers are inconsistent about how they ship arguments: Gemini sends a
//! JSON object, other SDK paths hand over the same object pre-serialized as a
//! string. Executors only ever see the normalized map.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgumentError {
    #[error("arguments are not valid JSON: {0}")]
    Malformed(String),
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Coerces raw function-call arguments into a string-keyed map.
///
/// Objects pass through unchanged, strings are decoded as JSON and must hold
/// an object, and a missing (`null`) argument list becomes an empty map.
pub fn normalize_arguments(raw: Value) -> Result<Map<String, Value>, ArgumentError> {
    match raw {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::String(text) => {
            if text.trim().is_empty() {
                return Ok(Map::new());
            }
            match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(other) => Err(ArgumentError::NotAnObject(type_name(&other))),
                Err(e) => Err(ArgumentError::Malformed(e.to_string())),
            }
        }
        other => Err(ArgumentError::NotAnObject(type_name(&other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
