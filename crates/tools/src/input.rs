//! Typed reads from state and node configuration.
//!
//! Tools validate their inputs here rather than trusting whatever an earlier
//! tool wrote: a missing key falls back to the tool's default, a key holding the
//! wrong JSON type is a [`ToolError::InvalidInput`].

use serde_json::{Map, Value};
use workflow::ToolError;

pub(crate) fn string<'a>(map: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>, ToolError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(key, "a string")),
    }
}

pub(crate) fn number(map: &Map<String, Value>, key: &str) -> Result<Option<f64>, ToolError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| invalid(key, "a number")),
    }
}

fn invalid(key: &str, expected: &'static str) -> ToolError {
    ToolError::InvalidInput {
        key: key.to_owned(),
        expected,
    }
}
