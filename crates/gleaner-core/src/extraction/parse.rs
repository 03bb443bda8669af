//! Structural validation of raw model output.
//!
//! The model is asked for a bare JSON array. Anything else is a recoverable
//! failure: the caller logs it and extracts nothing for this turn. Elements
//! stay loosely typed here; [`super::filter`] checks them field by field.

use serde_json::Value;

/// Why raw model output could not be used.
#[derive(Debug, thiserror::Error)]
pub enum CandidateParseError {
    #[error("model output is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("model output is JSON but not an array (found {found})")]
    NotAnArray { found: &'static str },
}

/// Parse trimmed model output as a JSON array of candidate values.
pub fn parse_candidates(raw: &str) -> Result<Vec<Value>, CandidateParseError> {
    let value: Value = serde_json::from_str(raw.trim())?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(CandidateParseError::NotAnArray {
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
