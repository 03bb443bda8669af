//! Per-candidate admission rules.
//!
//! Model output is untrusted. Each element of the parsed array is checked
//! field by field before it becomes a [`CandidateRecord`]; anything that
//! fails is dropped without an individual log line.

use std::fmt;

use gleaner_types::lesson::{CandidateRecord, DEFAULT_OUTCOME, MIN_CONFIDENCE};
use serde_json::Value;

use super::trigger::TASK_ID_KEYS;

/// Why a candidate was not admitted. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingText,
    MissingCategory,
    MissingConfidence,
    LowConfidence,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingText => write!(f, "missing_text"),
            RejectReason::MissingCategory => write!(f, "missing_category"),
            RejectReason::MissingConfidence => write!(f, "missing_confidence"),
            RejectReason::LowConfidence => write!(f, "low_confidence"),
        }
    }
}

/// Check one loosely-typed candidate against the admission rules.
///
/// `min_confidence` can only tighten the threshold; anything under
/// [`MIN_CONFIDENCE`] is treated as [`MIN_CONFIDENCE`].
pub fn check_candidate(raw: &Value, min_confidence: f64) -> Result<CandidateRecord, RejectReason> {
    let text = required_str(raw.get("text")).ok_or(RejectReason::MissingText)?;
    let category = required_str(raw.get("category")).ok_or(RejectReason::MissingCategory)?;
    let confidence = raw
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or(RejectReason::MissingConfidence)?;
    // NaN never gets here: serde_json has no representation for it.
    if confidence < min_confidence.max(MIN_CONFIDENCE) {
        return Err(RejectReason::LowConfidence);
    }

    Ok(CandidateRecord {
        text: text.to_string(),
        category: category.to_string(),
        confidence,
        outcome: outcome_of(raw.get("outcome")),
        task_id: TASK_ID_KEYS
            .iter()
            .find_map(|key| required_str(raw.get(*key)))
            .map(str::to_string),
    })
}

/// [`check_candidate`] without the reason.
pub fn admit_candidate(raw: &Value, min_confidence: f64) -> Option<CandidateRecord> {
    check_candidate(raw, min_confidence).ok()
}

/// Admit every passing candidate, preserving order.
pub fn admit_all(raw: &[Value], min_confidence: f64) -> Vec<CandidateRecord> {
    raw.iter()
        .filter_map(|candidate| admit_candidate(candidate, min_confidence))
        .collect()
}

/// A present, non-empty string field.
fn required_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn outcome_of(value: Option<&Value>) -> String {
    match value {
        None => DEFAULT_OUTCOME.to_string(),
        Some(v) if is_falsy(v) => DEFAULT_OUTCOME.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Null, `false`, zero and the empty string.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
