//! Extraction reply parsing
//!
//! The extraction prompt asks the model to answer with either the literal
//! `0` (nothing usable in the input) or a JSON object `{"value": ...}`.
//! Anything else is an error rather than a silent guess.

use chrono::NaiveDate;
use form_agent_core::FieldKind;
use serde_json::{Number, Value};

use crate::AgentError;

/// Reply sentinel for "no valid value in the input"
pub const INVALID_SENTINEL: &str = "0";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Parsed extraction reply
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Invalid,
    Value(Value),
}

/// Parse the model's extraction reply.
///
/// Surrounding whitespace and a Markdown code fence are tolerated. The value
/// must be a string, number or boolean.
pub fn parse_extraction(reply: &str) -> Result<Extraction, AgentError> {
    let body = strip_code_fence(reply.trim());

    if body == INVALID_SENTINEL {
        return Ok(Extraction::Invalid);
    }

    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| AgentError::Extraction(format!("reply is not JSON ({}): {}", e, preview(body))))?;

    let value = match parsed {
        Value::Object(mut map) => map
            .remove("value")
            .ok_or_else(|| AgentError::Extraction(format!("reply has no \"value\" key: {}", preview(body))))?,
        other => {
            return Err(AgentError::Extraction(format!(
                "expected an object, got: {}",
                preview(&other.to_string())
            )))
        }
    };

    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(Extraction::Value(value)),
        other => Err(AgentError::Extraction(format!(
            "unsupported value type: {}",
            preview(&other.to_string())
        ))),
    }
}

/// Check an extracted value against the field kind.
///
/// Returns the value to store, or `None` when it does not fit and the field
/// has to be asked again.
pub fn coerce_value(kind: FieldKind, value: Value) -> Option<Value> {
    match kind {
        FieldKind::Text => match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| Value::String(trimmed.to_string()))
            }
            other => Some(other),
        },
        FieldKind::Number => match value {
            Value::Number(_) => Some(value),
            Value::String(s) => parse_number(&s),
            _ => None,
        },
        FieldKind::Date => match value {
            Value::String(s) => parse_date(&s).map(Value::String),
            _ => None,
        },
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (`json`) on the opening line
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_number(raw: &str) -> Option<Value> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let parsed: f64 = cleaned.parse().ok()?;

    if parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
        Some(Value::Number(Number::from(parsed as i64)))
    } else {
        Number::from_f64(parsed).map(Value::Number)
    }
}

fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{}...", cut)
    }
}
