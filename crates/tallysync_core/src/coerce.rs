//! Coercion of loosely typed client values.

use crate::error::{CoreError, CoreResult};
use crate::time;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Coerces a boolean-ish value.
///
/// Numbers are true when non-zero. Strings are true when they read `1`,
/// `true`, `si` or `yes` (case-insensitive); every other string is false.
pub fn coerce_bool(value: &Value) -> CoreResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            Ok(matches!(s.as_str(), "1" | "true" | "si" | "yes"))
        }
        _ => Err(CoreError::invalid_value("expected a boolean")),
    }
}

/// Coerces a numeric rate from a number or numeric string.
pub fn coerce_rate(value: &Value) -> CoreResult<f64> {
    let rate = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    rate.filter(|r| r.is_finite())
        .ok_or_else(|| CoreError::invalid_value("invalid number"))
}

/// Coerces a timestamp string.
pub fn coerce_timestamp(value: &Value) -> CoreResult<DateTime<Utc>> {
    match value {
        Value::String(s) => time::parse_lenient(s),
        _ => Err(CoreError::invalid_value("expected a date string")),
    }
}
