//! Scalar coercions for loosely-typed client values.
//!
//! Clients send whatever their local state happens to hold: numbers as
//! strings, ids as numbers, timestamps as epoch millis. These helpers map a
//! single `serde_json::Value` onto the canonical scalar, or report that it
//! should be dropped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;

/// Parses a strict `YYYY-MM-DD` key that also denotes a real calendar day.
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let shaped = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Date key carried in a JSON value; only strings qualify.
pub fn date_key(value: Option<&Value>) -> Option<NaiveDate> {
    match value {
        Some(Value::String(s)) => parse_date_key(s),
        _ => None,
    }
}

pub fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// JavaScript `Number(value)` semantics for JSON values.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Rounds to the nearest integer, halves going up (`Math.round`).
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Coerces an optional value into an integer no smaller than `min`.
///
/// Absent or non-finite input yields `default` unchanged.
pub fn to_count(value: Option<&Value>, default: i64, min: i64) -> i64 {
    let Some(value) = value else {
        return default;
    };
    let number = to_number(value);
    if !number.is_finite() {
        return default;
    }
    (round_half_up(number) as i64).max(min)
}

/// Stringifies and trims an identifier. Empty results are rejected.
pub fn to_identifier(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Trimmed, non-empty free text.
pub fn to_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// JavaScript truthiness.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Reads a nullable timestamp.
///
/// Returns `None` when the value is unusable and the field should be left
/// alone, `Some(None)` for an explicit `null`.
pub fn to_timestamp(value: &Value) -> Option<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Some(None),
        Value::Number(n) => {
            let millis = n.as_f64().filter(|f| f.is_finite())?;
            Utc.timestamp_millis_opt(millis.round() as i64)
                .single()
                .map(Some)
        }
        Value::String(s) => parse_timestamp(s).map(Some),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    parse_date_key(raw).map(start_of_day)
}
