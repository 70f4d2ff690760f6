//! Value coercion: raw cell text to a typed JSON value.
//!
//! A missing or empty value never reaches the type branch; it resolves to the
//! mapping default (or null) directly.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::CoercionError;
use crate::models::{FieldMapping, TargetType};

/// Output format for dates: UTC, millisecond precision.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Offset-carrying date-time layouts, tried after RFC 3339 and RFC 2822.
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

/// Date-time layouts without an offset; read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts; midnight UTC.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

/// Coerce a raw value according to a mapping.
///
/// `None` (column absent from the row) behaves exactly like an empty string.
pub fn coerce(raw: Option<&str>, mapping: &FieldMapping) -> Result<Value, CoercionError> {
    let value = match raw {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(fallback(mapping)),
    };

    match &mapping.kind {
        TargetType::String => Ok(Value::String(value.to_string())),
        TargetType::Number => parse_number(value)
            .map(number_value)
            .ok_or_else(|| CoercionError::Number(value.to_string())),
        TargetType::Boolean => {
            parse_boolean(value).ok_or_else(|| CoercionError::Boolean(value.to_string()))
        }
        TargetType::Date => parse_date(value)
            .map(|dt| Value::String(dt.format(DATE_FORMAT).to_string()))
            .ok_or_else(|| CoercionError::Date(value.to_string())),
        TargetType::Array => Ok(parse_array(value)),
        TargetType::Object => serde_json::from_str(value)
            .map_err(|_| CoercionError::Object(value.to_string())),
        TargetType::Other(_) => Ok(Value::String(value.to_string())),
    }
}

/// The mapping default, or null.
pub fn fallback(mapping: &FieldMapping) -> Value {
    mapping.default.clone().unwrap_or(Value::Null)
}

/// Parse a numeric literal. Surrounding whitespace is allowed; non-finite
/// results are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            if digits.is_empty() {
                return None;
            }
            // Accumulate in f64 so literals wider than 64 bits still parse
            return digits
                .chars()
                .try_fold(0.0_f64, |acc, c| {
                    c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
                })
                .filter(|n| n.is_finite());
        }
    }

    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integral values that fit exactly in an f64 mantissa become JSON integers.
fn number_value(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn parse_boolean(raw: &str) -> Option<Value> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(Value::Bool(true)),
        "false" | "0" | "no" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Parse a calendar date or date-time. Values without an offset are UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return midnight(date);
        }
    }

    // Partial ISO dates: "2024-03" and "2024"
    if s.len() == 7 && s.as_bytes()[4] == b'-' {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return midnight(date);
        }
    }
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        return s
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .and_then(midnight);
    }

    None
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Structured first, comma split second. Never fails.
///
/// A JSON value that is not an array (e.g. `42`) is still returned as-is.
fn parse_array(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) => Value::Array(
            raw.split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .collect(),
        ),
    }
}
