//! Conversions from loosely typed upstream API values.
//!
//! The upstream API serves field values as whatever its own store happens to
//! hold: numbers, numeric strings, empty strings, the literal `"never"`, or
//! null. These helpers normalize that into domain types. Null and empty
//! values convert to `None` rather than zero, since zero is a valid sensor
//! value and must stay distinguishable from missing data.

use chrono::{DateTime, Utc};
use geo::Point;
use serde_json::Value;
use thiserror::Error;

/// Sentinel the upstream uses for a timestamp that has never been set.
const NEVER: &str = "never";

/// Errors produced when an upstream value cannot be normalized.
#[derive(Debug, Error, PartialEq)]
pub enum ConvertError {
    #[error("expected a numeric value, got `{0}`")]
    NotNumeric(String),

    #[error("timestamp {0} is outside the representable range")]
    TimestampOutOfRange(f64),
}

/// Parses an upstream scalar as a float.
///
/// Returns `Ok(None)` when the value carries no data (null or the empty
/// string) and an error when it is present but non-numeric.
fn parse_numeric(value: &Value) -> Result<Option<f64>, ConvertError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConvertError::NotNumeric(s.clone())),
        other => Err(ConvertError::NotNumeric(other.to_string())),
    }
}

/// Converts an upstream timestamp to a UTC instant.
///
/// Upstream timestamps are milliseconds since the Unix epoch, given as a
/// number or a numeric string (fractional milliseconds accepted). The
/// `"never"` sentinel, null, and absent values all convert to `None`.
pub fn convert_timestamp(value: Option<&Value>) -> Result<Option<DateTime<Utc>>, ConvertError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if matches!(value, Value::String(s) if s == NEVER) {
        return Ok(None);
    }
    let Some(millis) = parse_numeric(value)? else {
        return Ok(None);
    };
    DateTime::from_timestamp_micros((millis * 1_000.0).round() as i64)
        .map(Some)
        .ok_or(ConvertError::TimestampOutOfRange(millis))
}

/// Converts an upstream measurement value to an optional float.
///
/// Null, absent, and empty-string values mean "no reading".
pub fn convert_float(value: Option<&Value>) -> Result<Option<f64>, ConvertError> {
    value.map_or(Ok(None), parse_numeric)
}

/// Converts an upstream entry count, defaulting to zero when absent or empty.
pub fn convert_count(value: Option<&Value>) -> Result<i32, ConvertError> {
    Ok(value
        .map_or(Ok(None), parse_numeric)?
        .map_or(0, |n| n as i32))
}

/// Builds a geographic point from upstream coordinate values.
///
/// The point is absent unless both coordinates convert to finite floats.
/// Missing, empty, or malformed coordinates degrade to `None` rather than
/// erroring, matching how the upstream serves partially filled locations.
pub fn convert_point(longitude: Option<&Value>, latitude: Option<&Value>) -> Option<Point<f64>> {
    let x = longitude.and_then(|v| parse_numeric(v).ok().flatten())?;
    let y = latitude.and_then(|v| parse_numeric(v).ok().flatten())?;
    if x.is_finite() && y.is_finite() {
        Some(Point::new(x, y))
    } else {
        None
    }
}
