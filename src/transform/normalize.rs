//! Cell-level normalization
//!
//! Policy for every normalizer in this module:
//! - malformed non-empty input is rejected with a `Value` error
//! - empty or missing input in a nullable column becomes `None`

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use uuid::Uuid;

/// Naive layouts tried in order; offsets are handled separately via RFC 3339
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const CANONICAL_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S";

const URN_PREFIX: &str = "urn:uuid:";

/// Parse a UUID in any textual form and re-emit it lowercase and hyphenated
///
/// Accepts hyphenated, simple (32 hex digits), braced and URN forms.
/// Normalizing an already-canonical UUID returns it unchanged.
pub fn normalize_uuid(value: &str) -> Result<String> {
    let trimmed = value.trim();
    let body = match trimmed.get(..URN_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(URN_PREFIX) => &trimmed[URN_PREFIX.len()..],
        _ => trimmed,
    };
    Uuid::parse_str(body)
        .map(|uuid| uuid.hyphenated().to_string())
        .map_err(|e| Error::value("uuid", value, e))
}

pub fn normalize_optional_uuid(value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => normalize_uuid(v).map(Some),
    }
}

/// Parse a date/time string into a naive UTC timestamp with second precision
///
/// Values carrying an offset are converted to UTC. A bare date is
/// taken as midnight.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();

    let parsed = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| {
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok_or_else(|| Error::value("timestamp", value, "unrecognized date/time format"))?;

    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}

pub fn parse_optional_timestamp(value: Option<&str>) -> Result<Option<NaiveDateTime>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_timestamp(v).map(Some),
    }
}

/// Canonical text form, e.g. `2024-01-01T10:00:00`
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(CANONICAL_TIMESTAMP).to_string()
}

pub fn canonical_timestamp(value: &str) -> Result<String> {
    parse_timestamp(value).map(|ts| format_timestamp(&ts))
}

/// Round a float measure to the nearest integer, ties to even
///
/// NaN is the source's null marker and maps to `None`.
pub fn round_measure(column: &'static str, value: Option<f64>) -> Result<Option<i64>> {
    match value {
        None => Ok(None),
        Some(v) if v.is_nan() => Ok(None),
        Some(v) if !v.is_finite() || v.abs() > i64::MAX as f64 => {
            Err(Error::value("measure", v.to_string(), format!("{column} is out of range")))
        }
        Some(v) => Ok(Some(v.round_ties_even() as i64)),
    }
}
