//! Value conversions used by field mappings
//!
//! Each conversion has a plain form returning a typed value and a `*_fn()`
//! form returning a [`TransformFn`] for use in a [`ModelMapping`].
//!
//! [`ModelMapping`]: super::ModelMapping

use super::mapping::TransformFn;
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;

const MS_PER_SECOND: i64 = 1000;
const JST_OFFSET_SECONDS: i32 = 9 * 3600;
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Number or numeric string as `f64`
pub fn to_float(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::transform(format!("cannot convert number to f64: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::transform(format!("cannot parse '{s}' as a number"))),
        other => Err(Error::transform(format!("cannot convert {other} to f64"))),
    }
}

pub fn to_float_fn() -> TransformFn {
    Arc::new(|v| to_float(v).map(Value::from))
}

/// Integer or integer string as `i64`
pub fn to_int(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::transform(format!("cannot convert number to i64: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::transform(format!("cannot parse '{s}' as an integer"))),
        other => Err(Error::transform(format!("cannot convert {other} to i64"))),
    }
}

pub fn to_int_fn() -> TransformFn {
    Arc::new(|v| to_int(v).map(Value::from))
}

/// RFC 3339 timestamp in any offset, normalized to UTC with a `Z` suffix
pub fn iso_timestamp(value: &Value) -> Result<String> {
    let s = expect_str(value, "timestamp")?;
    let dt = DateTime::parse_from_rfc3339(s)
        .map_err(|e| Error::transform(format!("invalid ISO timestamp '{s}': {e}")))?;
    Ok(format_utc(dt.with_timezone(&Utc)))
}

pub fn iso_timestamp_fn() -> TransformFn {
    Arc::new(|v| iso_timestamp(v).map(Value::from))
}

/// Calendar date (`YYYY-MM-DD`) to midnight UTC
pub fn iso_date(value: &Value) -> Result<String> {
    let s = expect_str(value, "date")?;
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| Error::transform(format!("invalid date '{s}': {e}")))?;
    Ok(format!("{}T00:00:00Z", date.format("%Y-%m-%d")))
}

pub fn iso_date_fn() -> TransformFn {
    Arc::new(|v| iso_date(v).map(Value::from))
}

/// Unix epoch milliseconds to ISO 8601 UTC (second precision)
pub fn unix_timestamp_ms(value: &Value) -> Result<String> {
    let ms = to_int(value)?;
    if ms < 0 {
        return Err(Error::transform(format!("negative timestamp not allowed: {ms}")));
    }
    let nanos = ((ms % MS_PER_SECOND) * 1_000_000) as u32;
    let dt = DateTime::from_timestamp(ms / MS_PER_SECOND, nanos)
        .ok_or_else(|| Error::transform(format!("timestamp out of range: {ms}ms")))?;
    Ok(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

pub fn unix_timestamp_ms_fn() -> TransformFn {
    Arc::new(|v| unix_timestamp_ms(v).map(Value::from))
}

/// Unix epoch seconds to ISO 8601 UTC
pub fn unix_timestamp_sec(value: &Value) -> Result<String> {
    let secs = to_int(value)?;
    if secs < 0 {
        return Err(Error::transform(format!("negative timestamp not allowed: {secs}")));
    }
    let dt = DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::transform(format!("timestamp out of range: {secs}s")))?;
    Ok(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

pub fn unix_timestamp_sec_fn() -> TransformFn {
    Arc::new(|v| unix_timestamp_sec(v).map(Value::from))
}

/// Japan Standard Time to UTC.
///
/// Strings with an explicit offset are converted as-is; naive
/// `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD HH:MM:SS` values are read as UTC+9.
pub fn jst_to_utc(value: &Value) -> Result<String> {
    let s = expect_str(value, "timestamp")?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(format_utc(dt.with_timezone(&Utc)));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| Error::transform(format!("invalid datetime '{s}'")))?;
    let jst = FixedOffset::east_opt(JST_OFFSET_SECONDS)
        .ok_or_else(|| Error::transform("invalid JST offset"))?;
    let dt = naive
        .and_local_timezone(jst)
        .single()
        .ok_or_else(|| Error::transform(format!("ambiguous datetime '{s}'")))?;

    Ok(format_utc(dt.with_timezone(&Utc)))
}

pub fn jst_to_utc_fn() -> TransformFn {
    Arc::new(|v| jst_to_utc(v).map(Value::from))
}

/// Normalize provider side labels to `buy` / `sell`
pub fn side_from_string(value: &Value) -> Result<String> {
    let s = expect_str(value, "side")?;
    match s.to_lowercase().as_str() {
        "buy" | "bid" | "long" => Ok("buy".to_string()),
        "sell" | "ask" | "short" => Ok("sell".to_string()),
        _ => Err(Error::transform(format!("cannot normalize side value '{s}'"))),
    }
}

pub fn side_from_string_fn() -> TransformFn {
    Arc::new(|v| side_from_string(v).map(Value::from))
}

pub fn uppercase(value: &Value) -> Result<String> {
    Ok(expect_str(value, "string")?.to_uppercase())
}

pub fn uppercase_fn() -> TransformFn {
    Arc::new(|v| uppercase(v).map(Value::from))
}

pub fn lowercase(value: &Value) -> Result<String> {
    Ok(expect_str(value, "string")?.to_lowercase())
}

pub fn lowercase_fn() -> TransformFn {
    Arc::new(|v| lowercase(v).map(Value::from))
}

fn expect_str<'a>(value: &'a Value, what: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::transform(format!("expected string for {what}, got {value}")))
}

fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
