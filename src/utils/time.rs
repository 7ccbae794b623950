//! Date and time normalization helpers
//!
//! Legacy records stored their schedule in several historical JSON shapes.
//! `to_instant` is the single ingestion point that tolerates all of them;
//! everything past this boundary works with `DateTime<Utc>` only.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values at or above this magnitude are treated as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Normalize a raw legacy date value to a UTC instant.
///
/// Accepted shapes: RFC 3339 / ISO 8601 strings, bare `YYYY-MM-DD` dates,
/// epoch seconds or milliseconds, `{seconds, nanos}` timestamp objects
/// (with or without underscore-prefixed keys), and `{date, time}` pairs.
/// Returns `None` when the value matches no known shape.
pub fn to_instant(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => parse_datetime_string(s),
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::Object(map) => {
            if let Some(seconds) = int_field(map, &["seconds", "_seconds"]) {
                let nanos = int_field(map, &["nanos", "nanoseconds", "_nanoseconds"]).unwrap_or(0);
                return Utc.timestamp_opt(seconds, nanos as u32).single();
            }
            if let Some(Value::String(date)) = map.get("date") {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
                let time = match map.get("time") {
                    Some(Value::String(t)) => parse_time_string(t)?,
                    _ => NaiveTime::MIN,
                };
                return Some(Utc.from_utc_datetime(&date.and_time(time)));
            }
            None
        }
        _ => None,
    }
}

fn parse_datetime_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offset-less timestamps were written by the legacy exporter in UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    None
}

fn parse_time_string(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

fn int_field(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| map.get(*key).and_then(Value::as_i64))
}

/// Format a wall-clock time for instance display, e.g. "18:30"
pub fn format_local_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Full weekday name for instance display, e.g. "Monday"
pub fn format_day_of_week(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Human-readable date for instance display, e.g. "June 2, 2025"
pub fn format_date_display(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}
