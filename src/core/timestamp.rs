//! Timestamp parsing and rendering for event fields
//!
//! Event timestamps are stored as UTC ISO 8601 strings with millisecond
//! precision. The formatter's `%t%` directives re-render them in a handful
//! of alternative shapes.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Rendering mode selected by the `%[ulif]t%` directive flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeDirective {
    /// UTC ISO 8601 with milliseconds (flag `u`, the default)
    #[default]
    Utc,
    /// Local-time ISO 8601 with milliseconds (flag `l`)
    Local,
    /// Integer Unix seconds (flag `i`)
    UnixSeconds,
    /// Fractional Unix seconds (flag `f`)
    UnixFloat,
}

impl TimeDirective {
    pub fn from_flag(flag: Option<char>) -> Self {
        match flag {
            Some('l') => TimeDirective::Local,
            Some('i') => TimeDirective::UnixSeconds,
            Some('f') => TimeDirective::UnixFloat,
            _ => TimeDirective::Utc,
        }
    }

    pub fn render(&self, t: DateTime<Utc>) -> String {
        match self {
            TimeDirective::Utc => iso8601_millis(&t),
            TimeDirective::Local => t
                .with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Millis, false),
            TimeDirective::UnixSeconds => t.timestamp().to_string(),
            TimeDirective::UnixFloat => {
                format!("{:?}", t.timestamp_micros() as f64 / 1_000_000.0)
            }
        }
    }
}

/// Format a UTC timestamp as ISO 8601 with millisecond precision
pub fn iso8601_millis(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Current time in the event wire format
pub fn now_iso8601_millis() -> String {
    iso8601_millis(&Utc::now())
}

/// Coerce a JSON value into a timestamp.
///
/// Strings are parsed (RFC 3339 and common ISO forms), numbers are taken as
/// epoch seconds, and anything else defaults to the epoch.
pub fn coerce_time(value: &Value) -> DateTime<Utc> {
    match value {
        Value::String(s) => parse_time(s).unwrap_or(DateTime::UNIX_EPOCH),
        Value::Number(n) => n
            .as_f64()
            .and_then(from_epoch_seconds)
            .unwrap_or(DateTime::UNIX_EPOCH),
        _ => DateTime::UNIX_EPOCH,
    }
}

fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let secs = seconds.trunc() as i64;
    let nanos = (seconds.fract().abs() * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(secs, nanos)
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    }
    None
}
