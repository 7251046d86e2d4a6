//! Structured log event
//!
//! An [`Event`] is an ordered map of JSON values. Construction fills in
//! ambient defaults (timestamp, pid, program, host, thread id, scoped
//! metadata) and coerces the severity; the result serializes to a single
//! flat JSON object.

use super::metadata::MetadataContext;
use super::severity::Severity;
use super::timestamp;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Field map shared by events, payloads, and metadata.
///
/// `serde_json::Map` iterates in key order, which keeps serialized events
/// stable and diffable.
pub type Fields = Map<String, Value>;

/// Containers nested deeper than this are rendered as the `"circular"`
/// marker instead of being descended into. JSON values are acyclic by
/// construction; the depth cap is the deterministic stand-in for
/// reference-cycle detection and guarantees normalization terminates.
pub const MAX_NESTING_DEPTH: usize = 64;

const CIRCULAR_MARKER: &str = "circular";

thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.is_none() {
            *cache = Some(format!("{:?}", std::thread::current().id()));
        }
        cache.clone().unwrap_or_default()
    })
}

fn program_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return Some(name.trim().to_string());
        }
    }
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Replace containers nested beyond [`MAX_NESTING_DEPTH`] with the
/// `"circular"` marker, leaving scalars untouched.
pub(crate) fn normalize_value(value: Value, depth: usize) -> Value {
    match value {
        Value::Array(items) => {
            if depth >= MAX_NESTING_DEPTH {
                return Value::String(CIRCULAR_MARKER.to_string());
            }
            Value::Array(
                items
                    .into_iter()
                    .map(|v| normalize_value(v, depth + 1))
                    .collect(),
            )
        }
        Value::Object(map) => {
            if depth >= MAX_NESTING_DEPTH {
                return Value::String(CIRCULAR_MARKER.to_string());
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, normalize_value(v, depth + 1)))
                    .collect(),
            )
        }
        scalar => scalar,
    }
}

fn normalize_fields(fields: Fields) -> Fields {
    fields
        .into_iter()
        .map(|(k, v)| (k, normalize_value(v, 0)))
        .collect()
}

/// Plain string form of a value: strings unquoted, null empty, containers
/// compact JSON.
pub(crate) fn plain_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Payload accepted by the logging entry points.
///
/// This replaces the reference probing of arbitrary inputs with an explicit
/// conversion seam: strings become messages, maps become base fields,
/// errors carry their class and source chain, and everything else is
/// rendered through [`Inspect`].
#[derive(Debug, Clone, PartialEq)]
pub enum LogPayload {
    Message(String),
    Fields(Fields),
    Error {
        class: String,
        message: String,
        backtrace: Vec<String>,
    },
}

impl LogPayload {
    /// Build an error payload from any `std::error::Error`, recording the
    /// concrete type name and the source chain.
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        let class = std::any::type_name::<E>().to_string();
        let message = format!("{}: {}", class, error);
        let mut backtrace = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            backtrace.push(cause.to_string());
            source = cause.source();
        }
        LogPayload::Error {
            class,
            message,
            backtrace,
        }
    }
}

impl From<&str> for LogPayload {
    fn from(s: &str) -> Self {
        LogPayload::Message(s.to_string())
    }
}

impl From<String> for LogPayload {
    fn from(s: String) -> Self {
        LogPayload::Message(s)
    }
}

impl From<Fields> for LogPayload {
    fn from(fields: Fields) -> Self {
        LogPayload::Fields(fields)
    }
}

impl From<Value> for LogPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => LogPayload::Fields(map),
            Value::String(s) => LogPayload::Message(s),
            other => LogPayload::Message(format!("Logging {}", other)),
        }
    }
}

/// Wrapper logging an arbitrary `Debug` value as `Logging <repr>`.
///
/// The `Debug` rendering runs inside the facade's containment boundary, so
/// a panicking implementation cannot escape to the caller.
pub struct Inspect<T: fmt::Debug>(pub T);

impl<T: fmt::Debug> From<Inspect<T>> for LogPayload {
    fn from(inspect: Inspect<T>) -> Self {
        LogPayload::Message(format!("Logging {:?}", inspect.0))
    }
}

/// A normalized, serializable structured log record
#[derive(Debug, Clone)]
pub struct Event {
    data: Fields,
}

impl Event {
    /// Build an event from raw fields, filling ambient defaults for absent
    /// keys and coercing the severity. Never fails: unparsable severities
    /// become `unknown`, and a missing message is synthesized.
    pub fn new(data: Fields) -> Self {
        let mut data = normalize_fields(data);

        let severity = match data.get("severity") {
            None | Some(Value::Null) => Severity::Debug,
            Some(Value::String(name)) => Severity::new(name),
            Some(other) => Severity::new(plain_string(other)),
        };
        data.insert(
            "severity".to_string(),
            Value::String(severity.as_sym().to_string()),
        );

        let defaults: [(&str, Value); 6] = [
            ("timestamp", Value::String(timestamp::now_iso8601_millis())),
            ("pid", Value::from(std::process::id())),
            ("program", Value::String(program_name())),
            ("type", Value::String("app".to_string())),
            ("facility", Value::String("local0".to_string())),
            ("thread_id", Value::String(thread_id())),
        ];
        for (key, value) in defaults {
            if !data.contains_key(key) {
                data.insert(key.to_string(), value);
            }
        }
        if !data.contains_key("host") {
            data.insert(
                "host".to_string(),
                hostname().map(Value::String).unwrap_or(Value::Null),
            );
        }

        let mut meta = MetadataContext::current();
        match data.remove("meta") {
            Some(Value::Object(existing)) => {
                // caller-supplied meta keys win over ambient ones
                for (key, value) in existing {
                    meta.insert(key, value);
                }
                data.insert("meta".to_string(), Value::Object(meta));
            }
            Some(Value::Null) | None => {
                data.insert("meta".to_string(), Value::Object(meta));
            }
            Some(other) => {
                data.insert("meta".to_string(), other);
            }
        }

        if !data.contains_key("message") {
            let type_name = data
                .get("type")
                .map(plain_string)
                .unwrap_or_default();
            data.insert(
                "message".to_string(),
                Value::String(format!(
                    "a {} type log message of severity {}",
                    type_name, severity
                )),
            );
        }

        Event { data }
    }

    /// Convert an arbitrary payload plus overrides into an event.
    /// Override keys win in every branch.
    pub fn ify(payload: impl Into<LogPayload>, overrides: Fields) -> Self {
        let mut base = match payload.into() {
            LogPayload::Message(message) => {
                let mut fields = Fields::new();
                fields.insert("message".to_string(), Value::String(message));
                fields
            }
            LogPayload::Fields(fields) => fields,
            LogPayload::Error {
                class,
                message,
                backtrace,
            } => {
                let mut fields = Fields::new();
                fields.insert("error_class".to_string(), Value::String(class));
                fields.insert("message".to_string(), Value::String(message));
                fields.insert(
                    "backtrace".to_string(),
                    Value::Array(backtrace.into_iter().map(Value::String).collect()),
                );
                fields
            }
        };
        for (key, value) in overrides {
            base.insert(key, value);
        }
        Event::new(base)
    }

    /// Parse a serialized event line. Returns `None` for anything that is
    /// not a JSON object.
    pub fn parse(json: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Some(Event::new(map)),
            _ => None,
        }
    }

    /// Cheap probe used by line consumers: is this already one of our
    /// serialized events? True for a valid JSON object carrying an
    /// `emitter` key.
    pub fn is_event_line(json: &str) -> bool {
        matches!(
            serde_json::from_str::<Value>(json),
            Ok(Value::Object(map)) if map.contains_key("emitter")
        )
    }

    /// Serialize to a compact JSON line. On encoding failure the fallback
    /// is a barebones `{severity, message}` object with the message
    /// stripped of invalid text.
    pub fn to_json(&self) -> String {
        match serde_json::to_string(&self.data) {
            Ok(json) => json,
            Err(_) => {
                let message: String = self
                    .message()
                    .unwrap_or_default()
                    .chars()
                    .filter(|c| !c.is_control())
                    .collect();
                format!(
                    "{{\"severity\":\"{}\",\"message\":{}}}",
                    self.severity().as_sym(),
                    Value::String(message)
                )
            }
        }
    }

    pub fn as_map(&self) -> &Fields {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), normalize_value(value, 0));
    }

    pub fn severity(&self) -> Severity {
        match self.data.get("severity") {
            Some(Value::String(name)) => Severity::new(name),
            _ => Severity::Unknown,
        }
    }

    pub fn emitter(&self) -> Option<&str> {
        self.data.get("emitter").and_then(Value::as_str)
    }

    pub fn message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }

    /// Whether this event requests notifier fan-out. JSON `false` and
    /// `null` are falsy, everything else present is truthy.
    pub fn notify_requested(&self) -> bool {
        !matches!(
            self.data.get("notify"),
            None | Some(Value::Null) | Some(Value::Bool(false))
        )
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // data iterates in key order, so the canonical JSON is stable
        state.write(self.to_json().as_bytes());
    }
}

impl std::ops::Index<&str> for Event {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.data.get(key).unwrap_or(&Value::Null)
    }
}
