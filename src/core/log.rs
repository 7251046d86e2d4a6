//! Logger facade
//!
//! [`Log`] is the public entry point: one method per severity plus a
//! generic [`Log::output`]. Every call builds an [`Event`], records the
//! call site, fans the event out to notifiers, and writes the serialized
//! line to the configured appenders.
//!
//! Every entry point runs inside a containment boundary: a panic during
//! event construction or emission is converted into a fatal event and
//! re-emitted once, with a plain-text crash line as the last resort.
//! Logging never panics into application code.

use super::appender::Appender;
use super::event::{Event, Fields, LogPayload};
use super::notifiers::NotifierRegistry;
use super::severity::Severity;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe, Location};
use std::sync::Arc;
use std::time::Instant;

/// Value of the `emitter` field attached to every emitted event. Line
/// consumers use its presence to recognize already-structured lines.
pub const EMITTER: &str = "log";

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

pub struct Log {
    min_level: RwLock<Severity>,
    appenders: RwLock<Vec<Box<dyn Appender>>>,
    notifiers: Arc<NotifierRegistry>,
}

impl Log {
    /// Logger writing to stderr at `debug` and above
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> LogBuilder {
        LogBuilder::new()
    }

    pub fn add_appender(&self, appender: Box<dyn Appender>) {
        self.appenders.write().push(appender);
    }

    pub fn set_min_level(&self, level: Severity) {
        *self.min_level.write() = level;
    }

    pub fn min_level(&self) -> Severity {
        *self.min_level.read()
    }

    pub fn notifiers(&self) -> &NotifierRegistry {
        &self.notifiers
    }

    /// Logs a payload on severity debug.
    #[track_caller]
    pub fn debug<P: Into<LogPayload>>(&self, object: P) -> &Self {
        self.entry(Some(Severity::Debug), object, Fields::new(), Location::caller())
    }

    /// Logs a payload on severity debug with extra fields.
    #[track_caller]
    pub fn debug_with<P: Into<LogPayload>>(&self, object: P, rest: Fields) -> &Self {
        self.entry(Some(Severity::Debug), object, rest, Location::caller())
    }

    /// Logs a payload on severity info.
    #[track_caller]
    pub fn info<P: Into<LogPayload>>(&self, object: P) -> &Self {
        self.entry(Some(Severity::Info), object, Fields::new(), Location::caller())
    }

    /// Logs a payload on severity info with extra fields.
    #[track_caller]
    pub fn info_with<P: Into<LogPayload>>(&self, object: P, rest: Fields) -> &Self {
        self.entry(Some(Severity::Info), object, rest, Location::caller())
    }

    /// Logs a payload on severity warn.
    #[track_caller]
    pub fn warn<P: Into<LogPayload>>(&self, object: P) -> &Self {
        self.entry(Some(Severity::Warn), object, Fields::new(), Location::caller())
    }

    /// Logs a payload on severity warn with extra fields.
    #[track_caller]
    pub fn warn_with<P: Into<LogPayload>>(&self, object: P, rest: Fields) -> &Self {
        self.entry(Some(Severity::Warn), object, rest, Location::caller())
    }

    /// Logs a payload on severity error.
    #[track_caller]
    pub fn error<P: Into<LogPayload>>(&self, object: P) -> &Self {
        self.entry(Some(Severity::Error), object, Fields::new(), Location::caller())
    }

    /// Logs a payload on severity error with extra fields.
    #[track_caller]
    pub fn error_with<P: Into<LogPayload>>(&self, object: P, rest: Fields) -> &Self {
        self.entry(Some(Severity::Error), object, rest, Location::caller())
    }

    /// Logs a payload on severity fatal.
    #[track_caller]
    pub fn fatal<P: Into<LogPayload>>(&self, object: P) -> &Self {
        self.entry(Some(Severity::Fatal), object, Fields::new(), Location::caller())
    }

    /// Logs a payload on severity fatal with extra fields.
    #[track_caller]
    pub fn fatal_with<P: Into<LogPayload>>(&self, object: P, rest: Fields) -> &Self {
        self.entry(Some(Severity::Fatal), object, rest, Location::caller())
    }

    /// Logs a payload at an explicit severity (macro seam).
    #[track_caller]
    pub fn log<P: Into<LogPayload>>(&self, severity: Severity, object: P) -> &Self {
        self.entry(Some(severity), object, Fields::new(), Location::caller())
    }

    /// Logs a payload honoring a `severity` key in `rest` (debug when
    /// absent).
    #[track_caller]
    pub fn output<P: Into<LogPayload>>(&self, object: P, rest: Fields) -> &Self {
        self.entry(None, object, rest, Location::caller())
    }

    /// Emits a pre-built event: attaches call site and emitter, notifies,
    /// writes.
    #[track_caller]
    pub fn emit(&self, event: Event) -> &Self {
        let location = Location::caller();
        let mut event = event;
        self.protect(move || {
            self.emit_at(&mut event, Some(location));
        })
    }

    /// Emits a metric event (`type: "metric"`) with a name and value.
    #[track_caller]
    pub fn metric(&self, name: impl Into<String>, value: impl Into<Value>, rest: Fields) -> &Self {
        let location = Location::caller();
        let name = name.into();
        let value = value.into();
        self.protect(move || {
            self.emit_metric(name, value, rest, location);
        })
    }

    /// Runs `f`, emits a metric named `name` with the measured duration in
    /// seconds, and returns the closure's result. The metric is emitted
    /// even when `f` panics; the panic then resumes.
    #[track_caller]
    pub fn measure<R>(&self, name: impl Into<String>, f: impl FnOnce() -> R) -> R {
        let location = Location::caller();
        let name = name.into();
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(f));
        let duration = start.elapsed().as_secs_f64();
        let mut rest = Fields::new();
        rest.insert("duration".to_string(), Value::from(duration));
        rest.insert("success".to_string(), Value::Bool(result.is_ok()));
        self.protect(|| {
            self.emit_metric(name, Value::from(duration), rest, location);
        });
        match result {
            Ok(value) => value,
            Err(panic) => resume_unwind(panic),
        }
    }

    pub fn flush(&self) -> super::error::Result<()> {
        let mut appenders = self.appenders.write();
        for appender in appenders.iter_mut() {
            appender.flush()?;
        }
        Ok(())
    }

    fn entry<P: Into<LogPayload>>(
        &self,
        severity: Option<Severity>,
        object: P,
        rest: Fields,
        location: &'static Location<'static>,
    ) -> &Self {
        self.protect(move || {
            let mut rest = rest;
            if let Some(severity) = severity {
                // the entry point's severity wins over a caller-supplied one
                rest.insert(
                    "severity".to_string(),
                    Value::String(severity.as_sym().to_string()),
                );
            }
            let mut event = Event::ify(object, rest);
            self.emit_at(&mut event, Some(location));
        })
    }

    fn emit_metric(
        &self,
        name: String,
        value: Value,
        rest: Fields,
        location: &'static Location<'static>,
    ) {
        let mut rest = rest;
        if !rest.contains_key("message") {
            rest.insert(
                "message".to_string(),
                Value::String(format!(
                    "a metric {}={}",
                    name,
                    super::event::plain_string(&value)
                )),
            );
        }
        let mut base = Fields::new();
        base.insert("name".to_string(), Value::String(name));
        base.insert("value".to_string(), value);
        base.insert("type".to_string(), Value::String("metric".to_string()));
        let mut event = Event::ify(LogPayload::Fields(base), rest);
        self.emit_at(&mut event, Some(location));
    }

    fn emit_at(&self, event: &mut Event, location: Option<&'static Location<'static>>) {
        if let Some(location) = location {
            event.insert(
                "location",
                Value::String(format!("{}:{}", location.file(), location.line())),
            );
        }
        event.insert("emitter", Value::String(EMITTER.to_string()));
        self.notifiers.notify(event);
        let severity = event.severity();
        if severity < *self.min_level.read() {
            return;
        }
        let line = event.to_json();
        self.write_line(severity, &line);
    }

    /// Write a line to every appender, isolating failures per appender so
    /// one broken sink cannot silence the others.
    fn write_line(&self, severity: Severity, line: &str) {
        let mut appenders = self.appenders.write();
        for (idx, appender) in appenders.iter_mut().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| appender.append(severity, line)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Appender #{} failed: {}", idx, e);
                }
                Err(panic) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Appender #{} panicked: {}. \
                         Other appenders continue to function.",
                        idx,
                        panic_message(&panic)
                    );
                }
            }
        }
    }

    /// Containment boundary for every public entry point. A panic inside
    /// `f` is turned into a fatal event and emitted once; if that emission
    /// panics too, a plain-text crash line goes straight to the appenders.
    /// Nothing propagates to the caller.
    fn protect<F: FnOnce()>(&self, f: F) -> &Self {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
            let message = panic_message(&panic);
            let recovered = catch_unwind(AssertUnwindSafe(|| {
                let mut rest = Fields::new();
                rest.insert(
                    "severity".to_string(),
                    Value::String(Severity::Fatal.as_sym().to_string()),
                );
                rest.insert(
                    "error_class".to_string(),
                    Value::String("panic".to_string()),
                );
                let mut event = Event::ify(format!("panic: {}", message), rest);
                self.emit_at(&mut event, None);
            }));
            if recovered.is_err() {
                self.write_line(
                    Severity::Fatal,
                    &format!("Crashed during logging with panic: {}", message),
                );
            }
        }
        self
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing [`Log`] with a fluent API
///
/// # Example
/// ```
/// use event_log_system::prelude::*;
///
/// let log = Log::builder()
///     .min_level(Severity::Info)
///     .appender(ConsoleAppender::new())
///     .build();
/// log.info("Server started");
/// ```
pub struct LogBuilder {
    min_level: Severity,
    appenders: Vec<Box<dyn Appender>>,
    notifiers: Option<Arc<NotifierRegistry>>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self {
            min_level: Severity::Debug,
            appenders: Vec::new(),
            notifiers: None,
        }
    }

    /// Set minimum severity written to appenders
    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: Severity) -> Self {
        self.min_level = level;
        self
    }

    /// Add an appender
    #[must_use = "builder methods return a new value"]
    pub fn appender<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.appenders.push(Box::new(appender));
        self
    }

    /// Share a notifier registry with other loggers
    #[must_use = "builder methods return a new value"]
    pub fn notifiers(mut self, notifiers: Arc<NotifierRegistry>) -> Self {
        self.notifiers = Some(notifiers);
        self
    }

    /// Build the logger. With no appender configured, events go to stderr.
    pub fn build(self) -> Log {
        let mut appenders = self.appenders;
        if appenders.is_empty() {
            appenders.push(Box::new(crate::appenders::ConsoleAppender::stderr()));
        }
        Log {
            min_level: RwLock::new(self.min_level),
            appenders: RwLock::new(appenders),
            notifiers: self.notifiers.unwrap_or_default(),
        }
    }
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}
