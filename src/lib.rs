//! # Event Log System
//!
//! A structured event logging framework: arbitrary application values are
//! normalized into JSON log events, enriched with severity, call site, and
//! thread-scoped metadata, fanned out to notification sinks, and written to
//! console streams or a capacity-bounded remote append log.
//!
//! ## Features
//!
//! - **Structured Events**: Every log call produces a flat, sorted JSON
//!   object with stable default fields
//! - **Scoped Metadata**: Thread-scoped key/value enrichment with RAII
//!   scoping
//! - **Pattern Formatting**: A small template language with object,
//!   timestamp, and printf-style directives plus configurable styling
//! - **Never Raises**: Failures inside the logging pipeline are contained
//!   and reported as events themselves
//! - **Capped Append Log**: A remote, size-bounded byte buffer with atomic
//!   chunked draining and local fallback

pub mod appenders;
pub mod core;
pub mod macros;

// `fields!` expands through this path, so callers do not need their own
// serde_json dependency.
pub use serde_json;

pub mod prelude {
    pub use crate::appenders::{CappedAppendLog, ConsoleAppender, MemoryStore, RemoteStore};
    pub use crate::core::{
        Appender, ContextGuard, Event, EventFormatter, Fields, FormatConfig, FormatOptions,
        Inspect, Log, LogBuilder, LogPayload, LoggerError, MetadataContext, Notifier,
        NotifierRegistry, Result, Severity, Style, StyleTokens, TimeDirective,
    };

    #[cfg(feature = "redis")]
    pub use crate::appenders::RedisStore;
}

pub use appenders::{CappedAppendLog, ConsoleAppender, MemoryStore, RemoteStore};
pub use core::{
    Appender, ContextGuard, Event, EventFormatter, Fields, FormatConfig, FormatOptions, Inspect,
    Log, LogBuilder, LogPayload, LoggerError, MetadataContext, Notifier, NotifierRegistry, Result,
    Severity, Style, StyleTokens, TimeDirective, EMITTER,
};

#[cfg(feature = "redis")]
pub use appenders::RedisStore;
