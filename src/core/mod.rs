//! Core logging types and traits

pub mod appender;
pub mod error;
pub mod event;
pub mod formatter;
pub mod log;
pub mod metadata;
pub mod notifiers;
pub mod severity;
pub mod timestamp;

pub use appender::Appender;
pub use error::{LoggerError, Result};
pub use event::{Event, Fields, Inspect, LogPayload, MAX_NESTING_DEPTH};
pub use formatter::{EventFormatter, FormatConfig, FormatOptions, Style, StyleTokens};
pub use log::{Log, LogBuilder, EMITTER};
pub use metadata::{ContextGuard, MetadataContext};
pub use notifiers::{Notifier, NotifierRegistry};
pub use severity::Severity;
pub use timestamp::TimeDirective;
