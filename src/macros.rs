//! Logging macros for ergonomic message formatting and field maps.
//!
//! The severity macros format their arguments like `println!` and log the
//! result through a [`Log`](crate::core::Log) instance; [`fields!`] builds
//! the field maps accepted by the `*_with` entry points.
//!
//! # Examples
//!
//! ```
//! use event_log_system::prelude::*;
//! use event_log_system::{fields, info};
//!
//! let log = Log::new();
//!
//! // Basic logging
//! info!(log, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(log, "Server listening on port {}", port);
//!
//! // With structured fields
//! log.info_with("User logged in", fields! { "user_id": 123 });
//! ```

/// Build a [`Fields`](crate::core::Fields) map with `json!` object syntax.
///
/// # Examples
///
/// ```
/// use event_log_system::fields;
///
/// let map = fields! { "user_id": 123, "meta": { "role": "admin" } };
/// assert_eq!(map["user_id"], 123);
/// ```
#[macro_export]
macro_rules! fields {
    ($($body:tt)*) => {
        match $crate::serde_json::json!({ $($body)* }) {
            $crate::serde_json::Value::Object(map) => map,
            _ => $crate::serde_json::Map::new(),
        }
    };
}

/// Log a message at an explicit severity with automatic formatting.
///
/// # Examples
///
/// ```
/// # use event_log_system::prelude::*;
/// # let log = Log::new();
/// use event_log_system::log;
/// log!(log, Severity::Info, "Simple message");
/// log!(log, Severity::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger.log($severity, format!($($arg)+))
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use event_log_system::prelude::*;
/// # let log = Log::new();
/// use event_log_system::debug;
/// debug!(log, "Debug information");
/// debug!(log, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Severity::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use event_log_system::prelude::*;
/// # let log = Log::new();
/// use event_log_system::info;
/// info!(log, "Application started");
/// info!(log, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Severity::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use event_log_system::prelude::*;
/// # let log = Log::new();
/// use event_log_system::warn;
/// warn!(log, "Low disk space");
/// warn!(log, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Severity::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use event_log_system::prelude::*;
/// # let log = Log::new();
/// use event_log_system::error;
/// error!(log, "Failed to connect to database");
/// error!(log, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Severity::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
///
/// # Examples
///
/// ```
/// # use event_log_system::prelude::*;
/// # let log = Log::new();
/// use event_log_system::fatal;
/// fatal!(log, "Critical system failure");
/// fatal!(log, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Severity::Fatal, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Log, Severity};

    #[test]
    fn test_fields_macro() {
        let map = fields! { "a": 1, "nested": { "b": true } };
        assert_eq!(map["a"], 1);
        assert_eq!(map["nested"]["b"], true);
        assert!(fields! {}.is_empty());
    }

    #[test]
    fn test_log_macro() {
        let log = Log::new();
        log!(log, Severity::Info, "Test message");
        log!(log, Severity::Info, "Formatted: {}", 42);
    }

    #[test]
    fn test_severity_macros() {
        let log = Log::new();
        debug!(log, "Debug message");
        info!(log, "Items: {}", 100);
        warn!(log, "Retry {} of {}", 1, 3);
        error!(log, "Code: {}", 500);
        fatal!(log, "Critical failure: {}", "system");
    }
}
