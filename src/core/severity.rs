//! Severity level definitions

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// Ordered log severity.
///
/// `Unknown` is the sentinel for unrecognized input and ranks above every
/// regular level, so it is never filtered out by a minimum-level threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
    Unknown = 5,
}

impl Severity {
    /// Canonicalize a name into a severity. Never fails; unrecognized
    /// names map to `Unknown`.
    pub fn new(name: impl AsRef<str>) -> Self {
        match name.as_ref().to_uppercase().as_str() {
            "DEBUG" => Severity::Debug,
            "INFO" => Severity::Info,
            "WARN" | "WARNING" => Severity::Warn,
            "ERROR" => Severity::Error,
            "FATAL" => Severity::Fatal,
            _ => Severity::Unknown,
        }
    }

    /// Canonical uppercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// Wire form, as stored in serialized events
    pub fn as_sym(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
            Severity::Unknown => "unknown",
        }
    }

    /// Integer rank used for ordering
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// All severities in ascending rank order
    pub fn all() -> [Severity; 6] {
        [
            Severity::Debug,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
            Severity::Unknown,
        ]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Severity {
    fn from(name: &str) -> Self {
        Severity::new(name)
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_sym())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Severity::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        assert!(Severity::Fatal < Severity::Unknown);
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(Severity::new("nonsense"), Severity::Unknown);
        assert_eq!(Severity::new(""), Severity::Unknown);
        assert_eq!(Severity::new("123"), Severity::Unknown);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(Severity::new("Info"), Severity::Info);
        assert_eq!(Severity::new("FATAL"), Severity::Fatal);
        assert_eq!(Severity::new("warning"), Severity::Warn);
    }

    #[test]
    fn test_display_and_sym() {
        assert_eq!(Severity::Warn.to_string(), "WARN");
        assert_eq!(Severity::Warn.as_sym(), "warn");
        assert_eq!(Severity::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_all_is_sorted() {
        let all = Severity::all();
        for pair in all.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_serde_wire_form() {
        let json = serde_json::to_string(&Severity::Error).expect("serialize");
        assert_eq!(json, "\"error\"");

        let parsed: Severity = serde_json::from_str("\"warn\"").expect("deserialize");
        assert_eq!(parsed, Severity::Warn);

        let parsed: Severity = serde_json::from_str("\"bogus\"").expect("deserialize");
        assert_eq!(parsed, Severity::Unknown);
    }
}
