//! Appender trait for log output destinations

use super::error::Result;
use super::severity::Severity;

/// An output sink accepting serialized event lines at a severity.
pub trait Appender: Send + Sync {
    fn append(&mut self, severity: Severity, line: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
