//! Console appender implementation

use crate::core::{Appender, Result, Severity};

/// Writes event lines to the process streams.
///
/// By default lines at `error` and above go to stderr and everything else
/// to stdout; [`ConsoleAppender::stderr`] routes all lines to stderr, the
/// traditional destination of a default logger.
pub struct ConsoleAppender {
    stderr_only: bool,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self { stderr_only: false }
    }

    /// All severities to stderr
    pub fn stderr() -> Self {
        Self { stderr_only: true }
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, severity: Severity, line: &str) -> Result<()> {
        if self.stderr_only || severity >= Severity::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        use std::io::Write;
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
