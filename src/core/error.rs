//! Error types for the logging system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Remote store cannot be reached; callers fall back locally
    #[error("Remote store unreachable during {operation}: {message}")]
    RemoteUnavailable { operation: String, message: String },

    /// Remote store answered but the operation failed
    #[error("Remote store error during {operation}: {message}")]
    RemoteStore { operation: String, message: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a remote-unavailable error
    pub fn remote_unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::RemoteUnavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a remote store error
    pub fn remote_store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::RemoteStore {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error marks the remote store as unreachable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LoggerError::RemoteUnavailable { .. })
    }
}
