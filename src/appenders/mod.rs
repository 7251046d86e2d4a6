//! Appender implementations

pub mod append_log;
pub mod console;

#[cfg(feature = "redis")]
pub mod redis;

pub use append_log::{
    CappedAppendLog, Chunks, Lines, MemoryStore, RemoteStore, DEFAULT_BUFFER_SIZE,
    MAX_BUFFER_SIZE, MIN_BUFFER_SIZE,
};
pub use console::ConsoleAppender;

#[cfg(feature = "redis")]
pub use redis::RedisStore;

// Re-export the trait for backward compatibility
pub use crate::core::Appender;
