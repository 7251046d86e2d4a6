//! Redis backend for the capped append log
//!
//! Connects lazily and reconnects after connection loss. Connection-level
//! failures surface as `RemoteUnavailable`, which the append log turns
//! into a local fallback instead of an error for the caller.

use super::append_log::RemoteStore;
use crate::core::{LoggerError, Result};
use parking_lot::Mutex;
use redis::Commands;

/// [`RemoteStore`] over a Redis string key
///
/// # Example
///
/// ```no_run
/// use event_log_system::appenders::{CappedAppendLog, RedisStore};
///
/// let store = RedisStore::open("redis://127.0.0.1:6379").expect("redis url");
/// let log = CappedAppendLog::new(store, "app_log", 64 * 1024 * 1024);
/// log.write(b"a line of log data\n").expect("write");
/// ```
pub struct RedisStore {
    client: redis::Client,
    connection: Mutex<Option<redis::Connection>>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Create a store for a Redis URL. No connection is attempted until
    /// the first operation.
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| LoggerError::config("RedisStore", e.to_string()))?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    fn with_connection<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> Result<T> {
        let mut guard = self.connection.lock();
        if guard.is_none() {
            let connection = self.client.get_connection().map_err(|e| {
                LoggerError::remote_unavailable(operation, e.to_string())
            })?;
            *guard = Some(connection);
        }
        let connection = guard.as_mut().ok_or_else(|| {
            LoggerError::remote_unavailable(operation, "no connection")
        })?;
        match f(connection) {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_io_error()
                    || e.is_timeout()
                    || e.is_connection_refusal()
                    || e.is_connection_dropped()
                {
                    // drop the connection so the next call reconnects
                    *guard = None;
                    Err(LoggerError::remote_unavailable(operation, e.to_string()))
                } else {
                    Err(LoggerError::remote_store(operation, e.to_string()))
                }
            }
        }
    }
}

impl RemoteStore for RedisStore {
    fn append(&self, key: &str, data: &[u8]) -> Result<()> {
        self.with_connection("append", |c| {
            let _: usize = c.append(key, data)?;
            Ok(())
        })
    }

    fn strlen(&self, key: &str) -> Result<u64> {
        self.with_connection("strlen", |c| c.strlen(key))
    }

    fn getrange(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        self.with_connection("getrange", |c| {
            c.getrange(key, start as isize, end as isize)
        })
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.with_connection("rename", |c| c.rename(from, to))
    }

    fn del(&self, key: &str) -> Result<()> {
        self.with_connection("del", |c| {
            let _: usize = c.del(key)?;
            Ok(())
        })
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.with_connection("exists", |c| c.exists(key))
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.with_connection("keys", |c| c.keys(pattern))
    }
}
