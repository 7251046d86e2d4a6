//! Capacity-bounded remote append log
//!
//! [`CappedAppendLog`] treats a single named remote byte string as a
//! rolling buffer: appenders write serialized event lines to it, and a
//! consumer drains it with [`CappedAppendLog::each_chunk`] or
//! [`CappedAppendLog::each_line`]. Draining atomically renames the live
//! key to a temporary one, so concurrent writers immediately start a fresh
//! buffer while the drain reads the renamed snapshot.
//!
//! When the remote store is unreachable the operation falls back, per
//! call, to a local writer (stderr by default) instead of failing the
//! caller.

use crate::core::{Appender, LoggerError, Result, Severity};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

/// Smallest accepted buffer size
pub const MIN_BUFFER_SIZE: u64 = 64 * 1024;
/// Largest accepted buffer size, just under the remote string hard limit
pub const MAX_BUFFER_SIZE: u64 = 511 * 1024 * 1024;
/// Default buffer size
pub const DEFAULT_BUFFER_SIZE: u64 = MAX_BUFFER_SIZE;

/// Byte-string store interface required by the append log.
///
/// Semantics follow the usual remote string commands: `strlen` of a
/// missing key is 0, `getrange` bounds are inclusive, `rename` of a
/// missing key is an error, `del` of a missing key is not.
pub trait RemoteStore: Send + Sync {
    fn append(&self, key: &str, data: &[u8]) -> Result<()>;
    fn strlen(&self, key: &str) -> Result<u64>;
    fn getrange(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>>;
    fn rename(&self, from: &str, to: &str) -> Result<()>;
    fn del(&self, key: &str) -> Result<()>;
    fn exists(&self, key: &str) -> Result<bool>;
    /// Keys matching a glob-style pattern (trailing `*` at minimum)
    fn keys(&self, pattern: &str) -> Result<Vec<String>>;
}

impl<S: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<S> {
    fn append(&self, key: &str, data: &[u8]) -> Result<()> {
        (**self).append(key, data)
    }

    fn strlen(&self, key: &str) -> Result<u64> {
        (**self).strlen(key)
    }

    fn getrange(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        (**self).getrange(key, start, end)
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        (**self).rename(from, to)
    }

    fn del(&self, key: &str) -> Result<()> {
        (**self).del(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        (**self).keys(pattern)
    }
}

/// In-process store with remote string semantics. Used by tests and as a
/// local stand-in when no remote is configured.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw contents of a key, for inspection
    pub fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }
}

impl RemoteStore for MemoryStore {
    fn append(&self, key: &str, data: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn strlen(&self, key: &str) -> Result<u64> {
        Ok(self.entries.lock().get(key).map_or(0, |v| v.len() as u64))
    }

    fn getrange(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let entries = self.entries.lock();
        let Some(data) = entries.get(key) else {
            return Ok(Vec::new());
        };
        let len = data.len() as u64;
        if start >= len {
            return Ok(Vec::new());
        }
        let upper = end.min(len - 1) as usize;
        Ok(data[start as usize..=upper].to_vec())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        match entries.remove(from) {
            Some(data) => {
                entries.insert(to.to_string(), data);
                Ok(())
            }
            None => Err(LoggerError::remote_store("rename", "no such key")),
        }
    }

    fn del(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().contains_key(key))
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock();
        let matches = match pattern.strip_suffix('*') {
            Some(prefix) => entries
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            None => entries
                .keys()
                .filter(|k| k.as_str() == pattern)
                .cloned()
                .collect(),
        };
        Ok(matches)
    }
}

/// Capacity-bounded append log over a remote byte string
pub struct CappedAppendLog<S: RemoteStore> {
    store: S,
    name: String,
    buffer_size: u64,
    capacity_warned: AtomicBool,
    fallback_warned: AtomicBool,
    fallback: Mutex<Box<dyn Write + Send>>,
}

impl<S: RemoteStore> CappedAppendLog<S> {
    /// Open an append log over `store`. `buffer_size` is clamped to
    /// [`MIN_BUFFER_SIZE`]..=[`MAX_BUFFER_SIZE`]; leftover temporary keys
    /// from interrupted drains are swept.
    pub fn new(store: S, name: impl Into<String>, buffer_size: u64) -> Self {
        let log = Self {
            store,
            name: name.into(),
            buffer_size: buffer_size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE),
            capacity_warned: AtomicBool::new(false),
            fallback_warned: AtomicBool::new(false),
            fallback: Mutex::new(Box::new(std::io::stderr())),
        };
        let _ = log.sweep_orphans();
        log
    }

    /// Replace the local fallback writer (stderr by default)
    #[must_use]
    pub fn with_fallback(mut self, fallback: Box<dyn Write + Send>) -> Self {
        self.fallback = Mutex::new(fallback);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current remote buffer length in bytes
    pub fn len(&self) -> Result<u64> {
        self.store.strlen(&self.name)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append bytes to the buffer. Writes are silently dropped once the
    /// buffer has reached 96% of its configured size; a single local
    /// warning is logged when it enters the 95% band. An unreachable
    /// store diverts the write to the local fallback.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let len = match self.store.strlen(&self.name) {
            Ok(len) => len,
            Err(e) if e.is_unavailable() => return self.write_fallback(data),
            Err(e) => return Err(e),
        };
        if len >= self.buffer_size / 100 * 96 {
            return Ok(());
        }
        if len >= self.buffer_size / 100 * 95 && !self.capacity_warned.swap(true, Ordering::Relaxed)
        {
            eprintln!(
                "[LOGGER WARNING] Append log '{}' is above 95% of its {} byte buffer. \
                 Writes stop at 96% unless log data is pushed away.",
                self.name, self.buffer_size
            );
        }
        match self.store.append(&self.name, data) {
            Ok(()) => Ok(()),
            Err(e) if e.is_unavailable() => self.write_fallback(data),
            Err(e) => Err(e),
        }
    }

    /// Delete the remote buffer and rearm the capacity warning
    pub fn clear(&self) -> Result<()> {
        self.store.del(&self.name)?;
        self.capacity_warned.store(false, Ordering::Relaxed);
        Ok(())
    }

    /// Destructively drain the buffer as a lazy sequence of byte chunks.
    ///
    /// The live key is renamed to a temporary key up front, so writers
    /// observed after this call land in a fresh buffer. Each pull performs
    /// one remote range read; the temporary key is deleted when the
    /// sequence is exhausted. An unreachable store yields an empty
    /// sequence after a local warning.
    pub fn each_chunk(&self, chunk_size: u64) -> Result<Chunks<'_, S>> {
        if chunk_size == 0 {
            return Err(LoggerError::config(
                "CappedAppendLog",
                "chunk_size > 0 required",
            ));
        }
        Ok(Chunks {
            log: self,
            chunk_size,
            state: ChunkState::Start,
        })
    }

    /// Drain the buffer as a lazy sequence of newline-terminated lines; a
    /// trailing unterminated line is yielded last.
    pub fn each_line(&self, chunk_size: u64) -> Result<Lines<'_, S>> {
        Ok(Lines {
            chunks: self.each_chunk(chunk_size)?,
            buffer: Vec::new(),
            exhausted: false,
        })
    }

    /// Delete temporary keys left behind by interrupted drains
    pub fn sweep_orphans(&self) -> Result<usize> {
        let pattern = format!("{}_*", self.name);
        let orphans = self.store.keys(&pattern)?;
        let mut swept = 0;
        for key in orphans {
            self.store.del(&key)?;
            swept += 1;
        }
        Ok(swept)
    }

    fn write_fallback(&self, data: &[u8]) -> Result<()> {
        if !self.fallback_warned.swap(true, Ordering::Relaxed) {
            eprintln!(
                "[LOGGER WARNING] Remote store for append log '{}' is unreachable; \
                 falling back to the local sink.",
                self.name
            );
        }
        let mut fallback = self.fallback.lock();
        fallback.write_all(data)?;
        fallback.flush()?;
        Ok(())
    }

    fn begin_drain(&self) -> Result<Option<(String, u64)>> {
        if !self.store.exists(&self.name)? {
            return Ok(None);
        }
        let tmp = format!("{}_{:016x}", self.name, rand::random::<u64>());
        self.store.rename(&self.name, &tmp)?;
        let len = self.store.strlen(&tmp)?;
        Ok(Some((tmp, len)))
    }

    fn drain_warn(&self, error: &LoggerError) {
        eprintln!(
            "[LOGGER WARNING] Drain of append log '{}' stopped: {}",
            self.name, error
        );
    }
}

impl<S: RemoteStore> Appender for CappedAppendLog<S> {
    fn append(&mut self, _severity: Severity, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.write(&data)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "append_log"
    }
}

enum ChunkState {
    Start,
    Reading { tmp: String, offset: u64, end: u64 },
    Done,
}

/// Lazy, destructive chunk drain. See [`CappedAppendLog::each_chunk`].
pub struct Chunks<'a, S: RemoteStore> {
    log: &'a CappedAppendLog<S>,
    chunk_size: u64,
    state: ChunkState,
}

impl<S: RemoteStore> Iterator for Chunks<'_, S> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        loop {
            match std::mem::replace(&mut self.state, ChunkState::Done) {
                ChunkState::Start => match self.log.begin_drain() {
                    Ok(None) => return None,
                    Ok(Some((tmp, 0))) => {
                        let _ = self.log.store.del(&tmp);
                        return None;
                    }
                    Ok(Some((tmp, len))) => {
                        self.state = ChunkState::Reading {
                            tmp,
                            offset: 0,
                            end: len - 1,
                        };
                    }
                    Err(e) => {
                        self.log.drain_warn(&e);
                        return None;
                    }
                },
                ChunkState::Reading { tmp, offset, end } => {
                    if offset > end {
                        if let Err(e) = self.log.store.del(&tmp) {
                            // leave the key for a later sweep
                            self.log.drain_warn(&e);
                        }
                        return None;
                    }
                    let upper = end.min(offset + self.chunk_size - 1);
                    match self.log.store.getrange(&tmp, offset, upper) {
                        Ok(chunk) => {
                            self.state = ChunkState::Reading {
                                tmp,
                                offset: offset + self.chunk_size,
                                end,
                            };
                            return Some(chunk);
                        }
                        Err(e) => {
                            self.log.drain_warn(&e);
                            return None;
                        }
                    }
                }
                ChunkState::Done => return None,
            }
        }
    }
}

/// Lazy line drain layered on [`Chunks`]. See
/// [`CappedAppendLog::each_line`].
pub struct Lines<'a, S: RemoteStore> {
    chunks: Chunks<'a, S>,
    buffer: Vec<u8>,
    exhausted: bool,
}

impl<S: RemoteStore> Iterator for Lines<'_, S> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
            if self.exhausted {
                if self.buffer.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut self.buffer);
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
            match self.chunks.next() {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => self.exhausted = true,
            }
        }
    }
}
