//! Execution-unit-scoped metadata
//!
//! Every log event is enriched with the metadata of the thread that emits
//! it. The storage is thread-local, so concurrently running threads never
//! observe each other's scoped data.
//!
//! # Example
//!
//! ```
//! use event_log_system::core::MetadataContext;
//! use event_log_system::fields;
//!
//! MetadataContext::with_scope(fields! { "request_id": "abc-123" }, |meta| {
//!     assert_eq!(meta["request_id"], "abc-123");
//!     // events emitted here carry request_id in their meta field
//! });
//! assert!(!MetadataContext::current().contains_key("request_id"));
//! ```

use super::event::{normalize_value, Fields};
use serde_json::Value;
use std::cell::RefCell;

thread_local! {
    static METADATA: RefCell<Fields> = RefCell::new(Fields::new());
}

/// Handle to the current thread's metadata store.
///
/// All operations address the calling thread's storage; the type itself
/// carries no state.
#[derive(Debug, Clone, Copy)]
pub struct MetadataContext;

impl MetadataContext {
    /// Snapshot of the current thread's metadata
    pub fn current() -> Fields {
        METADATA.with(|m| m.borrow().clone())
    }

    /// Shallow union of `data` over the current metadata; keys in `data`
    /// take precedence over already present ones.
    pub fn add(data: Fields) -> Self {
        METADATA.with(|m| {
            let mut meta = m.borrow_mut();
            for (key, value) in data {
                meta.insert(key, normalize_value(value, 0));
            }
        });
        MetadataContext
    }

    /// Remove the named keys, leaving all others untouched.
    ///
    /// Accepts any iterator of key strings; pass a map's `keys()` to remove
    /// by mapping.
    pub fn remove<I>(keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        METADATA.with(|m| {
            let mut meta = m.borrow_mut();
            for key in keys {
                meta.remove(key.as_ref());
            }
        });
        MetadataContext
    }

    /// Drop all metadata of the current thread
    pub fn clear() {
        METADATA.with(|m| m.borrow_mut().clear());
    }

    pub fn is_empty() -> bool {
        METADATA.with(|m| m.borrow().is_empty())
    }

    /// Add `data` for the lifetime of the returned guard. Dropping the
    /// guard removes exactly the keys added here and restores any values
    /// they shadowed, so scopes nest correctly.
    pub fn scoped(data: Fields) -> ContextGuard {
        ContextGuard::new(data)
    }

    /// Add `data`, run `f` with a snapshot of the merged metadata, and
    /// restore the prior state on every exit path, including panics.
    pub fn with_scope<R>(data: Fields, f: impl FnOnce(&Fields) -> R) -> R {
        let _guard = Self::scoped(data);
        let snapshot = Self::current();
        f(&snapshot)
    }
}

/// RAII guard restoring the metadata state captured at construction.
///
/// Created by [`MetadataContext::scoped`].
pub struct ContextGuard {
    saved: Vec<(String, Option<Value>)>,
}

impl ContextGuard {
    fn new(data: Fields) -> Self {
        let saved = METADATA.with(|m| {
            let mut meta = m.borrow_mut();
            data.into_iter()
                .map(|(key, value)| {
                    let previous = meta.insert(key.clone(), normalize_value(value, 0));
                    (key, previous)
                })
                .collect()
        });
        ContextGuard { saved }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        METADATA.with(|m| {
            let mut meta = m.borrow_mut();
            for (key, previous) in self.saved.drain(..) {
                match previous {
                    Some(value) => {
                        meta.insert(key, value);
                    }
                    None => {
                        meta.remove(&key);
                    }
                }
            }
        });
    }
}
