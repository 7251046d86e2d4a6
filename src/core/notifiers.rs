//! Notification sink registry and fan-out
//!
//! Events carrying a truthy `notify` field are fanned out to every
//! registered sink, in registration order. A misbehaving sink is isolated:
//! its panic is caught and reported so the remaining sinks still run.

use super::event::{Event, Fields};
use crate::core::log::panic_message;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A notification sink.
///
/// `notify` is required; `context` is an optional hook invoked with the
/// event's full serialized data before each notification and defaults to a
/// no-op. Registration of an object without `notify` is a compile error,
/// which replaces the reference implementation's runtime capability check.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, data: &Fields);

    fn context(&self, _data: &Fields) {}
}

/// Process-wide set of notification sinks.
///
/// Registration is expected to happen rarely (typically at startup);
/// fan-out reads take a shared lock and clone the sink list so callbacks
/// run without holding it.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: RwLock<Vec<Arc<dyn Notifier>>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sink; fan-out order is registration order.
    pub fn register(&self, notifier: Arc<dyn Notifier>) -> &Self {
        self.notifiers.write().push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.read().is_empty()
    }

    pub fn clear(&self) {
        self.notifiers.write().clear();
    }

    /// Fan an event out to all registered sinks. No-op unless the event
    /// requests notification. A panicking sink does not prevent later
    /// sinks from being notified.
    pub fn notify(&self, event: &Event) {
        if !event.notify_requested() {
            return;
        }
        let message = event.message().unwrap_or_default().to_string();
        let data = event.as_map().clone();
        let notifiers: Vec<Arc<dyn Notifier>> = self.notifiers.read().clone();
        for (idx, notifier) in notifiers.iter().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                notifier.context(&data);
                notifier.notify(&message, &data);
            }));
            if let Err(panic) = result {
                eprintln!(
                    "[LOGGER ERROR] Notifier #{} panicked: {}. \
                     Other notifiers continue to function.",
                    idx,
                    panic_message(&panic)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use parking_lot::Mutex;

    struct Recording {
        label: &'static str,
        calls: Arc<Mutex<Vec<(String, String)>>>,
        contexts: Arc<Mutex<usize>>,
    }

    impl Notifier for Recording {
        fn notify(&self, message: &str, data: &Fields) {
            let payload = serde_json::to_string(data).expect("payload");
            self.calls
                .lock()
                .push((format!("{}:{}", self.label, message), payload));
        }

        fn context(&self, _data: &Fields) {
            *self.contexts.lock() += 1;
        }
    }

    struct Panicking;

    impl Notifier for Panicking {
        fn notify(&self, _message: &str, _data: &Fields) {
            panic!("bad sink");
        }
    }

    fn recording(
        label: &'static str,
        calls: &Arc<Mutex<Vec<(String, String)>>>,
        contexts: &Arc<Mutex<usize>>,
    ) -> Arc<dyn Notifier> {
        Arc::new(Recording {
            label,
            calls: Arc::clone(calls),
            contexts: Arc::clone(contexts),
        })
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let contexts = Arc::new(Mutex::new(0));
        let registry = NotifierRegistry::new();
        registry.register(recording("a", &calls, &contexts));
        registry.register(recording("b", &calls, &contexts));

        let event = Event::ify("ping", fields! { "notify": true });
        registry.notify(&event);

        let calls = calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "a:ping");
        assert_eq!(calls[1].0, "b:ping");
        // identical payloads for every sink
        assert_eq!(calls[0].1, calls[1].1);
        assert_eq!(*contexts.lock(), 2);
    }

    #[test]
    fn test_no_notify_flag_is_a_noop() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let contexts = Arc::new(Mutex::new(0));
        let registry = NotifierRegistry::new();
        registry.register(recording("a", &calls, &contexts));

        registry.notify(&Event::ify("quiet", Fields::new()));
        assert!(calls.lock().is_empty());
        assert_eq!(*contexts.lock(), 0);
    }

    #[test]
    fn test_panicking_sink_is_isolated() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let contexts = Arc::new(Mutex::new(0));
        let registry = NotifierRegistry::new();
        registry.register(Arc::new(Panicking));
        registry.register(recording("after", &calls, &contexts));

        let event = Event::ify("boom", fields! { "notify": true });
        registry.notify(&event);

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "after:boom");
    }

    #[test]
    fn test_registry_bookkeeping() {
        let registry = NotifierRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(Panicking));
        assert_eq!(registry.len(), 1);
        registry.clear();
        assert!(registry.is_empty());
    }
}
