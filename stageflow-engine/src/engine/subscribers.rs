//! Subscriber registry for committed-state notifications.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::warn;

/// A listener called with `(stage, data)` after every committed change.
pub type Subscriber = Arc<dyn Fn(&str, &Value) + Send + Sync>;

type SubscriberList = RwLock<Vec<(u64, Subscriber)>>;

/// Ordered list of subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Arc<SubscriberList>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener; it is notified after those registered earlier.
    pub fn subscribe(&self, subscriber: Subscriber) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.write().push((id, subscriber));
        Subscription {
            id,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    /// Calls every listener in registration order.
    ///
    /// The list is copied first, so listeners may subscribe or unsubscribe
    /// while being notified. A panicking listener is logged and skipped.
    pub fn notify(&self, stage: &str, data: &Value) {
        let subscribers: Vec<Subscriber> =
            self.subscribers.read().iter().map(|(_, s)| s.clone()).collect();
        for subscriber in subscribers {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                subscriber(stage, data);
            })) {
                warn!(stage, "Subscriber panicked: {:?}", e);
            }
        }
    }

    /// Returns the number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns true if nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberList>,
}

impl Subscription {
    /// Removes the listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut subscribers = registry.write();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != self.id);
        subscribers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_notify_in_registration_order() {
        let registry = SubscriberRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let log = log.clone();
            registry.subscribe(Arc::new(move |stage: &str, _data: &Value| {
                log.lock().push(format!("{name}:{stage}"));
            }));
        }

        registry.notify("main", &json!(null));
        assert_eq!(*log.lock(), vec!["first:main", "second:main"]);
    }

    #[test]
    fn test_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        let subscription = registry.subscribe(Arc::new(move |_: &str, _: &Value| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        registry.notify("a", &Value::Null);
        assert!(subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        registry.notify("b", &Value::Null);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_others() {
        let registry = SubscriberRegistry::new();
        let reached = Arc::new(AtomicU64::new(0));
        let reached_clone = reached.clone();

        registry.subscribe(Arc::new(|_: &str, _: &Value| panic!("Intentional panic")));
        registry.subscribe(Arc::new(move |_: &str, _: &Value| {
            reached_clone.fetch_add(1, Ordering::SeqCst);
        }));

        registry.notify("a", &Value::Null);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }
}
