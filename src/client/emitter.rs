//! Ordered multi-listener event hub keyed by event name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// Callback invoked with the raw inbound message.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by subscriptions; pass it to `off` to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    once: bool,
    listener: Listener,
}

/// Publish/subscribe hub.
///
/// Listeners run synchronously in registration order. The registry lock is
/// released before any listener runs, so listeners may subscribe,
/// unsubscribe or emit re-entrantly.
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<Registration>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, event: &str, listener: Listener) -> ListenerId {
        self.register(event, listener, false)
    }

    /// Like [`EventHub::on`], removed before its first invocation.
    pub fn once(&self, event: &str, listener: Listener) -> ListenerId {
        self.register(event, listener, true)
    }

    /// Remove one listener, or every listener for `event` when `id` is `None`.
    /// Returns how many were removed.
    pub fn off(&self, event: &str, id: Option<ListenerId>) -> usize {
        let mut listeners = self.lock();
        let Some(registrations) = listeners.get_mut(event) else {
            return 0;
        };
        let before = registrations.len();
        match id {
            Some(id) => registrations.retain(|registration| registration.id != id),
            None => registrations.clear(),
        }
        let removed = before - registrations.len();
        if registrations.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    pub fn off_all(&self) {
        self.lock().clear();
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    /// Invoke every listener for `event`. Returns whether any ran.
    pub fn emit(&self, event: &str, payload: &Value) -> bool {
        let snapshot: Vec<Listener> = {
            let mut listeners = self.lock();
            let Some(registrations) = listeners.get_mut(event) else {
                return false;
            };
            let snapshot = registrations
                .iter()
                .map(|registration| Arc::clone(&registration.listener))
                .collect();
            registrations.retain(|registration| !registration.once);
            if registrations.is_empty() {
                listeners.remove(event);
            }
            snapshot
        };

        for listener in &snapshot {
            listener(payload);
        }
        !snapshot.is_empty()
    }

    fn register(&self, event: &str, listener: Listener, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(event.to_string())
            .or_default()
            .push(Registration { id, once, listener });
        id
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Registration>>> {
        // A panicking listener never runs under this lock.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Listener {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |_payload: &Value| log.lock().unwrap().push(tag.clone()))
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let hub = EventHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.on("a", recorder(&log, "first"));
        hub.on("a", recorder(&log, "second"));
        hub.on("b", recorder(&log, "other"));

        assert!(hub.emit("a", &json!({})));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let hub = EventHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.once("a", recorder(&log, "once"));
        hub.on("a", recorder(&log, "always"));

        hub.emit("a", &json!({}));
        hub.emit("a", &json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["once", "always", "always"]);
        assert_eq!(hub.listener_count("a"), 1);
    }

    #[test]
    fn off_by_id_keeps_other_listeners() {
        let hub = EventHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = hub.on("a", recorder(&log, "first"));
        hub.on("a", recorder(&log, "second"));

        assert_eq!(hub.off("a", Some(first)), 1);
        hub.emit("a", &json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn off_without_id_clears_the_event() {
        let hub = EventHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.on("a", recorder(&log, "first"));
        hub.on("a", recorder(&log, "second"));

        assert_eq!(hub.off("a", None), 2);
        assert!(!hub.emit("a", &json!({})));
        assert_eq!(hub.off("missing", None), 0);
    }

    #[test]
    fn off_all_clears_every_event() {
        let hub = EventHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.on("a", recorder(&log, "a"));
        hub.on("b", recorder(&log, "b"));

        hub.off_all();
        hub.emit("a", &json!({}));
        hub.emit("b", &json!({}));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn listener_may_subscribe_reentrantly() {
        let hub = Arc::new(EventHub::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let hub_inner = Arc::clone(&hub);
        let log_inner = Arc::clone(&log);
        hub.once(
            "a",
            Arc::new(move |_payload: &Value| {
                hub_inner.on("a", recorder(&log_inner, "late"));
            }),
        );

        hub.emit("a", &json!({}));
        assert!(log.lock().unwrap().is_empty());
        hub.emit("a", &json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["late"]);
    }
}
