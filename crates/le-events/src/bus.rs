//! Event bus (§4.11): a registered-sink fan-out, replacing the single
//! process-wide callback the distilled spec describes with a list of
//! listener objects (design note: "Callback-based eventing").
//!
//! Grounded on `rf-event/manager.rs`'s `EventManagerHandle`/
//! `EventManagerProcessor` split: that system separates a thread-safe
//! registration surface from audio-thread dispatch. `EventBus` keeps the
//! same shape — registration is cheap and lock-protected, dispatch walks a
//! plain `Vec` — without the command queue, since nothing here crosses a
//! realtime/non-realtime boundary the way `rtrb` was bridging.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use le_core::{EventKind, EventListener, EventSink};

/// Broadcasts events to every live listener in registration order,
/// dropping listeners whose `Arc` has already been released.
///
/// Listeners are held weakly so subscribing does not keep an otherwise
/// unreferenced object alive; a listener that is dropped elsewhere is
/// pruned the next time an event fires, not announced.
pub struct EventBus {
    listeners: Mutex<Vec<Weak<dyn EventListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Registers a listener. Order of registration is the order events are
    /// delivered in for any single event kind (§4.11: "preserves order
    /// within a single kind").
    pub fn subscribe(&self, listener: &Arc<dyn EventListener>) {
        self.listeners.lock().push(Arc::downgrade(listener));
    }

    /// Number of listeners currently alive. Prunes dead entries first, so
    /// this is also a manual cleanup hook for callers that want one.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|w| w.strong_count() > 0);
        listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, kind: EventKind, subject: &str, payload: &str) {
        let listeners = {
            let mut guard = self.listeners.lock();
            guard.retain(|w| w.strong_count() > 0);
            guard.clone()
        };
        for weak in &listeners {
            if let Some(listener) = weak.upgrade() {
                listener.on_event(kind, subject, payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct Recorder {
        calls: StdMutex<Vec<(EventKind, String, String)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self { calls: StdMutex::new(Vec::new()) }
        }
    }

    impl EventListener for Recorder {
        fn on_event(&self, kind: EventKind, subject: &str, payload: &str) {
            self.calls.lock().unwrap().push((kind, subject.to_string(), payload.to_string()));
        }
    }

    #[test]
    fn broadcasts_to_every_live_listener() {
        let bus = EventBus::new();
        let a = Arc::new(Recorder::new());
        let b = Arc::new(Recorder::new());
        let a_sink: Arc<dyn EventListener> = a.clone();
        let b_sink: Arc<dyn EventListener> = b.clone();
        bus.subscribe(&a_sink);
        bus.subscribe(&b_sink);

        bus.emit(EventKind::PluginAdded, "reverb.so", "{}");

        assert_eq!(a.calls.lock().unwrap().len(), 1);
        assert_eq!(b.calls.lock().unwrap().len(), 1);
        assert_eq!(a.calls.lock().unwrap()[0].1, "reverb.so");
    }

    #[test]
    fn dead_listener_is_pruned_and_not_delivered_to() {
        let bus = EventBus::new();
        let counted = Arc::new(AtomicUsize::new(0));

        struct Counting(Arc<AtomicUsize>);
        impl EventListener for Counting {
            fn on_event(&self, _kind: EventKind, _subject: &str, _payload: &str) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let listener: Arc<dyn EventListener> = Arc::new(Counting(counted.clone()));
            bus.subscribe(&listener);
            assert_eq!(bus.listener_count(), 1);
            bus.emit(EventKind::PluginRemoved, "x", "");
            assert_eq!(counted.load(Ordering::SeqCst), 1);
        }
        // `listener` has been dropped; the bus holds only a weak reference.
        assert_eq!(bus.listener_count(), 0);
        bus.emit(EventKind::PluginRemoved, "x", "");
        assert_eq!(counted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delivery_order_matches_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        struct Tagged(u32, Arc<StdMutex<Vec<u32>>>);
        impl EventListener for Tagged {
            fn on_event(&self, _kind: EventKind, _subject: &str, _payload: &str) {
                self.1.lock().unwrap().push(self.0);
            }
        }

        let first: Arc<dyn EventListener> = Arc::new(Tagged(1, order.clone()));
        let second: Arc<dyn EventListener> = Arc::new(Tagged(2, order.clone()));
        let third: Arc<dyn EventListener> = Arc::new(Tagged(3, order.clone()));
        bus.subscribe(&first);
        bus.subscribe(&second);
        bus.subscribe(&third);

        bus.emit(EventKind::DependenciesResolved, "graph", "");
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }
}
