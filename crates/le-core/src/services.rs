//! Explicit capability bundle, replacing the source's process-wide globals
//! (design note: "Global mutable state").
//!
//! Subsystems take a `Services` handle at construction instead of reaching
//! for a process-wide event callback or load/unload hook table. A default
//! bundle is cheap to construct and is what the facade crate wires up for
//! callers who don't need anything custom.

use std::sync::Arc;
use std::time::Instant;

/// Monotonic clock, abstracted so tests can supply a fake one.
///
/// Platform clocks are out of scope for this spec (§1); this trait is the
/// minimal seam the pipeline needs (`submitted_at`, `last_produced_time`,
/// latency calculations) without assuming `std::time::Instant` is available
/// in every host.
pub trait Clock: Send + Sync {
    /// Nanoseconds since an arbitrary, fixed epoch. Must be monotonic.
    fn now_ns(&self) -> u64;
}

/// `Clock` backed by `std::time::Instant`.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Event kinds fired by the pipeline and the plugin subsystems (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PluginAdded,
    PluginRemoved,
    DependenciesResolved,
    UpdatesAvailable,
    SecurityVulnerabilitiesFound,
    StreamStateChanged,
}

/// Listener interface for the event fan-out (design note: "Callback-based
/// eventing" — a registered sink object rather than one process-wide
/// callback). Implementors must return quickly: the firing thread waits
/// for every listener before continuing.
pub trait EventListener: Send + Sync {
    fn on_event(&self, kind: EventKind, subject: &str, payload: &str);
}

/// Broadcast target every subsystem fires events through. `le-events`
/// provides the concrete `EventBus` implementation; `le-core` only needs
/// the trait so it has no dependency on `le-events`.
pub trait EventSink: Send + Sync {
    fn emit(&self, kind: EventKind, subject: &str, payload: &str);
}

/// A sink that drops every event. Used as the default when a caller hasn't
/// wired anything up.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _kind: EventKind, _subject: &str, _payload: &str) {}
}

/// Capability bundle threaded into `StreamContext`, `PluginRegistry`, and
/// `DependencyGraph` constructors instead of process statics.
#[derive(Clone)]
pub struct Services {
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}

impl Services {
    pub fn new(clock: Arc<dyn Clock>, events: Arc<dyn EventSink>) -> Self {
        Self { clock, events }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self {
            clock: Arc::new(MonotonicClock::new()),
            events: Arc::new(NullEventSink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeClock(AtomicU64);

    impl Clock for FakeClock {
        fn now_ns(&self) -> u64 {
            self.0.fetch_add(1, Ordering::Relaxed)
        }
    }

    #[test]
    fn services_default_is_usable() {
        let services = Services::default();
        let _ = services.clock.now_ns();
        services.events.emit(EventKind::PluginAdded, "x", "{}");
    }

    #[test]
    fn custom_clock_is_used() {
        let services = Services::new(Arc::new(FakeClock(AtomicU64::new(10))), Arc::new(NullEventSink));
        assert_eq!(services.clock.now_ns(), 10);
        assert_eq!(services.clock.now_ns(), 11);
    }
}
