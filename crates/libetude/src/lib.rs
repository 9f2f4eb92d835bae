//! LibEtude facade, wiring the streaming pipeline (C1-C5), the task
//! scheduler (C6), and the plugin dependency/lifecycle subsystem (C8-C11)
//! behind one `Services` bundle.
//!
//! Grounded on `rf-engine/lib.rs`'s role in the teacher: a top-level crate
//! that re-exports its collaborators' public types and owns the wiring a
//! host would otherwise have to duplicate. Unlike the teacher's engine
//! (which owns routing, mixing, and a large feature surface directly),
//! this facade owns nothing but construction — each subsystem is a
//! standalone crate usable on its own.

use std::sync::Arc;

use le_core::{Clock, EventSink, MonotonicClock, Services};
use le_events::EventBus;
use le_plugin::{DependencyConfig, PluginRegistry};
use le_scheduler::TaskScheduler;

pub use le_core::{Chunk, ChunkArena, CoreError, CoreResult, EventKind, EventListener, Version};
pub use le_events::Report;
pub use le_pipeline::{IdentityStage, Stage, StreamConfig, StreamContext, StreamMode, StreamState};
pub use le_plugin::{
    DependencyEdge, DependencyGraph, LoadOrder, PluginError, PluginKind, PluginMetadata, PluginRecord, PluginResult,
    ResolvedResult, ResolvedStatus, ResolutionCache, VersionPolicy,
};
pub use le_scheduler::{CompletionCallback, SchedulerStats, TaskPriority, TaskStatus};

/// Constructs the default `Services` bundle: a `MonotonicClock` and an
/// `EventBus` shared across every subsystem a caller wires up through
/// this crate. Returning the bus alongside `Services` lets callers
/// `subscribe` their own listeners before anything starts firing events.
pub fn default_services() -> (Services, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new());
    let events: Arc<dyn EventSink> = bus.clone();
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    (Services::new(clock, events), bus)
}

/// Top-level handle bundling the plugin registry and task scheduler under
/// one `Services`. Stream contexts are created separately via
/// `new_stream`, since each one needs its own `Stage` implementation that
/// only the host can supply (§6.2).
pub struct LibEtude {
    pub services: Services,
    pub events: Arc<EventBus>,
    pub registry: PluginRegistry,
    pub scheduler: TaskScheduler,
}

impl LibEtude {
    /// Builds the facade with a fresh `Services` bundle, a plugin registry
    /// under `plugin_config`, and a scheduler pool of `scheduler_workers`
    /// threads.
    pub fn new(plugin_config: DependencyConfig, scheduler_workers: usize) -> CoreResult<Self> {
        let (services, events) = default_services();
        let registry = PluginRegistry::new(plugin_config, services.clone());
        let scheduler = TaskScheduler::new(scheduler_workers, services.clone())?;
        Ok(Self { services, events, registry, scheduler })
    }

    /// Starts a new streaming pipeline sharing this facade's `Services`
    /// (and therefore its event bus and clock) over the given stage.
    pub fn new_stream(&self, config: StreamConfig, stage: Arc<dyn Stage>) -> CoreResult<StreamContext> {
        StreamContext::new(config, stage, self.services.clone())
    }
}
