//! le-core: shared types, error taxonomy, and capability services for LibEtude
//!
//! This crate provides the foundational types used across the streaming
//! pipeline and the plugin dependency resolver: the audio chunk record
//! (C1), the four-field version algebra (C7), the shared error taxonomy,
//! and the `Services` capability bundle.

mod chunk;
mod error;
mod services;
mod version;

pub use chunk::{Chunk, ChunkArena};
pub use error::{CoreError, CoreResult};
pub use services::{Clock, EventKind, EventListener, EventSink, MonotonicClock, NullEventSink, Services};
pub use version::Version;
