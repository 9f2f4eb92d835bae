//! le-pipeline: real-time streaming pipeline for LibEtude
//!
//! Ring buffer (C2), stream context state machine (C3), worker pool (C4),
//! and quality controller (C5), plus the stage-function collaborator
//! (§6.2) and the generic bounded-queue primitive both the ring and the
//! scheduler crate build on.

mod bounded;
mod config;
mod quality;
mod reorder;
mod ring;
mod stage;
mod state;
mod stats;
mod stream;
mod worker;

pub use bounded::{BoundedChannel, BoundedPush};
pub use config::{StreamConfig, StreamMode};
pub use quality::QualityController;
pub use ring::{PopOutcome, PushOutcome, ResizeOutcome, RingBuffer};
pub use stage::{IdentityStage, Stage};
pub use state::StreamState;
pub use stats::{StatsSnapshot, StreamStats};
pub use stream::{AudioCallback, ErrorCallback, LastError, ProgressCallback, StateCallback, StreamContext};
