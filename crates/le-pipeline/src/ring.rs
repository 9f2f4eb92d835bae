//! Bounded ring buffer of chunks (C2)
//!
//! Built on `BoundedChannel<Chunk>`; this module adds the chunk-specific
//! bookkeeping the generic channel doesn't know about — high-water-mark
//! tracking and returning a chunk's buffer to a `ChunkArena` on flush.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use le_core::{Chunk, ChunkArena};

use crate::bounded::{BoundedChannel, BoundedPush};

/// Outcome of a non-blocking push.
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Ok,
    Full,
}

/// Outcome of a blocking pop.
#[derive(Debug, PartialEq, Eq)]
pub enum PopOutcome {
    Ok(Chunk),
    Empty,
    Stopped,
}

/// Outcome of a resize request.
#[derive(Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    Ok,
    InvalidState,
}

/// Push-full policy is reject, never overwrite: `try_push` returns `Full`
/// immediately rather than blocking or evicting. `pop_blocking` waits up
/// to a timeout, rechecking the stop flag on every wakeup so a `stop()`
/// call is observed promptly even mid-wait.
pub struct RingBuffer {
    channel: BoundedChannel<Chunk>,
    high_water_mark: Mutex<usize>,
    arena: Option<Arc<ChunkArena>>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_arena(capacity, None)
    }

    pub fn with_arena(capacity: usize, arena: Option<Arc<ChunkArena>>) -> Self {
        Self {
            channel: BoundedChannel::new(capacity),
            high_water_mark: Mutex::new(0),
            arena,
        }
    }

    /// Attempt to enqueue a chunk. Never blocks.
    pub fn try_push(&self, chunk: Chunk) -> PushOutcome {
        match self.channel.try_push(chunk) {
            BoundedPush::Ok => {
                let level = self.channel.len();
                let mut hwm = self.high_water_mark.lock();
                if level > *hwm {
                    *hwm = level;
                }
                PushOutcome::Ok
            }
            BoundedPush::Full(_) => PushOutcome::Full,
        }
    }

    /// Wait up to `timeout` for a chunk to become available.
    pub fn pop_blocking(&self, timeout: Duration) -> PopOutcome {
        match self.channel.pop_timeout(timeout) {
            Some(chunk) => PopOutcome::Ok(chunk),
            None => {
                if self.channel.is_stopped() {
                    PopOutcome::Stopped
                } else {
                    PopOutcome::Empty
                }
            }
        }
    }

    /// Wake every blocked pop so it can observe the stop flag.
    pub fn stop(&self) {
        self.channel.stop();
    }

    /// Clear the stop flag, e.g. when re-initializing after a `restart`.
    pub fn clear_stopped(&self) {
        self.channel.clear_stopped();
    }

    /// Release all remaining chunks and reset the high-water mark.
    pub fn flush(&self) {
        let released = self.channel.drain();
        if let Some(arena) = &self.arena {
            for chunk in released {
                arena.release(chunk.release());
            }
        }
        *self.high_water_mark.lock() = 0;
    }

    pub fn level(&self) -> usize {
        self.channel.len()
    }

    pub fn space(&self) -> usize {
        self.channel.space()
    }

    pub fn high_water_mark(&self) -> usize {
        *self.high_water_mark.lock()
    }

    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    /// Mark the ring as not currently owned by an active worker pool.
    /// `resize` only succeeds while detached and empty.
    pub fn set_detached(&self, detached: bool) {
        self.channel.set_detached(detached);
    }

    /// Resize capacity. Only valid when empty and detached (stream is Idle).
    pub fn resize(&self, new_capacity: usize) -> ResizeOutcome {
        match self.channel.resize(new_capacity) {
            Ok(()) => {
                *self.high_water_mark.lock() = 0;
                ResizeOutcome::Ok
            }
            Err(()) => ResizeOutcome::InvalidState,
        }
    }
}
