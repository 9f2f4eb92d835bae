//! Worker pool (C4, §4.4)
//!
//! Each worker is a plain OS thread running `run_worker` until the shared
//! stop flag is observed. Workers share no mutable state beyond the ring,
//! the stats block, and the quality scalar (§5) — all reached through
//! `WorkerShared`, never through back-references to the owning context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use le_core::{Chunk, ChunkArena, Services};
use parking_lot::{Condvar, Mutex};

use crate::quality::QualityController;
use crate::reorder::ReorderBuffer;
use crate::ring::{PopOutcome, RingBuffer};
use crate::stage::Stage;
use crate::state::StreamState;
use crate::stats::StreamStats;
use crate::stream::{error_kind_name, Callbacks};

/// Fields every worker thread needs, shared via `Arc` across the pool.
pub struct WorkerShared {
    pub input_ring: Arc<RingBuffer>,
    pub output_ring: Arc<RingBuffer>,
    pub reorder: Arc<ReorderBuffer>,
    pub state: Arc<Mutex<StreamState>>,
    pub state_cond: Arc<Condvar>,
    pub stop_requested: Arc<AtomicBool>,
    pub stats: Arc<StreamStats>,
    pub quality: Arc<QualityController>,
    pub stage: Arc<dyn Stage>,
    pub arena: Arc<ChunkArena>,
    pub services: Services,
    pub callbacks: Arc<Callbacks>,
    pub buffer_timeout_ms: u64,
    pub target_latency_ms: u64,
    pub max_latency_ms: u64,
    pub channel_count: usize,
    pub last_produced_at_ns: Arc<portable_atomic::AtomicU64>,
}

pub fn run_worker(shared: Arc<WorkerShared>) {
    loop {
        if shared.stop_requested.load(Ordering::Acquire) {
            return;
        }

        {
            let mut state = shared.state.lock();
            while *state == StreamState::Paused && !shared.stop_requested.load(Ordering::Acquire) {
                shared.state_cond.wait(&mut state);
            }
        }
        if shared.stop_requested.load(Ordering::Acquire) {
            return;
        }

        let timeout = Duration::from_millis(shared.buffer_timeout_ms);
        match shared.input_ring.pop_blocking(timeout) {
            PopOutcome::Ok(chunk_in) => {
                {
                    let mut state = shared.state.lock();
                    if *state == StreamState::Buffering {
                        *state = StreamState::Streaming;
                    }
                }

                let quality = shared.quality.quality();
                let frame_count = chunk_in.frame_count();
                let out_buffer = shared
                    .arena
                    .acquire(frame_count * shared.channel_count);
                let mut chunk_out = match Chunk::create_with_buffer(
                    out_buffer,
                    frame_count,
                    shared.channel_count,
                    chunk_in.sample_rate(),
                ) {
                    Ok(c) => c,
                    Err(_) => {
                        shared.stats.record_error();
                        continue;
                    }
                };
                chunk_out.stamp(chunk_in.sequence_number(), chunk_in.submitted_at_ns());
                chunk_out.set_is_final(chunk_in.is_final());

                let started_at = shared.services.clock.now_ns();
                let result = shared.stage.process(&chunk_in, &mut chunk_out, quality);
                let elapsed_ns = shared.services.clock.now_ns().saturating_sub(started_at);

                if let Err(err) = result {
                    shared.stats.record_error();
                    log::warn!(
                        "stage failed for chunk seq={}: {err}",
                        chunk_in.sequence_number()
                    );
                    shared.callbacks.fire_error(
                        error_kind_name(&err),
                        &err.to_string(),
                        chunk_in.sequence_number(),
                    );
                } else {
                    shared.callbacks.fire_audio(&chunk_out);
                    shared
                        .callbacks
                        .fire_progress(chunk_out.sequence_number(), elapsed_ns as f64 / 1_000_000.0);
                    let dropped = shared.reorder.submit(chunk_out, &shared.output_ring);
                    for _ in 0..dropped {
                        shared.stats.record_dropped_chunk();
                    }
                }
                shared.arena.release(chunk_in.release());

                let now_ns = shared.services.clock.now_ns();
                shared.last_produced_at_ns.store(now_ns, portable_atomic::Ordering::Relaxed);
                shared
                    .stats
                    .record_chunk_processed(frame_count, elapsed_ns);
                shared.stats.set_buffer_level(shared.input_ring.level());
                tick_quality(&shared, now_ns);
            }
            PopOutcome::Empty => {
                shared.stats.record_underrun();
                tick_quality(&shared, shared.services.clock.now_ns());
            }
            PopOutcome::Stopped => return,
        }
    }
}

fn tick_quality(shared: &Arc<WorkerShared>, now_ns: u64) {
    let last_produced = shared.last_produced_at_ns.load(portable_atomic::Ordering::Relaxed);
    let current_latency_ms = now_ns.saturating_sub(last_produced) as f64 / 1_000_000.0;
    shared.stats.record_latency_ms(current_latency_ms);
    shared.quality.maybe_tick(
        now_ns,
        current_latency_ms,
        shared.target_latency_ms,
        shared.max_latency_ms,
        &shared.stats,
    );
}
