//! Stream context (C3, §4.3)
//!
//! Owns the ring, the worker pool, and the statistics block. Every public
//! operation takes the state mutex first (lock order: state → stats →
//! ring, §5) and releases it before firing the state-change event, so no
//! callback runs while a caller's own lock is held.

use std::sync::atomic::{AtomicBool, AtomicU64 as StdAtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use portable_atomic::AtomicU64;

use le_core::{Chunk, ChunkArena, CoreError, CoreResult, EventKind, Services};

use crate::config::StreamConfig;
use crate::quality::QualityController;
use crate::reorder::ReorderBuffer;
use crate::ring::{PopOutcome, PushOutcome, RingBuffer, ResizeOutcome};
use crate::stage::Stage;
use crate::state::StreamState;
use crate::stats::{StatsSnapshot, StreamStats};
use crate::worker::{self, WorkerShared};

/// Last recorded error kind plus a short human-readable message (§4.3, §7).
#[derive(Debug, Clone)]
pub struct LastError {
    pub kind: &'static str,
    pub message: String,
}

/// Fired once per chunk the pipeline produces into the output ring.
pub type AudioCallback = Box<dyn Fn(&Chunk) + Send + Sync>;
/// Fired after a chunk finishes processing: `(chunk sequence number, current latency ms)`.
pub type ProgressCallback = Box<dyn Fn(u64, f64) + Send + Sync>;
/// Fired on a worker failure, per §7: error kind, message, and the failing chunk's sequence number.
pub type ErrorCallback = Box<dyn Fn(&str, &str, u64) + Send + Sync>;
/// Fired on every state transition: `(old, new)`.
pub type StateCallback = Box<dyn Fn(StreamState, StreamState) + Send + Sync>;

/// Registered callback slots, shared between `StreamContext` and its
/// worker pool (§6.1 `set_*_callback(cb, user)`; a Rust closure already
/// closes over whatever "user" data it needs, so there is no separate
/// user-data parameter to thread through).
#[derive(Default)]
pub struct Callbacks {
    audio: Mutex<Option<AudioCallback>>,
    progress: Mutex<Option<ProgressCallback>>,
    error: Mutex<Option<ErrorCallback>>,
    state: Mutex<Option<StateCallback>>,
}

impl Callbacks {
    pub(crate) fn fire_audio(&self, chunk: &Chunk) {
        if let Some(cb) = self.audio.lock().as_ref() {
            cb(chunk);
        }
    }

    pub(crate) fn fire_progress(&self, sequence_number: u64, latency_ms: f64) {
        if let Some(cb) = self.progress.lock().as_ref() {
            cb(sequence_number, latency_ms);
        }
    }

    pub(crate) fn fire_error(&self, kind: &str, message: &str, sequence_number: u64) {
        if let Some(cb) = self.error.lock().as_ref() {
            cb(kind, message, sequence_number);
        }
    }

    pub(crate) fn fire_state(&self, old: StreamState, new: StreamState) {
        if let Some(cb) = self.state.lock().as_ref() {
            cb(old, new);
        }
    }
}

pub struct StreamContext {
    config: Mutex<StreamConfig>,
    state: Arc<Mutex<StreamState>>,
    state_cond: Arc<Condvar>,
    input_ring: Arc<RingBuffer>,
    output_ring: Arc<RingBuffer>,
    reorder: Arc<ReorderBuffer>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stop_requested: Arc<AtomicBool>,
    stats: Arc<StreamStats>,
    quality: Arc<QualityController>,
    stage: Arc<dyn Stage>,
    arena: Arc<ChunkArena>,
    services: Services,
    sequence_counter: StdAtomicU64,
    start_time_ns: AtomicU64,
    last_produced_at_ns: Arc<AtomicU64>,
    last_error: Mutex<Option<LastError>>,
    callbacks: Arc<Callbacks>,
}

pub(crate) fn error_kind_name(err: &CoreError) -> &'static str {
    match err {
        CoreError::InvalidArgument(_) => "InvalidArgument",
        CoreError::InvalidState(_) => "InvalidState",
        CoreError::BufferFull => "BufferFull",
        CoreError::BufferEmpty => "BufferEmpty",
        CoreError::BufferTooSmall { .. } => "BufferTooSmall",
        CoreError::OutOfMemory => "OutOfMemory",
        CoreError::NotFound(_) => "NotFound",
        CoreError::CorruptedCache(_) => "CorruptedCache",
        CoreError::VersionIncompatible(_) => "VersionIncompatible",
        CoreError::DependencyMissing(_) => "DependencyMissing",
        CoreError::DependencyCircular(_) => "DependencyCircular",
        CoreError::PluginInitFailed(_) => "PluginInitFailed",
        CoreError::PluginProcessFailed(_) => "PluginProcessFailed",
        CoreError::PluginUnloadFailed(_) => "PluginUnloadFailed",
        CoreError::ThreadCreationFailed(_) => "ThreadCreationFailed",
        CoreError::FileIo(_) => "FileIo",
        CoreError::NotImplemented(_) => "NotImplemented",
    }
}

impl StreamContext {
    pub fn new(config: StreamConfig, stage: Arc<dyn Stage>, services: Services) -> CoreResult<Self> {
        config.validate()?;
        let ring_capacity = config.buffer_count;
        let arena = Arc::new(ChunkArena::new());
        Ok(Self {
            config: Mutex::new(config),
            state: Arc::new(Mutex::new(StreamState::Idle)),
            state_cond: Arc::new(Condvar::new()),
            input_ring: Arc::new(RingBuffer::with_arena(ring_capacity, Some(arena.clone()))),
            output_ring: Arc::new(RingBuffer::with_arena(ring_capacity, Some(arena.clone()))),
            reorder: Arc::new(ReorderBuffer::new()),
            workers: Mutex::new(Vec::new()),
            stop_requested: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(StreamStats::new()),
            quality: Arc::new(QualityController::default()),
            stage,
            arena,
            services,
            sequence_counter: StdAtomicU64::new(0),
            start_time_ns: AtomicU64::new(0),
            last_produced_at_ns: Arc::new(AtomicU64::new(0)),
            last_error: Mutex::new(None),
            callbacks: Arc::new(Callbacks::default()),
        })
    }

    fn transition(&self, state: &mut parking_lot::MutexGuard<'_, StreamState>, next: StreamState) -> CoreResult<()> {
        if !state.can_transition_to(next) {
            return Err(CoreError::InvalidState(format!(
                "cannot transition from {:?} to {:?}",
                **state, next
            )));
        }
        let old = **state;
        **state = next;
        let payload = format!("{{\"state\":\"{next:?}\"}}");
        self.services
            .events
            .emit(EventKind::StreamStateChanged, "stream", &payload);
        self.callbacks.fire_state(old, next);
        Ok(())
    }

    fn record_error(&self, err: &CoreError) {
        *self.last_error.lock() = Some(LastError {
            kind: error_kind_name(err),
            message: err.to_string(),
        });
        self.stats.record_error();
    }

    /// §6.1 `set_*_callback(cb, user)`. A closure already closes over
    /// whatever state an opaque `user` pointer would have carried, so the
    /// Rust surface drops the separate parameter.
    pub fn set_audio_callback<F>(&self, cb: F)
    where
        F: Fn(&Chunk) + Send + Sync + 'static,
    {
        *self.callbacks.audio.lock() = Some(Box::new(cb));
    }

    pub fn set_progress_callback<F>(&self, cb: F)
    where
        F: Fn(u64, f64) + Send + Sync + 'static,
    {
        *self.callbacks.progress.lock() = Some(Box::new(cb));
    }

    pub fn set_error_callback<F>(&self, cb: F)
    where
        F: Fn(&str, &str, u64) + Send + Sync + 'static,
    {
        *self.callbacks.error.lock() = Some(Box::new(cb));
    }

    pub fn set_state_callback<F>(&self, cb: F)
    where
        F: Fn(StreamState, StreamState) + Send + Sync + 'static,
    {
        *self.callbacks.state.lock() = Some(Box::new(cb));
    }

    /// Only legal in `Idle` (per-field mutability rules are enforced at
    /// ring-resize time by `resize_buffers`, not here).
    pub fn configure(&self, config: StreamConfig) -> CoreResult<()> {
        config.validate()?;
        let state = self.state.lock();
        if *state != StreamState::Idle {
            return Err(CoreError::InvalidState(
                "configure is only legal in Idle".into(),
            ));
        }
        *self.config.lock() = config;
        Ok(())
    }

    pub fn start(&self) -> CoreResult<()> {
        {
            let mut state = self.state.lock();
            if *state != StreamState::Idle {
                return Err(CoreError::InvalidState("start requires Idle".into()));
            }
            self.transition(&mut state, StreamState::Initializing)?;
        }

        self.stats.reset();
        self.sequence_counter.store(0, Ordering::Relaxed);
        self.stop_requested.store(false, Ordering::Release);
        self.input_ring.clear_stopped();
        self.output_ring.clear_stopped();
        self.input_ring.flush();
        self.output_ring.flush();
        self.input_ring.set_detached(false);
        self.output_ring.set_detached(false);
        self.reorder.reset();

        let now = self.services.clock.now_ns();
        self.start_time_ns.store(now, Ordering::Relaxed);
        self.last_produced_at_ns.store(now, Ordering::Relaxed);

        let cfg = self.config.lock().clone();

        // Spawned without holding `state`: a worker's first act is to lock
        // `state` itself (§5 lock order), so joining a partially-spawned
        // pool while still holding that guard would deadlock.
        let mut spawned = Vec::with_capacity(cfg.processing_thread_count);
        let mut spawn_err = None;
        for _ in 0..cfg.processing_thread_count {
            let shared = Arc::new(WorkerShared {
                input_ring: self.input_ring.clone(),
                output_ring: self.output_ring.clone(),
                reorder: self.reorder.clone(),
                state: self.state.clone(),
                state_cond: self.state_cond.clone(),
                stop_requested: self.stop_requested.clone(),
                stats: self.stats.clone(),
                quality: self.quality.clone(),
                stage: self.stage.clone(),
                arena: self.arena.clone(),
                services: self.services.clone(),
                callbacks: self.callbacks.clone(),
                buffer_timeout_ms: cfg.buffer_timeout_ms,
                target_latency_ms: cfg.target_latency_ms,
                max_latency_ms: cfg.max_latency_ms,
                channel_count: cfg.channel_count,
                last_produced_at_ns: self.last_produced_at_ns.clone(),
            });
            match std::thread::Builder::new()
                .name("le-pipeline-worker".into())
                .spawn(move || worker::run_worker(shared))
            {
                Ok(handle) => spawned.push(handle),
                Err(e) => {
                    spawn_err = Some(CoreError::ThreadCreationFailed(e.to_string()));
                    break;
                }
            }
        }

        if let Some(err) = spawn_err {
            // Unblock and join whatever workers did spawn before failing,
            // then surface the failure through `Error` rather than leaving
            // the context stuck in `Initializing` with no recovery path.
            self.stop_requested.store(true, Ordering::Release);
            self.input_ring.stop();
            self.output_ring.stop();
            self.state_cond.notify_all();
            for handle in spawned.drain(..) {
                let _ = handle.join();
            }
            self.input_ring.set_detached(true);
            self.output_ring.set_detached(true);
            self.record_error(&err);
            let mut state = self.state.lock();
            let _ = self.transition(&mut state, StreamState::Error);
            return Err(err);
        }

        *self.workers.lock() = spawned;
        self.quality.set_enabled(cfg.enable_quality_adaptation);
        self.quality.set_quality(1.0);

        let mut state = self.state.lock();
        self.transition(&mut state, StreamState::Buffering)
    }

    /// Recovers from `Error` back to `Idle`, releasing any lingering worker
    /// threads and ring state first (§7: "must be followed by
    /// `reset`/`initialize` before `start` can be re-issued").
    pub fn reset(&self) -> CoreResult<()> {
        let mut state = self.state.lock();
        if *state != StreamState::Error {
            return Err(CoreError::InvalidState("reset requires Error".into()));
        }

        self.stop_requested.store(true, Ordering::Release);
        self.input_ring.stop();
        self.output_ring.stop();
        self.state_cond.notify_all();

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        drop(workers);

        self.input_ring.set_detached(true);
        self.output_ring.set_detached(true);
        self.input_ring.flush();
        self.output_ring.flush();
        *self.last_error.lock() = None;

        self.transition(&mut state, StreamState::Idle)
    }

    pub fn stop(&self) -> CoreResult<()> {
        {
            let mut state = self.state.lock();
            if !matches!(
                *state,
                StreamState::Streaming | StreamState::Paused | StreamState::Buffering
            ) {
                return Err(CoreError::InvalidState("stop requires an active state".into()));
            }
            self.transition(&mut state, StreamState::Stopping)?;
        }

        self.stop_requested.store(true, Ordering::Release);
        self.input_ring.stop();
        self.output_ring.stop();
        self.state_cond.notify_all();

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        drop(workers);

        self.input_ring.set_detached(true);
        self.output_ring.set_detached(true);
        // The ring is logically destroyed on the Idle transition (§3); we
        // keep the allocation for reuse but drop its contents.
        self.input_ring.flush();
        self.output_ring.flush();

        let mut state = self.state.lock();
        self.transition(&mut state, StreamState::Idle)
    }

    pub fn pause(&self) -> CoreResult<()> {
        let mut state = self.state.lock();
        if *state != StreamState::Streaming {
            return Err(CoreError::InvalidState("pause requires Streaming".into()));
        }
        self.transition(&mut state, StreamState::Paused)
    }

    pub fn resume(&self) -> CoreResult<()> {
        let mut state = self.state.lock();
        if *state != StreamState::Paused {
            return Err(CoreError::InvalidState("resume requires Paused".into()));
        }
        self.transition(&mut state, StreamState::Streaming)?;
        drop(state);
        self.state_cond.notify_all();
        Ok(())
    }

    /// `stop ∘ initialize ∘ start`, per §4.3.
    pub fn restart(&self) -> CoreResult<()> {
        self.stop()?;
        self.start()
    }

    /// Partition `buf` into chunks of at most `chunk_size` frames, in
    /// submission order, stamping strictly-increasing sequence numbers.
    /// On the first full ring, chunks already pushed are retained and the
    /// call fails with `BufferFull`.
    pub fn push_audio(&self, buf: &[f32], len: usize) -> CoreResult<usize> {
        {
            let state = self.state.lock();
            if !matches!(*state, StreamState::Streaming | StreamState::Buffering) {
                return Err(CoreError::InvalidState(
                    "push_audio requires Streaming or Buffering".into(),
                ));
            }
        }

        let cfg = self.config.lock().clone();
        let channel_count = cfg.channel_count;
        let frame_limit = len.min(buf.len() / channel_count.max(1));
        let chunk_frames = cfg.chunk_size;

        let mut offset = 0usize;
        let mut pushed_chunks = 0usize;
        while offset < frame_limit {
            let frames_this_chunk = chunk_frames.min(frame_limit - offset);
            let sample_start = offset * channel_count;
            let sample_end = sample_start + frames_this_chunk * channel_count;
            let is_final = offset + frames_this_chunk >= frame_limit;

            let mut chunk = Chunk::create_with_buffer(
                self.arena.acquire(frames_this_chunk * channel_count),
                frames_this_chunk,
                channel_count,
                cfg.sample_rate,
            )?;
            chunk.samples_mut().copy_from_slice(&buf[sample_start..sample_end]);
            let seq = self.sequence_counter.fetch_add(1, Ordering::Relaxed);
            chunk.stamp(seq, self.services.clock.now_ns());
            chunk.set_is_final(is_final);

            match self.input_ring.try_push(chunk) {
                PushOutcome::Ok => {
                    pushed_chunks += 1;
                    self.stats.set_buffer_level(self.input_ring.level());
                    offset += frames_this_chunk;
                }
                PushOutcome::Full => {
                    let err = CoreError::BufferFull;
                    self.record_error(&err);
                    self.stats.record_overrun();
                    return Err(err);
                }
            }
        }

        Ok(pushed_chunks)
    }

    /// Non-blocking pop of a produced chunk.
    pub fn pop_chunk(&self) -> CoreResult<Chunk> {
        match self.output_ring.pop_blocking(Duration::from_millis(0)) {
            PopOutcome::Ok(chunk) => Ok(chunk),
            PopOutcome::Empty | PopOutcome::Stopped => Err(CoreError::BufferEmpty),
        }
    }

    pub fn get_state(&self) -> StreamState {
        *self.state.lock()
    }

    /// Current latency in milliseconds: `now - last_produced_time`.
    pub fn get_latency(&self) -> f64 {
        let now = self.services.clock.now_ns();
        let last = self.last_produced_at_ns.load(Ordering::Relaxed);
        now.saturating_sub(last) as f64 / 1_000_000.0
    }

    pub fn get_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Release queued chunks in both rings. Does not change state.
    pub fn flush(&self) {
        self.input_ring.flush();
        self.output_ring.flush();
    }

    /// Only legal in `Idle`.
    pub fn resize_buffers(&self, new_capacity: usize) -> CoreResult<()> {
        let state = self.state.lock();
        if *state != StreamState::Idle {
            return Err(CoreError::InvalidState("resize_buffers requires Idle".into()));
        }
        match (
            self.input_ring.resize(new_capacity),
            self.output_ring.resize(new_capacity),
        ) {
            (ResizeOutcome::Ok, ResizeOutcome::Ok) => Ok(()),
            _ => Err(CoreError::InvalidState(
                "ring must be empty and detached to resize".into(),
            )),
        }
    }

    pub fn set_quality(&self, q: f32) {
        self.quality.set_quality(q);
    }

    pub fn quality(&self) -> f32 {
        self.quality.quality()
    }

    pub fn last_error(&self) -> Option<LastError> {
        self.last_error.lock().clone()
    }
}

impl Drop for StreamContext {
    fn drop(&mut self) {
        if self.get_state() != StreamState::Idle {
            self.stop_requested.store(true, Ordering::Release);
            self.input_ring.stop();
            self.output_ring.stop();
            self.state_cond.notify_all();
            let mut workers = self.workers.lock();
            for handle in workers.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::IdentityStage;
    use std::sync::Arc;

    fn test_context(cfg: StreamConfig) -> StreamContext {
        StreamContext::new(cfg, Arc::new(IdentityStage), Services::default()).unwrap()
    }

    #[test]
    fn start_moves_idle_to_buffering_or_streaming() {
        let cfg = StreamConfig {
            buffer_count: 8,
            chunk_size: 64,
            processing_thread_count: 1,
            buffer_timeout_ms: 20,
            ..StreamConfig::default()
        };
        let ctx = test_context(cfg);
        ctx.start().unwrap();
        assert!(matches!(
            ctx.get_state(),
            StreamState::Buffering | StreamState::Streaming
        ));
        ctx.stop().unwrap();
        assert_eq!(ctx.get_state(), StreamState::Idle);
    }

    #[test]
    fn start_twice_is_invalid_state() {
        let ctx = test_context(StreamConfig::default());
        ctx.start().unwrap();
        assert!(ctx.start().is_err());
        ctx.stop().unwrap();
    }

    #[test]
    fn push_audio_requires_active_state() {
        let ctx = test_context(StreamConfig::default());
        let err = ctx.push_audio(&[0.0; 256], 128).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    /// A stage that parks its caller for a bounded, generous duration
    /// before copying through. With one worker, this keeps at most one
    /// chunk "in flight" outside the ring for the whole test window, so
    /// pushing more than `capacity + 1` single-chunk submissions must
    /// eventually overflow regardless of scheduling order.
    struct SlowStage(std::time::Duration);

    impl Stage for SlowStage {
        fn process(&self, chunk_in: &Chunk, chunk_out: &mut Chunk, _quality: f32) -> CoreResult<()> {
            std::thread::sleep(self.0);
            Chunk::copy(chunk_in, chunk_out)
        }
    }

    #[test]
    fn backpressure_reports_buffer_full() {
        let cfg = StreamConfig {
            buffer_count: 2,
            chunk_size: 64,
            channel_count: 1,
            processing_thread_count: 1,
            buffer_timeout_ms: 5,
            ..StreamConfig::default()
        };
        let ctx = StreamContext::new(
            cfg,
            Arc::new(SlowStage(std::time::Duration::from_millis(300))),
            Services::default(),
        )
        .unwrap();
        ctx.start().unwrap();

        let chunk = vec![0.0f32; 64];
        let mut ok_count = 0;
        let mut saw_full = false;
        for _ in 0..4 {
            match ctx.push_audio(&chunk, 64) {
                Ok(_) => ok_count += 1,
                Err(CoreError::BufferFull) => saw_full = true,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert!(saw_full, "expected at least one BufferFull among 4 pushes");
        assert!(ok_count <= 3, "at most capacity+1 single-worker pushes can succeed");
        assert!(ctx.get_stats().overruns >= 1);
        ctx.stop().unwrap();
    }

    #[test]
    fn resize_buffers_requires_idle() {
        let ctx = test_context(StreamConfig::default());
        ctx.start().unwrap();
        assert!(ctx.resize_buffers(16).is_err());
        ctx.stop().unwrap();
        assert!(ctx.resize_buffers(16).is_ok());
    }

    #[test]
    fn pop_chunk_empty_when_nothing_produced() {
        let ctx = test_context(StreamConfig::default());
        let err = ctx.pop_chunk().unwrap_err();
        assert!(matches!(err, CoreError::BufferEmpty));
    }

    #[test]
    fn reset_requires_error() {
        let ctx = test_context(StreamConfig::default());
        assert!(ctx.reset().is_err());
    }

    #[test]
    fn reset_recovers_from_error_to_idle() {
        let ctx = test_context(StreamConfig::default());
        {
            let mut state = ctx.state.lock();
            *state = StreamState::Error;
        }
        ctx.reset().unwrap();
        assert_eq!(ctx.get_state(), StreamState::Idle);
        // Idle accepts a fresh start after reset.
        ctx.start().unwrap();
        ctx.stop().unwrap();
    }

    #[test]
    fn state_callback_fires_on_transitions() {
        let ctx = test_context(StreamConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        ctx.set_state_callback(move |old, new| {
            seen_cb.lock().push((old, new));
        });
        ctx.start().unwrap();
        ctx.stop().unwrap();

        let events = seen.lock().clone();
        assert!(events.contains(&(StreamState::Idle, StreamState::Initializing)));
        assert!(events.contains(&(StreamState::Stopping, StreamState::Idle)));
    }

    /// A stage that always fails, so the error callback's chunk sequence
    /// number can be checked against what was actually pushed.
    struct FailingStage;

    impl Stage for FailingStage {
        fn process(&self, _chunk_in: &Chunk, _chunk_out: &mut Chunk, _quality: f32) -> CoreResult<()> {
            Err(CoreError::InvalidState("stage always fails".into()))
        }
    }

    #[test]
    fn error_callback_fires_with_chunk_sequence_number() {
        let cfg = StreamConfig {
            buffer_count: 4,
            chunk_size: 64,
            channel_count: 1,
            processing_thread_count: 1,
            buffer_timeout_ms: 20,
            ..StreamConfig::default()
        };
        let ctx = StreamContext::new(cfg, Arc::new(FailingStage), Services::default()).unwrap();
        let seen: Arc<Mutex<Option<(String, u64)>>> = Arc::new(Mutex::new(None));
        let seen_cb = seen.clone();
        ctx.set_error_callback(move |kind, _message, seq| {
            *seen_cb.lock() = Some((kind.to_string(), seq));
        });

        ctx.start().unwrap();
        ctx.push_audio(&vec![0.0f32; 64], 64).unwrap();

        let mut attempts = 0;
        while seen.lock().is_none() && attempts < 100 {
            std::thread::sleep(std::time::Duration::from_millis(10));
            attempts += 1;
        }
        ctx.stop().unwrap();

        let (kind, seq) = seen.lock().clone().expect("error callback should have fired");
        assert_eq!(kind, "InvalidState");
        assert_eq!(seq, 0);
    }

    #[test]
    fn audio_callback_fires_after_successful_processing() {
        let cfg = StreamConfig {
            buffer_count: 4,
            chunk_size: 64,
            channel_count: 1,
            processing_thread_count: 1,
            buffer_timeout_ms: 20,
            ..StreamConfig::default()
        };
        let ctx = test_context(cfg);
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count_cb = count.clone();
        ctx.set_audio_callback(move |_chunk| {
            count_cb.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });

        ctx.start().unwrap();
        ctx.push_audio(&vec![0.0f32; 64], 64).unwrap();

        let mut attempts = 0;
        while count.load(std::sync::atomic::Ordering::Relaxed) == 0 && attempts < 100 {
            std::thread::sleep(std::time::Duration::from_millis(10));
            attempts += 1;
        }
        ctx.stop().unwrap();
        assert!(count.load(std::sync::atomic::Ordering::Relaxed) >= 1);
    }
}
