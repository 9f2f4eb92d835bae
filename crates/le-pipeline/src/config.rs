//! Stream configuration (§6.5)

use serde::{Deserialize, Serialize};

use le_core::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamMode {
    Realtime,
    Buffered,
    Adaptive,
}

/// Recognized stream configuration options (§6.5). Callbacks are not part
/// of this struct — hosts register them separately via `StreamContext`'s
/// `set_audio_callback`/`set_progress_callback`/`set_error_callback`/
/// `set_state_callback` (this mirrors the teacher's split between a
/// plain-data config struct and callback registration methods on the
/// owning context).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub mode: StreamMode,
    pub chunk_size: usize,
    pub buffer_count: usize,
    pub sample_rate: u32,
    pub channel_count: usize,
    pub target_latency_ms: u64,
    pub max_latency_ms: u64,
    pub enable_quality_adaptation: bool,
    pub quality_threshold: f32,
    pub min_buffer_size: usize,
    pub max_buffer_size: usize,
    pub buffer_timeout_ms: u64,
    pub processing_thread_count: usize,
    pub enable_thread_affinity: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mode: StreamMode::Adaptive,
            chunk_size: 256,
            buffer_count: 8,
            sample_rate: 44_100,
            channel_count: 2,
            target_latency_ms: 10,
            max_latency_ms: 50,
            enable_quality_adaptation: true,
            quality_threshold: 0.5,
            min_buffer_size: 2,
            max_buffer_size: 32,
            buffer_timeout_ms: 20,
            processing_thread_count: 2,
            enable_thread_affinity: false,
        }
    }
}

impl StreamConfig {
    /// Validate against §6.5's numeric rules. Returns the first violated rule.
    pub fn validate(&self) -> CoreResult<()> {
        if !(1..=8192).contains(&self.chunk_size) {
            return Err(CoreError::InvalidArgument(
                "chunk_size must be in (0, 8192]".into(),
            ));
        }
        if !(1..=64).contains(&self.buffer_count) {
            return Err(CoreError::InvalidArgument(
                "buffer_count must be in (0, 64]".into(),
            ));
        }
        if self.sample_rate == 0 || self.sample_rate > 192_000 {
            return Err(CoreError::InvalidArgument(
                "sample_rate must be in (0, 192000]".into(),
            ));
        }
        if !(1..=8).contains(&self.channel_count) {
            return Err(CoreError::InvalidArgument(
                "channel_count must be in (0, 8]".into(),
            ));
        }
        if self.target_latency_ms == 0 || self.target_latency_ms > 1000 {
            return Err(CoreError::InvalidArgument(
                "target_latency_ms must be in (0, 1000]".into(),
            ));
        }
        if self.max_latency_ms <= self.target_latency_ms {
            return Err(CoreError::InvalidArgument(
                "max_latency_ms must be > target_latency_ms".into(),
            ));
        }
        if self.min_buffer_size >= self.max_buffer_size {
            return Err(CoreError::InvalidArgument(
                "min_buffer_size must be < max_buffer_size".into(),
            ));
        }
        if !(1..=16).contains(&self.processing_thread_count) {
            return Err(CoreError::InvalidArgument(
                "processing_thread_count must be in (0, 16]".into(),
            ));
        }
        Ok(())
    }
}
