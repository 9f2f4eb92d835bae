//! Stream statistics block (§4.3, §5)
//!
//! All counters are atomics so workers can update them without taking the
//! stats mutex on the hot path; `snapshot()` is the one place that reads
//! them all together for a caller that wants a consistent-enough view
//! (per §5, readers take a snapshot rather than assume cross-counter
//! atomicity).

use portable_atomic::{AtomicF32, AtomicU64};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A point-in-time read of every counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub chunks_processed: u64,
    pub frames_processed: u64,
    pub processing_time_ns: u64,
    pub buffer_level: usize,
    pub high_water_mark: usize,
    pub underruns: u64,
    pub overruns: u64,
    pub errors: u64,
    pub dropped_chunks: u64,
    pub quality_adaptations: u64,
    pub current_quality: f32,
    pub average_quality: f32,
    pub current_latency_ms: f64,
    pub max_latency_ms_observed: f64,
    pub average_latency_ms: f64,
}

pub struct StreamStats {
    chunks_processed: AtomicU64,
    frames_processed: AtomicU64,
    processing_time_ns: AtomicU64,
    buffer_level: AtomicUsize,
    high_water_mark: AtomicUsize,
    underruns: AtomicU64,
    overruns: AtomicU64,
    errors: AtomicU64,
    dropped_chunks: AtomicU64,
    quality_adaptations: AtomicU64,
    quality_sum: AtomicF32,
    quality_samples: AtomicU64,
    current_quality: AtomicF32,
    latency_sum_ms: AtomicF32,
    latency_samples: AtomicU64,
    max_latency_ms_observed: AtomicF32,
    current_latency_ms: AtomicF32,
}

impl StreamStats {
    pub fn new() -> Self {
        Self {
            chunks_processed: AtomicU64::new(0),
            frames_processed: AtomicU64::new(0),
            processing_time_ns: AtomicU64::new(0),
            buffer_level: AtomicUsize::new(0),
            high_water_mark: AtomicUsize::new(0),
            underruns: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            dropped_chunks: AtomicU64::new(0),
            quality_adaptations: AtomicU64::new(0),
            quality_sum: AtomicF32::new(0.0),
            quality_samples: AtomicU64::new(0),
            current_quality: AtomicF32::new(1.0),
            latency_sum_ms: AtomicF32::new(0.0),
            latency_samples: AtomicU64::new(0),
            max_latency_ms_observed: AtomicF32::new(0.0),
            current_latency_ms: AtomicF32::new(0.0),
        }
    }

    pub fn record_chunk_processed(&self, frame_count: usize, processing_time_ns: u64) {
        self.chunks_processed.fetch_add(1, Ordering::Relaxed);
        self.frames_processed
            .fetch_add(frame_count as u64, Ordering::Relaxed);
        self.processing_time_ns
            .fetch_add(processing_time_ns, Ordering::Relaxed);
    }

    pub fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_chunk(&self) {
        self.dropped_chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_quality_adaptation(&self, quality: f32) {
        self.quality_adaptations.fetch_add(1, Ordering::Relaxed);
        self.record_quality_sample(quality);
    }

    pub fn record_quality_sample(&self, quality: f32) {
        self.current_quality.store(quality, Ordering::Relaxed);
        self.quality_sum.fetch_add(quality, Ordering::Relaxed);
        self.quality_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency_ms(&self, latency_ms: f64) {
        let latency_ms = latency_ms as f32;
        self.current_latency_ms.store(latency_ms, Ordering::Relaxed);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
        let mut observed = self.max_latency_ms_observed.load(Ordering::Relaxed);
        while latency_ms > observed {
            match self.max_latency_ms_observed.compare_exchange_weak(
                observed,
                latency_ms,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => observed = current,
            }
        }
    }

    pub fn set_buffer_level(&self, level: usize) {
        self.buffer_level.store(level, Ordering::Relaxed);
        self.high_water_mark.fetch_max(level, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let quality_samples = self.quality_samples.load(Ordering::Relaxed);
        let average_quality = if quality_samples > 0 {
            self.quality_sum.load(Ordering::Relaxed) / quality_samples as f32
        } else {
            self.current_quality.load(Ordering::Relaxed)
        };
        let latency_samples = self.latency_samples.load(Ordering::Relaxed);
        let average_latency_ms = if latency_samples > 0 {
            (self.latency_sum_ms.load(Ordering::Relaxed) / latency_samples as f32) as f64
        } else {
            0.0
        };

        StatsSnapshot {
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            processing_time_ns: self.processing_time_ns.load(Ordering::Relaxed),
            buffer_level: self.buffer_level.load(Ordering::Relaxed),
            high_water_mark: self.high_water_mark.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            dropped_chunks: self.dropped_chunks.load(Ordering::Relaxed),
            quality_adaptations: self.quality_adaptations.load(Ordering::Relaxed),
            current_quality: self.current_quality.load(Ordering::Relaxed),
            average_quality,
            current_latency_ms: self.current_latency_ms.load(Ordering::Relaxed) as f64,
            max_latency_ms_observed: self.max_latency_ms_observed.load(Ordering::Relaxed) as f64,
            average_latency_ms,
        }
    }

    /// Reset every counter to zero (§4.3 `reset_stats`).
    pub fn reset(&self) {
        self.chunks_processed.store(0, Ordering::Relaxed);
        self.frames_processed.store(0, Ordering::Relaxed);
        self.processing_time_ns.store(0, Ordering::Relaxed);
        self.high_water_mark.store(0, Ordering::Relaxed);
        self.underruns.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.dropped_chunks.store(0, Ordering::Relaxed);
        self.quality_adaptations.store(0, Ordering::Relaxed);
        self.quality_sum.store(0.0, Ordering::Relaxed);
        self.quality_samples.store(0, Ordering::Relaxed);
        self.latency_sum_ms.store(0.0, Ordering::Relaxed);
        self.latency_samples.store(0, Ordering::Relaxed);
        self.max_latency_ms_observed.store(0.0, Ordering::Relaxed);
        self.current_latency_ms.store(0.0, Ordering::Relaxed);
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_values() {
        let stats = StreamStats::new();
        stats.record_chunk_processed(256, 1_000_000);
        stats.record_underrun();
        stats.record_overrun();
        stats.set_buffer_level(5);

        let snap = stats.snapshot();
        assert_eq!(snap.chunks_processed, 1);
        assert_eq!(snap.frames_processed, 256);
        assert_eq!(snap.underruns, 1);
        assert_eq!(snap.overruns, 1);
        assert_eq!(snap.buffer_level, 5);
        assert_eq!(snap.high_water_mark, 5);
    }

    #[test]
    fn reset_zeroes_monotone_counters() {
        let stats = StreamStats::new();
        stats.record_chunk_processed(10, 100);
        stats.record_error();
        stats.reset();
        let snap = stats.snapshot();
        assert_eq!(snap.chunks_processed, 0);
        assert_eq!(snap.errors, 0);
    }

    #[test]
    fn average_quality_tracks_samples() {
        let stats = StreamStats::new();
        stats.record_quality_sample(1.0);
        stats.record_quality_sample(0.5);
        let snap = stats.snapshot();
        assert!((snap.average_quality - 0.75).abs() < 1e-6);
    }
}
