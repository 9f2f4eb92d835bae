//! Quality controller (C5, §4.5)
//!
//! Ticked by a worker roughly once a second; the adjustment rule only
//! looks at the latest latency sample against the configured target and
//! max. Disabling adaptation freezes `q` — `maybe_tick` becomes a no-op,
//! it does not merely skip the counter increment.

use portable_atomic::{AtomicF32, AtomicU64};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::stats::StreamStats;

const TICK_INTERVAL_NS: u64 = 1_000_000_000;

pub struct QualityController {
    quality: AtomicF32,
    enabled: AtomicBool,
    last_tick_ns: AtomicU64,
}

impl QualityController {
    pub fn new(initial_quality: f32, enabled: bool) -> Self {
        Self {
            quality: AtomicF32::new(initial_quality.clamp(0.0, 1.0)),
            enabled: AtomicBool::new(enabled),
            last_tick_ns: AtomicU64::new(0),
        }
    }

    pub fn quality(&self) -> f32 {
        self.quality.load(Ordering::Relaxed)
    }

    /// Explicit setter, always clips to `[0, 1]` regardless of `enabled`.
    pub fn set_quality(&self, q: f32) {
        self.quality.store(q.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Apply the adjustment rule if adaptation is enabled and at least
    /// `TICK_INTERVAL_NS` has elapsed since the last tick. Returns `true`
    /// if the rule ran (whether or not it changed `q`).
    pub fn maybe_tick(
        &self,
        now_ns: u64,
        current_latency_ms: f64,
        target_latency_ms: u64,
        max_latency_ms: u64,
        stats: &StreamStats,
    ) -> bool {
        if !self.enabled() {
            return false;
        }

        let last = self.last_tick_ns.load(Ordering::Relaxed);
        if now_ns.saturating_sub(last) < TICK_INTERVAL_NS {
            return false;
        }
        self.last_tick_ns.store(now_ns, Ordering::Relaxed);

        let q = self.quality();
        if current_latency_ms > max_latency_ms as f64 {
            let next = (q - 0.1).max(0.1);
            self.quality.store(next, Ordering::Relaxed);
            stats.record_quality_adaptation(next);
        } else if current_latency_ms < target_latency_ms as f64 {
            let next = (q + 0.05).min(1.0);
            self.quality.store(next, Ordering::Relaxed);
            stats.record_quality_adaptation(next);
        } else {
            stats.record_quality_sample(q);
        }
        true
    }
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new(1.0, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn downgrades_when_latency_exceeds_max() {
        let qc = QualityController::new(1.0, true);
        let stats = StreamStats::new();
        assert!(qc.maybe_tick(TICK_INTERVAL_NS, 80.0, 10, 50, &stats));
        assert_relative_eq!(qc.quality(), 0.9, epsilon = 1e-6);
        assert_eq!(stats.snapshot().quality_adaptations, 1);
    }

    #[test]
    fn clamps_downgrade_floor_at_one_tenth() {
        let qc = QualityController::new(0.12, true);
        let stats = StreamStats::new();
        qc.maybe_tick(TICK_INTERVAL_NS, 80.0, 10, 50, &stats);
        assert_relative_eq!(qc.quality(), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn upgrades_when_latency_below_target() {
        let qc = QualityController::new(0.5, true);
        let stats = StreamStats::new();
        qc.maybe_tick(TICK_INTERVAL_NS, 2.0, 10, 50, &stats);
        assert_relative_eq!(qc.quality(), 0.55, epsilon = 1e-6);
    }

    #[test]
    fn unchanged_within_target_and_max() {
        let qc = QualityController::new(0.7, true);
        let stats = StreamStats::new();
        qc.maybe_tick(TICK_INTERVAL_NS, 20.0, 10, 50, &stats);
        assert_relative_eq!(qc.quality(), 0.7, epsilon = 1e-6);
        assert_eq!(stats.snapshot().quality_adaptations, 0);
    }

    #[test]
    fn disabled_freezes_quality() {
        let qc = QualityController::new(0.7, false);
        let stats = StreamStats::new();
        assert!(!qc.maybe_tick(TICK_INTERVAL_NS, 80.0, 10, 50, &stats));
        assert_relative_eq!(qc.quality(), 0.7, epsilon = 1e-6);
    }

    #[test]
    fn respects_one_second_tick_interval() {
        let qc = QualityController::new(1.0, true);
        let stats = StreamStats::new();
        assert!(qc.maybe_tick(TICK_INTERVAL_NS, 80.0, 10, 50, &stats));
        assert!(!qc.maybe_tick(TICK_INTERVAL_NS + 10, 80.0, 10, 50, &stats));
    }

    #[test]
    fn explicit_setter_clips_range() {
        let qc = QualityController::new(0.5, true);
        qc.set_quality(5.0);
        assert_relative_eq!(qc.quality(), 1.0, epsilon = 1e-6);
        qc.set_quality(-5.0);
        assert_relative_eq!(qc.quality(), 0.0, epsilon = 1e-6);
    }
}
