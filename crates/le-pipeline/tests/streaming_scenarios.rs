//! End-to-end scenarios from §8.

use std::sync::Arc;
use std::time::Duration;

use le_core::{Chunk, Services};
use le_pipeline::{IdentityStage, Stage, StreamConfig, StreamContext};

#[test]
fn streaming_round_trip_preserves_samples_and_order() {
    let cfg = StreamConfig {
        sample_rate: 44_100,
        chunk_size: 256,
        buffer_count: 8,
        channel_count: 1,
        target_latency_ms: 10,
        max_latency_ms: 50,
        processing_thread_count: 2,
        buffer_timeout_ms: 50,
        ..StreamConfig::default()
    };
    let ctx = StreamContext::new(cfg, Arc::new(IdentityStage), Services::default()).unwrap();
    ctx.start().unwrap();

    let input: Vec<f32> = (0..4096).map(|i| i as f32 / 4096.0).collect();
    ctx.push_audio(&input, input.len()).unwrap();

    let mut collected = Vec::with_capacity(input.len());
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while collected.len() < input.len() && std::time::Instant::now() < deadline {
        match ctx.pop_chunk() {
            Ok(chunk) => collected.extend_from_slice(chunk.samples()),
            Err(_) => std::thread::sleep(Duration::from_millis(2)),
        }
    }

    assert_eq!(collected.len(), input.len());
    assert_eq!(collected, input);

    let stats = ctx.get_stats();
    assert_eq!(stats.chunks_processed, 16);
    assert_eq!(stats.underruns, 0);
    assert_eq!(stats.overruns, 0);

    ctx.stop().unwrap();
}

#[test]
fn backpressure_rejects_third_chunk_with_no_drain() {
    struct NeverDrainsStage;
    impl Stage for NeverDrainsStage {
        fn process(
            &self,
            chunk_in: &Chunk,
            chunk_out: &mut Chunk,
            _quality: f32,
        ) -> Result<(), le_core::CoreError> {
            std::thread::sleep(Duration::from_millis(500));
            Chunk::copy(chunk_in, chunk_out)
        }
    }

    let cfg = StreamConfig {
        buffer_count: 2,
        chunk_size: 64,
        channel_count: 1,
        processing_thread_count: 1,
        buffer_timeout_ms: 5,
        ..StreamConfig::default()
    };
    let ctx = StreamContext::new(cfg, Arc::new(NeverDrainsStage), Services::default()).unwrap();
    ctx.start().unwrap();

    let chunk = vec![0.0f32; 64];
    assert!(ctx.push_audio(&chunk, 64).is_ok());
    assert!(ctx.push_audio(&chunk, 64).is_ok());

    let mut saw_full = false;
    for _ in 0..3 {
        if ctx.push_audio(&chunk, 64).is_err() {
            saw_full = true;
            break;
        }
    }
    assert!(saw_full);
    assert!(ctx.get_stats().overruns >= 1);

    ctx.stop().unwrap();
}

#[test]
fn quality_downgrades_under_sustained_slow_stage() {
    struct SlowStage;
    impl Stage for SlowStage {
        fn process(
            &self,
            chunk_in: &Chunk,
            chunk_out: &mut Chunk,
            _quality: f32,
        ) -> Result<(), le_core::CoreError> {
            std::thread::sleep(Duration::from_millis(60));
            Chunk::copy(chunk_in, chunk_out)
        }
    }

    let cfg = StreamConfig {
        buffer_count: 16,
        chunk_size: 64,
        channel_count: 1,
        processing_thread_count: 1,
        target_latency_ms: 10,
        max_latency_ms: 50,
        buffer_timeout_ms: 20,
        enable_quality_adaptation: true,
        ..StreamConfig::default()
    };
    let ctx = StreamContext::new(cfg, Arc::new(SlowStage), Services::default()).unwrap();
    ctx.start().unwrap();

    let chunk = vec![0.0f32; 64];
    let deadline = std::time::Instant::now() + Duration::from_secs(3);
    while std::time::Instant::now() < deadline && ctx.quality() >= 1.0 {
        let _ = ctx.push_audio(&chunk, 64);
        std::thread::sleep(Duration::from_millis(50));
    }

    assert!(ctx.quality() < 1.0);
    assert!(ctx.get_stats().quality_adaptations > 0);

    ctx.stop().unwrap();
}
