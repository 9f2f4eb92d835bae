//! Fixed-shape audio chunk record (C1)

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::CoreError;

/// A fixed-frame audio segment traveling through the pipeline.
///
/// Ownership is single-holder: the producer holds it until enqueue, the
/// ring buffer holds it between enqueue and dequeue, and a worker holds it
/// from dequeue until `release`. The type itself does not enforce this —
/// the pipeline's single-holder discipline does (see `le-pipeline`).
#[derive(Debug, Clone)]
pub struct Chunk {
    buffer: Vec<f32>,
    frame_count: usize,
    channel_count: usize,
    sample_rate: u32,
    sequence_number: u64,
    submitted_at_ns: u64,
    is_final: bool,
}

impl Chunk {
    /// Create a chunk with a zero-initialized buffer of `frame_count * channel_count` samples.
    pub fn create(frame_count: usize, channel_count: usize, sample_rate: u32) -> Result<Self, CoreError> {
        if frame_count == 0 {
            return Err(CoreError::InvalidArgument(
                "frame_count must be > 0".into(),
            ));
        }
        if channel_count == 0 {
            return Err(CoreError::InvalidArgument(
                "channel_count must be > 0".into(),
            ));
        }

        Ok(Self {
            buffer: vec![0.0; frame_count * channel_count],
            frame_count,
            channel_count,
            sample_rate,
            sequence_number: 0,
            submitted_at_ns: 0,
            is_final: false,
        })
    }

    /// Create a chunk reusing a caller-supplied buffer (e.g. one returned by an arena).
    /// The buffer is zero-filled and resized to the required length.
    pub fn create_with_buffer(
        mut buffer: Vec<f32>,
        frame_count: usize,
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, CoreError> {
        if frame_count == 0 || channel_count == 0 {
            return Err(CoreError::InvalidArgument(
                "frame_count and channel_count must be > 0".into(),
            ));
        }
        let needed = frame_count * channel_count;
        buffer.clear();
        buffer.resize(needed, 0.0);

        Ok(Self {
            buffer,
            frame_count,
            channel_count,
            sample_rate,
            sequence_number: 0,
            submitted_at_ns: 0,
            is_final: false,
        })
    }

    /// Copy `src` into `dst`. Preserves `sequence_number`, `submitted_at`, and `is_final`.
    /// Fails with `BufferTooSmall` if `dst` cannot hold `src`'s samples.
    pub fn copy(src: &Chunk, dst: &mut Chunk) -> Result<(), CoreError> {
        if dst.buffer.len() < src.buffer.len() {
            return Err(CoreError::BufferTooSmall {
                needed: src.buffer.len(),
                available: dst.buffer.len(),
            });
        }
        dst.buffer[..src.buffer.len()].copy_from_slice(&src.buffer);
        dst.frame_count = src.frame_count;
        dst.channel_count = src.channel_count;
        dst.sample_rate = src.sample_rate;
        dst.sequence_number = src.sequence_number;
        dst.submitted_at_ns = src.submitted_at_ns;
        dst.is_final = src.is_final;
        Ok(())
    }

    /// Release the chunk, returning its sample buffer for arena reuse.
    pub fn release(self) -> Vec<f32> {
        self.buffer
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    #[inline]
    pub fn submitted_at_ns(&self) -> u64 {
        self.submitted_at_ns
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.buffer
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.buffer
    }

    pub fn set_is_final(&mut self, is_final: bool) {
        self.is_final = is_final;
    }

    /// Stamp the producer-assigned identity fields. Called once, by `push_audio`.
    pub fn stamp(&mut self, sequence_number: u64, submitted_at_ns: u64) {
        self.sequence_number = sequence_number;
        self.submitted_at_ns = submitted_at_ns;
    }
}

/// A buffer pool that chunk producers and workers can use to avoid
/// reallocating sample buffers on every `create`/`release` cycle.
///
/// Modeled on the fixed-block-size buffer pool pattern used for audio
/// graph processing (index-based acquire/release over a `Vec<Vec<f32>>>`),
/// generalized to pool by buffer length since chunk sizes can vary.
pub struct ChunkArena {
    pools: Mutex<HashMap<usize, Vec<Vec<f32>>>>,
}

impl ChunkArena {
    pub fn new() -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Take a buffer of exactly `len` samples, reusing a pooled one if available.
    pub fn acquire(&self, len: usize) -> Vec<f32> {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get_mut(&len) {
            if let Some(buf) = pool.pop() {
                return buf;
            }
        }
        vec![0.0; len]
    }

    /// Return a released chunk buffer to the arena for reuse.
    pub fn release(&self, buf: Vec<f32>) {
        let len = buf.len();
        let mut pools = self.pools.lock();
        pools.entry(len).or_default().push(buf);
    }

    /// Number of buffers currently pooled, across all lengths.
    pub fn pooled_count(&self) -> usize {
        let pools = self.pools.lock();
        pools.values().map(|v| v.len()).sum()
    }
}

impl Default for ChunkArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_zero_initializes() {
        let c = Chunk::create(256, 2, 44100).unwrap();
        assert_eq!(c.frame_count(), 256);
        assert_eq!(c.channel_count(), 2);
        assert!(c.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn create_rejects_zero_frames() {
        assert!(Chunk::create(0, 2, 44100).is_err());
    }

    #[test]
    fn copy_preserves_identity_fields() {
        let mut src = Chunk::create(4, 1, 44100).unwrap();
        src.stamp(42, 1_000_000);
        src.set_is_final(true);
        src.samples_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);

        let mut dst = Chunk::create(4, 1, 44100).unwrap();
        Chunk::copy(&src, &mut dst).unwrap();

        assert_eq!(dst.sequence_number(), 42);
        assert_eq!(dst.submitted_at_ns(), 1_000_000);
        assert!(dst.is_final());
        assert_eq!(dst.samples(), src.samples());
    }

    #[test]
    fn copy_rejects_undersized_destination() {
        let src = Chunk::create(8, 2, 44100).unwrap();
        let mut dst = Chunk::create(2, 2, 44100).unwrap();
        let err = Chunk::copy(&src, &mut dst).unwrap_err();
        assert!(matches!(err, CoreError::BufferTooSmall { .. }));
    }

    #[test]
    fn arena_reuses_released_buffers() {
        let arena = ChunkArena::new();
        let buf = arena.acquire(512);
        assert_eq!(buf.len(), 512);
        arena.release(buf);
        assert_eq!(arena.pooled_count(), 1);

        let reused = arena.acquire(512);
        assert_eq!(reused.len(), 512);
        assert_eq!(arena.pooled_count(), 0);
    }
}
