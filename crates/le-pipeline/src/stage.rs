//! Stage function collaborator (§6.2)
//!
//! The DSP/vocoder work itself is out of scope; the pipeline only needs
//! something shaped like `stage(chunk_in, chunk_out, quality) -> Ok|Failed`
//! that it can call from a worker thread. Any closure of that shape works
//! via the blanket impl, matching the "plugin chain as a callable" pattern
//! the plugin host uses for its own process hooks.

use le_core::{Chunk, CoreError};

/// A DSP/vocoder stage invoked once per chunk.
///
/// Implementors read `quality` on every call and may cut corners when it is
/// low (coarser FFT size, skipped refinement passes). Expected to be pure
/// with respect to the chunk — no I/O that could block the worker for more
/// than a few milliseconds.
pub trait Stage: Send + Sync {
    fn process(&self, chunk_in: &Chunk, chunk_out: &mut Chunk, quality: f32) -> Result<(), CoreError>;
}

impl<F> Stage for F
where
    F: Fn(&Chunk, &mut Chunk, f32) -> Result<(), CoreError> + Send + Sync,
{
    fn process(&self, chunk_in: &Chunk, chunk_out: &mut Chunk, quality: f32) -> Result<(), CoreError> {
        self(chunk_in, chunk_out, quality)
    }
}

/// A stage that copies input to output unchanged, ignoring quality.
/// Used in tests and as a trivial default for hosts that only want
/// pass-through buffering.
pub struct IdentityStage;

impl Stage for IdentityStage {
    fn process(&self, chunk_in: &Chunk, chunk_out: &mut Chunk, _quality: f32) -> Result<(), CoreError> {
        Chunk::copy(chunk_in, chunk_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_stage_copies_samples() {
        let mut src = Chunk::create(4, 1, 44100).unwrap();
        src.samples_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let mut dst = Chunk::create(4, 1, 44100).unwrap();

        IdentityStage.process(&src, &mut dst, 1.0).unwrap();
        assert_eq!(dst.samples(), src.samples());
    }

    #[test]
    fn closure_stage_is_usable() {
        let stage = |chunk_in: &Chunk, chunk_out: &mut Chunk, quality: f32| {
            Chunk::copy(chunk_in, chunk_out)?;
            for sample in chunk_out.samples_mut() {
                *sample *= quality;
            }
            Ok(())
        };

        let mut src = Chunk::create(2, 1, 44100).unwrap();
        src.samples_mut().copy_from_slice(&[2.0, 4.0]);
        let mut dst = Chunk::create(2, 1, 44100).unwrap();

        stage.process(&src, &mut dst, 0.5).unwrap();
        assert_eq!(dst.samples(), &[1.0, 2.0]);
    }
}
