//! Sequence-order reassembly for produced chunks.
//!
//! Workers dequeue chunks from the input ring in submission order (the
//! ring's pop is always FIFO), but with more than one worker thread the
//! stage calls themselves run concurrently, so completion order is not
//! guaranteed to match submission order. This buffer holds finished
//! chunks until every lower sequence number has been forwarded, so
//! `pop_chunk` always observes the same order `push_audio` submitted —
//! the ordering guarantee in §5.

use std::collections::BTreeMap;

use le_core::Chunk;
use parking_lot::Mutex;

use crate::ring::{PushOutcome, RingBuffer};

struct State {
    next_expected: u64,
    pending: BTreeMap<u64, Chunk>,
}

pub struct ReorderBuffer {
    state: Mutex<State>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_expected: 0,
                pending: BTreeMap::new(),
            }),
        }
    }

    /// Reset to expect sequence 0 again (called on `start`).
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.next_expected = 0;
        state.pending.clear();
    }

    /// Accept a finished chunk and forward every contiguous run starting
    /// at `next_expected` into `output`. Returns the number of chunks
    /// dropped because `output` was full.
    pub fn submit(&self, chunk: Chunk, output: &RingBuffer) -> usize {
        let mut state = self.state.lock();
        state.pending.insert(chunk.sequence_number(), chunk);

        let mut dropped = 0;
        while let Some(seq) = state.pending.keys().next().copied() {
            if seq != state.next_expected {
                break;
            }
            let chunk = state.pending.remove(&seq).expect("key just observed");
            state.next_expected += 1;
            if let PushOutcome::Full = output.try_push(chunk) {
                dropped += 1;
            }
        }
        dropped
    }
}

impl Default for ReorderBuffer {
    fn default() -> Self {
        Self::new()
    }
}
