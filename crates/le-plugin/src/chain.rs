//! Linear plugin processing chain, grounded on the teacher's
//! `ZeroCopyChain`: an ordered list of slots, each optionally bypassed,
//! processed through a ping-pong pair of scratch buffers instead of the
//! teacher's `BufferPool`/`PdcManager`/`DelayLine` machinery (PDC and
//! pooled buffer reuse are out of this spec's scope; the ping-pong pair is
//! the minimal zero-allocation-per-block equivalent).

use crate::arena::Handle;
use crate::graph::DependencyGraph;
use crate::record::{PluginRecord, PluginState};
use crate::{PluginError, PluginResult};
use le_core::CoreError;

struct ChainSlot {
    handle: Handle<PluginRecord>,
    bypass: bool,
}

/// An ordered sequence of `Active` plugins processed back to back.
pub struct ProcessChain {
    slots: Vec<ChainSlot>,
    scratch_a: Vec<f32>,
    scratch_b: Vec<f32>,
}

impl ProcessChain {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            scratch_a: Vec::new(),
            scratch_b: Vec::new(),
        }
    }

    pub fn push(&mut self, handle: Handle<PluginRecord>) {
        self.slots.push(ChainSlot { handle, bypass: false });
    }

    pub fn remove(&mut self, handle: Handle<PluginRecord>) {
        self.slots.retain(|s| s.handle != handle);
    }

    pub fn set_bypass(&mut self, handle: Handle<PluginRecord>, bypass: bool) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.handle == handle) {
            slot.bypass = bypass;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Process `input` through every non-bypassed, `Active` slot in order,
    /// writing the final result into `output`. Bypassed or non-active slots
    /// pass their input through unchanged.
    pub fn process(&mut self, graph: &DependencyGraph, input: &[f32], output: &mut [f32]) -> PluginResult<()> {
        let n = input.len().min(output.len());
        self.scratch_a.resize(n, 0.0);
        self.scratch_b.resize(n, 0.0);
        self.scratch_a[..n].copy_from_slice(&input[..n]);

        let mut current = 0usize; // 0 = scratch_a is the live buffer, 1 = scratch_b
        for slot in &self.slots {
            if slot.bypass {
                continue;
            }
            let record = graph
                .get(slot.handle)
                .ok_or_else(|| PluginError::Core(CoreError::NotFound("chain slot handle".into())))?;
            if record.state != PluginState::Active {
                continue;
            }
            let library = record
                .library
                .as_ref()
                .ok_or_else(|| PluginError::Core(CoreError::InvalidState("no library loaded".into())))?;

            let (src, dst) = if current == 0 {
                (&self.scratch_a, &mut self.scratch_b)
            } else {
                (&self.scratch_b, &mut self.scratch_a)
            };
            let code = unsafe { (library.abi.process)(std::ptr::null_mut(), src.as_ptr(), dst.as_mut_ptr(), n) };
            if code != 0 {
                return Err(PluginError::Core(CoreError::PluginProcessFailed(record.name().to_string())));
            }
            current = 1 - current;
        }

        let result = if current == 0 { &self.scratch_a } else { &self.scratch_b };
        output[..n].copy_from_slice(&result[..n]);
        Ok(())
    }

    /// Sum of each active slot's reported latency, for PDC-less hosts that
    /// still want to know total added delay.
    pub fn total_latency(&self, graph: &DependencyGraph) -> u32 {
        self.slots
            .iter()
            .filter(|s| !s.bypass)
            .filter_map(|s| graph.get(s.handle))
            .filter_map(|record| record.library.as_ref())
            .filter_map(|library| library.abi.get_latency)
            .map(|get_latency| unsafe { get_latency(std::ptr::null_mut()) })
            .sum()
    }
}

impl Default for ProcessChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PluginKind, PluginMetadata};
    use uuid::Uuid;

    #[test]
    fn empty_chain_passes_through_silently() {
        let graph = DependencyGraph::new();
        let mut chain = ProcessChain::new();
        let input = [1.0_f32, 2.0, 3.0];
        let mut output = [0.0_f32; 3];
        chain.process(&graph, &input, &mut output).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn non_active_slot_is_skipped() {
        let mut graph = DependencyGraph::new();
        let record = PluginRecord::new(PluginMetadata::new(
            "X",
            le_core::Version::new(1, 0, 0, 0),
            PluginKind::Effect,
            Uuid::new_v4(),
        ));
        let handle = graph.add(record);
        let mut chain = ProcessChain::new();
        chain.push(handle);

        let input = [1.0_f32, 2.0, 3.0];
        let mut output = [0.0_f32; 3];
        chain.process(&graph, &input, &mut output).unwrap();
        assert_eq!(output, input);
    }
}
