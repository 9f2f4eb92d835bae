//! Plugin record (C9) and lifecycle state (§4.9)

use std::collections::HashMap;

use le_core::Version;
use uuid::Uuid;

use crate::abi::PluginLibrary;
use crate::metadata::PluginMetadata;

/// §4.9 lifecycle. `Error` is reachable from any other state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginState {
    Unloaded,
    Loaded,
    Initialized,
    Active,
    Error(String),
}

impl PluginState {
    /// Whether `to` is a legal transition target from `self`, per §4.9's
    /// `load` / `initialize` / `activate` / `deactivate` / `finalize` /
    /// `unload` chain plus the always-available `Error` transition.
    pub fn can_transition_to(&self, to: &PluginState) -> bool {
        use PluginState::*;
        if matches!(to, Error(_)) {
            return true;
        }
        matches!(
            (self, to),
            (Unloaded, Loaded)
                | (Loaded, Initialized)
                | (Initialized, Active)
                | (Active, Initialized)
                | (Initialized, Unloaded)
                | (Error(_), Unloaded)
        )
    }
}

/// An outgoing "A depends on B" edge (C8), stored on the dependent record.
/// Targets are referenced by name, not handle — the dependency graph
/// resolves the name against whatever versions are currently registered.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    pub target_name: String,
    pub min: Version,
    pub max: Option<Version>,
    pub required: bool,
}

/// One parameter's schema (name, range, default, automation flags). Carried
/// alongside the current value map on `PluginRecord`; mirrors the teacher's
/// `ParameterInfo` but drops the "normalized" field, since the record
/// separately owns current values and normalization is a host/UI concern.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub id: u32,
    pub name: String,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub steps: u32,
    pub automatable: bool,
    pub read_only: bool,
}

/// Processing context passed to a plugin's `initialize`/`process` ABI calls.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub sample_rate: f64,
    pub max_block_size: usize,
}

impl Default for HostContext {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_block_size: 512,
        }
    }
}

/// A plugin as tracked by the registry: metadata, lifecycle state, the
/// loaded library handle (`None` until `load`), parameter schema/values, and
/// the dependency edges the resolver walks.
pub struct PluginRecord {
    pub metadata: PluginMetadata,
    pub state: PluginState,
    pub library: Option<PluginLibrary>,
    pub context: Option<HostContext>,
    pub parameters: Vec<ParamSpec>,
    pub parameter_values: HashMap<u32, f64>,
    pub dependencies: Vec<DependencyEdge>,
}

impl PluginRecord {
    pub fn new(metadata: PluginMetadata) -> Self {
        Self {
            metadata,
            state: PluginState::Unloaded,
            library: None,
            context: None,
            parameters: Vec::new(),
            parameter_values: HashMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.metadata.uuid
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_allows_documented_chain() {
        use PluginState::*;
        assert!(Unloaded.can_transition_to(&Loaded));
        assert!(Loaded.can_transition_to(&Initialized));
        assert!(Initialized.can_transition_to(&Active));
        assert!(Active.can_transition_to(&Initialized));
        assert!(Initialized.can_transition_to(&Unloaded));
    }

    #[test]
    fn lifecycle_rejects_skipping_states() {
        use PluginState::*;
        assert!(!Unloaded.can_transition_to(&Active));
        assert!(!Loaded.can_transition_to(&Unloaded));
    }

    #[test]
    fn error_is_reachable_from_any_state() {
        use PluginState::*;
        for s in [Unloaded, Loaded, Initialized, Active] {
            assert!(s.can_transition_to(&Error("boom".into())));
        }
    }
}
