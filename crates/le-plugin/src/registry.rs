//! Plugin registry (C9, §4.9): lifecycle operations and directory scanning
//! layered over the lower-level `DependencyGraph`.
//!
//! The graph is a multi-version catalog (§8 scenario 5 keeps `A@1.0.0`,
//! `A@1.1.0`, and `A@1.2.0` registered simultaneously); the registry adds
//! the uniqueness and lifecycle rules that only apply to instances a host
//! has actually loaded. Grounded on `scanner.rs`'s `PluginScanner`
//! (`add_default_paths`, `scan_all`, `scan_directory`, `register_internal_plugins`),
//! generalized to the new ABI loader instead of per-format (VST3/CLAP/LV2)
//! loaders.

use std::path::{Path, PathBuf};

use le_core::{CoreError, Services};
use uuid::Uuid;

use crate::abi::{self, PluginLibrary};
use crate::arena::Handle;
use crate::cache::ResolutionCache;
use crate::config::DependencyConfig;
use crate::graph::{DependencyGraph, ResolvedResult};
use crate::metadata::PluginMetadata;
use crate::record::{HostContext, PluginRecord, PluginState};
use crate::{PluginError, PluginResult};

/// The dynamic-library filename suffix to scan for on this platform.
#[cfg(target_os = "windows")]
const LIBRARY_SUFFIX: &str = ".dll";
#[cfg(target_os = "macos")]
const LIBRARY_SUFFIX: &str = ".dylib";
#[cfg(all(unix, not(target_os = "macos")))]
const LIBRARY_SUFFIX: &str = ".so";

pub struct PluginRegistry {
    graph: DependencyGraph,
    config: DependencyConfig,
    services: Services,
    search_paths: Vec<PathBuf>,
}

impl PluginRegistry {
    pub fn new(config: DependencyConfig, services: Services) -> Self {
        Self {
            graph: DependencyGraph::new(),
            config,
            services,
            search_paths: Vec::new(),
        }
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut DependencyGraph {
        &mut self.graph
    }

    /// Walk every configured search path and register whatever valid plugin
    /// binaries are found. Returns the handles of newly-registered records;
    /// unreadable files and directories are skipped, not fatal.
    pub fn scan(&mut self) -> Vec<Handle<PluginRecord>> {
        let paths = self.search_paths.clone();
        let mut added = Vec::new();
        for dir in &paths {
            added.extend(self.scan_directory(dir));
        }
        added
    }

    fn scan_directory(&mut self, dir: &Path) -> Vec<Handle<PluginRecord>> {
        let mut added = Vec::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return added,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                added.extend(self.scan_directory(&path));
                continue;
            }
            if path.extension().and_then(|e| e.to_str()).map(|e| format!(".{e}")) != Some(LIBRARY_SUFFIX.to_string()) {
                continue;
            }
            if let Ok(handle) = self.scan_file(&path) {
                added.push(handle);
            }
        }
        added
    }

    fn scan_file(&mut self, path: &Path) -> PluginResult<Handle<PluginRecord>> {
        let checksum = abi::compute_checksum(path)?;
        let library = unsafe { PluginLibrary::load(path)? };
        // A real ABI would expose a `get_info`/metadata symbol to read name,
        // uuid, version, kind from; until that handshake is specified more
        // precisely this derives a placeholder identity from the file name
        // so the record still round-trips through the graph and cache.
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        for existing in self.graph.find_by_name(&stem) {
            if let Some(record) = self.graph.get(existing) {
                if matches!(record.state, PluginState::Loaded | PluginState::Active) {
                    return Err(PluginError::Core(CoreError::InvalidState(format!(
                        "{stem:?} is already {:?} under another handle",
                        record.state
                    ))));
                }
            }
        }

        let mut metadata = PluginMetadata::new(
            stem,
            le_core::Version::new(1, 0, 0, 0),
            crate::metadata::PluginKind::Effect,
            Uuid::new_v4(),
        );
        metadata.checksum = checksum;

        let mut record = PluginRecord::new(metadata);
        record.library = Some(library);
        record.state = PluginState::Loaded;
        let uuid = record.uuid();
        let handle = self.graph.add(record);
        self.services.events.emit(
            le_core::EventKind::PluginAdded,
            &uuid.to_string(),
            path.to_string_lossy().as_ref(),
        );
        Ok(handle)
    }

    pub fn find_by_name(&self, name: &str) -> Vec<Handle<PluginRecord>> {
        self.graph.find_by_name(name)
    }

    pub fn find_by_uuid(&self, uuid: Uuid) -> Option<Handle<PluginRecord>> {
        self.graph.find_by_uuid(uuid)
    }

    /// §4.9 `load`: `Unloaded -> Loaded`. The record must already exist in
    /// the graph (typically via `scan`); this only flips lifecycle state.
    pub fn load(&mut self, handle: Handle<PluginRecord>) -> PluginResult<()> {
        self.transition(handle, PluginState::Loaded)
    }

    /// §4.9 `initialize`: `Loaded -> Initialized`, calling the ABI's
    /// `initialize` entry point with the given host context.
    pub fn initialize(&mut self, handle: Handle<PluginRecord>, context: HostContext) -> PluginResult<()> {
        let record = self
            .graph
            .get_mut(handle)
            .ok_or_else(|| PluginError::Core(CoreError::NotFound("plugin handle".into())))?;
        if !record.state.can_transition_to(&PluginState::Initialized) {
            return Err(invalid_transition(&record.state, &PluginState::Initialized));
        }
        if let Some(library) = &record.library {
            let code = unsafe { (library.abi.initialize)(std::ptr::null_mut(), std::ptr::null()) };
            if code != 0 {
                record.state = PluginState::Error(format!("initialize returned {code}"));
                return Err(PluginError::Core(CoreError::PluginInitFailed(record.name().to_string())));
            }
        }
        record.context = Some(context);
        record.state = PluginState::Initialized;
        Ok(())
    }

    /// §4.9 `activate`: `Initialized -> Active`.
    pub fn activate(&mut self, handle: Handle<PluginRecord>) -> PluginResult<()> {
        self.transition(handle, PluginState::Active)
    }

    /// §4.9 `process`: legal only in `Active`.
    pub fn process(&mut self, handle: Handle<PluginRecord>, input: &[f32], output: &mut [f32]) -> PluginResult<()> {
        let record = self
            .graph
            .get(handle)
            .ok_or_else(|| PluginError::Core(CoreError::NotFound("plugin handle".into())))?;
        if record.state != PluginState::Active {
            return Err(PluginError::Core(CoreError::InvalidState(format!(
                "process() requires Active, found {:?}",
                record.state
            ))));
        }
        let library = record
            .library
            .as_ref()
            .ok_or_else(|| PluginError::Core(CoreError::InvalidState("no library loaded".into())))?;
        let code = unsafe {
            (library.abi.process)(
                std::ptr::null_mut(),
                input.as_ptr(),
                output.as_mut_ptr(),
                input.len().min(output.len()),
            )
        };
        if code != 0 {
            return Err(PluginError::Core(CoreError::PluginProcessFailed(record.name().to_string())));
        }
        Ok(())
    }

    /// §4.9 `deactivate`: `Active -> Initialized`.
    pub fn deactivate(&mut self, handle: Handle<PluginRecord>) -> PluginResult<()> {
        self.transition(handle, PluginState::Initialized)
    }

    /// §4.9 `finalize` + `unload`: `Initialized -> Unloaded`, dropping the
    /// loaded library.
    pub fn unload(&mut self, handle: Handle<PluginRecord>) -> PluginResult<()> {
        let record = self
            .graph
            .get_mut(handle)
            .ok_or_else(|| PluginError::Core(CoreError::NotFound("plugin handle".into())))?;
        if !record.state.can_transition_to(&PluginState::Unloaded) {
            return Err(invalid_transition(&record.state, &PluginState::Unloaded));
        }
        if let Some(library) = &record.library {
            let code = unsafe { (library.abi.finalize)(std::ptr::null_mut()) };
            if code != 0 {
                record.state = PluginState::Error(format!("finalize returned {code}"));
                return Err(PluginError::Core(CoreError::PluginUnloadFailed(record.name().to_string())));
            }
        }
        record.library = None;
        record.state = PluginState::Unloaded;
        self.services.events.emit(le_core::EventKind::PluginRemoved, record.name(), "");
        Ok(())
    }

    /// Parameter get/set are legal only while `Initialized` or `Active`
    /// (§4.9).
    pub fn set_parameter(&mut self, handle: Handle<PluginRecord>, id: u32, value: f64) -> PluginResult<()> {
        let record = self
            .graph
            .get_mut(handle)
            .ok_or_else(|| PluginError::Core(CoreError::NotFound("plugin handle".into())))?;
        if !matches!(record.state, PluginState::Initialized | PluginState::Active) {
            return Err(PluginError::Core(CoreError::InvalidState(format!(
                "set_parameter requires Initialized or Active, found {:?}",
                record.state
            ))));
        }
        record.parameter_values.insert(id, value);
        if let Some(library) = &record.library {
            if let Some(set) = library.abi.set_parameter {
                unsafe { set(std::ptr::null_mut(), id, value) };
            }
        }
        Ok(())
    }

    pub fn get_parameter(&self, handle: Handle<PluginRecord>, id: u32) -> PluginResult<f64> {
        let record = self
            .graph
            .get(handle)
            .ok_or_else(|| PluginError::Core(CoreError::NotFound("plugin handle".into())))?;
        if !matches!(record.state, PluginState::Initialized | PluginState::Active) {
            return Err(PluginError::Core(CoreError::InvalidState(format!(
                "get_parameter requires Initialized or Active, found {:?}",
                record.state
            ))));
        }
        record
            .parameter_values
            .get(&id)
            .copied()
            .ok_or_else(|| PluginError::Core(CoreError::NotFound(format!("parameter {id}"))))
    }

    fn transition(&mut self, handle: Handle<PluginRecord>, to: PluginState) -> PluginResult<()> {
        if matches!(to, PluginState::Loaded | PluginState::Active) {
            self.ensure_name_unique(handle, &to)?;
        }
        let record = self
            .graph
            .get_mut(handle)
            .ok_or_else(|| PluginError::Core(CoreError::NotFound("plugin handle".into())))?;
        if !record.state.can_transition_to(&to) {
            return Err(invalid_transition(&record.state, &to));
        }
        record.state = to;
        Ok(())
    }

    /// §3's Plugin Record invariant: "name is unique within the registry"
    /// among loaded instances. The graph itself stays a multi-version
    /// catalog (§8 scenario 5 keeps several versions of the same name
    /// registered at once); this only rejects a second handle of the same
    /// name from reaching `Loaded`/`Active` while one is already there.
    fn ensure_name_unique(&self, handle: Handle<PluginRecord>, to: &PluginState) -> PluginResult<()> {
        let name = self
            .graph
            .get(handle)
            .ok_or_else(|| PluginError::Core(CoreError::NotFound("plugin handle".into())))?
            .name()
            .to_string();

        for other in self.graph.find_by_name(&name) {
            if other == handle {
                continue;
            }
            if let Some(record) = self.graph.get(other) {
                if matches!(record.state, PluginState::Loaded | PluginState::Active) {
                    return Err(PluginError::Core(CoreError::InvalidState(format!(
                        "{name:?} is already {:?} under another handle, cannot become {to:?}",
                        record.state
                    ))));
                }
            }
        }
        Ok(())
    }

    pub fn resolve(&self, handle: Handle<PluginRecord>) -> Option<Vec<ResolvedResult>> {
        let results = self.graph.resolve(handle, &self.config)?;
        let subject = self.graph.get(handle).map(|r| r.name().to_string()).unwrap_or_default();
        self.services
            .events
            .emit(le_core::EventKind::DependenciesResolved, &subject, &results.len().to_string());
        Some(results)
    }

    pub fn resolve_all(&self) -> Vec<ResolvedResult> {
        let results = self.graph.resolve_all(&self.config);
        self.services
            .events
            .emit(le_core::EventKind::DependenciesResolved, "*", &results.len().to_string());
        results
    }

    /// Resolve a single subject via the on-disk cache when it is readable,
    /// otherwise fall back to live computation and refresh the cache entry
    /// (§7: "cache corruption is never fatal to resolution"). The cache key
    /// is the subject's plugin name (§4.10).
    pub fn resolve_cached(&self, handle: Handle<PluginRecord>, cache: &ResolutionCache) -> PluginResult<Vec<ResolvedResult>> {
        let subject = self
            .graph
            .get(handle)
            .ok_or_else(|| PluginError::Core(CoreError::NotFound("plugin handle".into())))?
            .name()
            .to_string();

        match cache.load(&subject) {
            Ok(results) => Ok(results),
            Err(e) => {
                log::warn!("resolution cache unreadable for {subject:?}: {e}; recomputing");
                let results = self.resolve(handle).unwrap_or_default();
                if let Err(e) = cache.store(&subject, &results) {
                    log::warn!("failed to refresh resolution cache for {subject:?}: {e}");
                }
                Ok(results)
            }
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }
}

fn invalid_transition(from: &PluginState, to: &PluginState) -> PluginError {
    PluginError::Core(CoreError::InvalidState(format!(
        "cannot transition from {from:?} to {to:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PluginKind;

    fn registry() -> PluginRegistry {
        PluginRegistry::new(DependencyConfig::default(), Services::default())
    }

    #[test]
    fn unloaded_record_cannot_activate_directly() {
        let mut reg = registry();
        let record = PluginRecord::new(PluginMetadata::new(
            "X",
            le_core::Version::new(1, 0, 0, 0),
            PluginKind::Effect,
            Uuid::new_v4(),
        ));
        let handle = reg.graph_mut().add(record);
        assert!(reg.activate(handle).is_err());
    }

    #[test]
    fn get_parameter_before_initialize_is_rejected() {
        let mut reg = registry();
        let record = PluginRecord::new(PluginMetadata::new(
            "X",
            le_core::Version::new(1, 0, 0, 0),
            PluginKind::Effect,
            Uuid::new_v4(),
        ));
        let handle = reg.graph_mut().add(record);
        assert!(reg.get_parameter(handle, 0).is_err());
    }

    #[test]
    fn loading_a_second_handle_with_the_same_name_is_rejected() {
        let mut reg = registry();
        let first = reg.graph_mut().add(PluginRecord::new(PluginMetadata::new(
            "X",
            le_core::Version::new(1, 0, 0, 0),
            PluginKind::Effect,
            Uuid::new_v4(),
        )));
        let second = reg.graph_mut().add(PluginRecord::new(PluginMetadata::new(
            "X",
            le_core::Version::new(2, 0, 0, 0),
            PluginKind::Effect,
            Uuid::new_v4(),
        )));

        reg.load(first).unwrap();
        let err = reg.load(second).unwrap_err();
        assert!(matches!(err, PluginError::Core(CoreError::InvalidState(_))));
    }

    #[test]
    fn loading_is_allowed_again_once_the_first_handle_is_unloaded() {
        let mut reg = registry();
        let first = reg.graph_mut().add(PluginRecord::new(PluginMetadata::new(
            "X",
            le_core::Version::new(1, 0, 0, 0),
            PluginKind::Effect,
            Uuid::new_v4(),
        )));
        let second = reg.graph_mut().add(PluginRecord::new(PluginMetadata::new(
            "X",
            le_core::Version::new(2, 0, 0, 0),
            PluginKind::Effect,
            Uuid::new_v4(),
        )));

        reg.load(first).unwrap();
        reg.initialize(first, HostContext::default()).unwrap();
        reg.unload(first).unwrap();
        reg.load(second).unwrap();
    }

    #[test]
    fn resolve_cached_populates_and_reuses_the_cache() {
        let dir = std::env::temp_dir().join(format!("le-plugin-registry-cache-test-{}", Uuid::new_v4()));
        let cache = ResolutionCache::open(&dir).unwrap();

        let mut reg = registry();
        let record = PluginRecord::new(PluginMetadata::new(
            "X",
            le_core::Version::new(1, 0, 0, 0),
            PluginKind::Effect,
            Uuid::new_v4(),
        ));
        let handle = reg.graph_mut().add(record);

        let first = reg.resolve_cached(handle, &cache).unwrap();
        assert!(cache.load("X").is_ok());

        let second = reg.resolve_cached(handle, &cache).unwrap();
        assert_eq!(first.len(), second.len());

        std::fs::remove_dir_all(&dir).ok();
    }
}
