//! Plugin metadata block (§6.3) and kind enum (design note 5, "Long `switch`
//! ladders over kinds")

use le_core::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plugin kind, modeled as a real enum rather than a string tag so a match
/// over it is exhaustive. Replaces the teacher's `PluginType`/`PluginCategory`
/// split (`scanner.rs`) with the single classification the ABI's metadata
/// block actually carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginKind {
    Effect,
    Instrument,
    Analyzer,
    Utility,
}

/// The metadata block a plugin's dynamic library exposes alongside its ABI
/// functions (§6.3): name, description, author, vendor, plugin version,
/// required API version, kind, flags, UUID, checksum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    pub description: String,
    pub author: String,
    pub vendor: String,
    pub version: Version,
    pub required_api_version: Version,
    pub kind: PluginKind,
    pub flags: PluginFlags,
    pub uuid: Uuid,
    pub checksum: String,
    /// Not part of the ABI block itself: whether `version` should be treated
    /// as a pre-release for `LatestStable`/`allow_prerelease` filtering
    /// (§4.8). The version algebra (C7) carries no string component, so
    /// pre-release status is tracked here instead of smuggled into the
    /// version string the way semver would.
    pub prerelease: bool,
}

/// Flags carried in the ABI metadata block. `has_editor` et al. from the
/// teacher's `PluginInfo` collapse into bits here since §6.3 specifies a
/// single "flags" field, not individual struct members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFlags {
    pub has_editor: bool,
    pub supports_suspend_resume: bool,
    pub is_shell: bool,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>, version: Version, kind: PluginKind, uuid: Uuid) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            author: String::new(),
            vendor: String::new(),
            version,
            required_api_version: Version::new(1, 0, 0, 0),
            kind,
            flags: PluginFlags::default(),
            uuid,
            checksum: String::new(),
            prerelease: false,
        }
    }
}
