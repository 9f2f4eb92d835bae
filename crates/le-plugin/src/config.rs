//! Dependency resolution configuration (§6.5)

use serde::{Deserialize, Serialize};

use le_core::{CoreError, CoreResult};

/// Resolution policy for picking a best-match candidate among versions
/// satisfying an edge's range (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionPolicy {
    /// Requires `min == max`: only a version exactly equal to the pinned
    /// version satisfies the edge.
    Strict,
    /// Any version satisfying the range is acceptable; the first match found
    /// in registration order is chosen.
    Compatible,
    /// The highest version satisfying the range is chosen, honoring
    /// `allow_prerelease`.
    Latest,
    /// Like `Latest`, but pre-release candidates are excluded regardless of
    /// `allow_prerelease`.
    LatestStable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    pub version_policy: VersionPolicy,
    pub allow_prerelease: bool,
    pub auto_update: bool,
    pub require_signature: bool,
    pub max_dependency_depth: u32,
    pub trusted_sources: Vec<String>,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            version_policy: VersionPolicy::Compatible,
            allow_prerelease: false,
            auto_update: false,
            require_signature: false,
            max_dependency_depth: 32,
            trusted_sources: Vec::new(),
        }
    }
}

impl DependencyConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_dependency_depth == 0 {
            return Err(CoreError::InvalidArgument(
                "max_dependency_depth must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        DependencyConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_depth() {
        let mut cfg = DependencyConfig::default();
        cfg.max_dependency_depth = 0;
        assert!(cfg.validate().is_err());
    }
}
