//! Plugin dependency graph, registry/lifecycle, and resolution cache (§4, §6,
//! §7, §8 scenarios 4-6).
//!
//! Grounded on `rf-plugin`'s scanner/chain/host split, generalized per
//! `SPEC_FULL.md`: `scanner.rs`'s directory-walking `PluginScanner` becomes
//! `registry::PluginRegistry::scan`, `chain.rs`'s `ZeroCopyChain` becomes
//! `chain::ProcessChain` over `PluginRecord`s instead of `Box<dyn
//! PluginInstance>`, and the ad hoc `PluginType`/`PluginCategory` split
//! becomes the single `metadata::PluginKind` enum.

pub mod abi;
pub mod arena;
pub mod cache;
pub mod chain;
pub mod config;
pub mod graph;
pub mod metadata;
pub mod record;
pub mod registry;

use thiserror::Error;

use le_core::CoreError;

pub use abi::{PluginAbi, PluginLibrary};
pub use arena::{Arena, Handle};
pub use cache::ResolutionCache;
pub use chain::ProcessChain;
pub use config::{DependencyConfig, VersionPolicy};
pub use graph::{DependencyGraph, LoadOrder, ResolvedResult, ResolvedStatus};
pub use metadata::{PluginFlags, PluginKind, PluginMetadata};
pub use record::{DependencyEdge, HostContext, ParamSpec, PluginRecord, PluginState};
pub use registry::PluginRegistry;

/// Error taxonomy for this crate. Wraps the shared `CoreError` taxonomy
/// (§7) and adds the ABI-loading failures that only arise here.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("missing required ABI symbol: {0}")]
    MissingSymbol(String),

    #[error("failed to load dynamic library: {0}")]
    Libloading(String),
}

pub type PluginResult<T> = Result<T, PluginError>;
