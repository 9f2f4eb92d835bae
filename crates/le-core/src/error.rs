//! Shared error taxonomy for LibEtude subsystems

use thiserror::Error;

/// Error taxonomy shared by the streaming pipeline and the plugin resolver.
///
/// One flat enum rather than one per subsystem: the spec presents the
/// taxonomy as a single abstract list consumed by every component, and a
/// host embedding several subsystems wants to match on one error type.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("buffer full")]
    BufferFull,

    #[error("buffer empty")]
    BufferEmpty,

    #[error("buffer too small: need {needed} samples, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("out of memory")]
    OutOfMemory,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupted cache entry: {0}")]
    CorruptedCache(String),

    #[error("version incompatible: {0}")]
    VersionIncompatible(String),

    #[error("dependency missing: {0}")]
    DependencyMissing(String),

    #[error("circular dependency: {0}")]
    DependencyCircular(String),

    #[error("plugin initialization failed: {0}")]
    PluginInitFailed(String),

    #[error("plugin processing failed: {0}")]
    PluginProcessFailed(String),

    #[error("plugin unload failed: {0}")]
    PluginUnloadFailed(String),

    #[error("thread creation failed: {0}")]
    ThreadCreationFailed(String),

    #[error("file I/O error: {0}")]
    FileIo(#[from] std::io::Error),

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Result type alias used across LibEtude crates.
pub type CoreResult<T> = Result<T, CoreError>;
