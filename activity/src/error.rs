//! Error types for the bootstrap shim.

use thiserror::Error;

/// A library in the load plan could not be loaded.
///
/// Kept `Clone` so the cached outcome of the one-time load sequence can be
/// handed back on every call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load native library `{library}` ({position} of {total}): {reason}")]
pub struct LoadError {
    /// Name as passed to the loader, without `lib` prefix or `.so` suffix.
    pub library: &'static str,
    /// One-based position of the library within the enabled plan.
    pub position: usize,
    /// Number of enabled libraries in the plan.
    pub total: usize,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Native code asked for the asset manager before any activity provided one.
    #[error("no asset manager has been provided")]
    NoAssetManager,

    /// The platform handed back a null asset manager.
    #[error("asset manager handle is null")]
    NullAssetManager,

    #[error("native entry point `{symbol}` unavailable in `{library}`: {reason}")]
    EntryPoint {
        symbol: &'static str,
        library: String,
        reason: String,
    },

    #[error("failed to load asset `{0}`")]
    AssetLoad(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
