use std::path::PathBuf;

use thiserror::Error;

/// Reasons a crafting station refuses a request. Both leave the station and
/// the inventory untouched; the caller may retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CraftError {
    #[error("station is busy crafting")]
    StationBusy,

    #[error("insufficient materials")]
    InsufficientMaterials,
}

/// Errors raised while loading content and host configuration.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid recipe '{id}': {reason}")]
    InvalidRecipe { id: String, reason: String },

    #[error("invalid tile policy '{tile}': {reason}")]
    InvalidTile { tile: String, reason: String },
}
