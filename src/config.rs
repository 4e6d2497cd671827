//! Host configuration
//!
//! Reads `tilecraft.toml` from the working directory (or an explicit path).
//! A missing file or missing keys fall back to defaults; a file that exists
//! but doesn't parse is an error.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::DataError;
use crate::item::DEFAULT_INVENTORY_SIZE;

pub const CONFIG_FILE: &str = "tilecraft.toml";

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_tick_rate() -> u64 {
    50
}

fn default_inventory_slots() -> usize {
    DEFAULT_INVENTORY_SIZE
}

fn default_walk_path() -> Vec<u8> {
    vec![6, 6, 1, 7, 7, 8, 8, 0, 2, 3]
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Content root holding `items/`, `recipes/` and `tiles.toml`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Host tick interval in milliseconds
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_inventory_slots")]
    pub inventory_slots: usize,
    /// Item id -> count placed in the inventory at startup
    #[serde(default)]
    pub starting_inventory: BTreeMap<String, u32>,
    /// Raw tile ids the demo agent walks across
    #[serde(default = "default_walk_path")]
    pub walk_path: Vec<u8>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tick_rate_ms: default_tick_rate(),
            inventory_slots: default_inventory_slots(),
            starting_inventory: BTreeMap::new(),
            walk_path: default_walk_path(),
        }
    }
}

impl HostConfig {
    /// Load from `path`, or defaults if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: HostConfig = toml::from_str(&text).map_err(|source| DataError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        // Relative data dirs are resolved against the config file's directory
        if config.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data_dir = parent.join(&config.data_dir);
            }
        }

        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}
