//! Tile Movement Policy
//!
//! Per-tile-type movement rules queried by the movement simulation every
//! step: speed multiplier, passability, footing and ladder classification.
//! Lookups are a direct array index and never fail; ids that don't name a
//! known tile resolve to [`MovementPolicy::UNKNOWN`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::DataError;

/// Raw tile identifier as stored in maps.
pub type TileId = u8;

// ============================================================================
// Tile Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TileType {
    Air = 0,
    Dirt = 1,
    Stone = 2,
    CopperOre = 3,
    IronOre = 4,
    GoldOre = 5,
    Grass = 6,
    ProcessedDirt = 7,
    Ladder = 8,
}

impl TileType {
    pub const COUNT: usize = 9;

    pub const ALL: [TileType; Self::COUNT] = [
        TileType::Air,
        TileType::Dirt,
        TileType::Stone,
        TileType::CopperOre,
        TileType::IronOre,
        TileType::GoldOre,
        TileType::Grass,
        TileType::ProcessedDirt,
        TileType::Ladder,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            TileType::Air => "air",
            TileType::Dirt => "dirt",
            TileType::Stone => "stone",
            TileType::CopperOre => "copper_ore",
            TileType::IronOre => "iron_ore",
            TileType::GoldOre => "gold_ore",
            TileType::Grass => "grass",
            TileType::ProcessedDirt => "processed_dirt",
            TileType::Ladder => "ladder",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }
}

impl From<TileType> for TileId {
    fn from(tile: TileType) -> Self {
        tile as u8
    }
}

// ============================================================================
// Movement Policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovementPolicy {
    pub speed_multiplier: f32,
    /// Agent bodies may occupy / move through the tile
    pub passable: bool,
    /// Tile can support a standing agent
    pub walkable: bool,
    pub ladder: bool,
}

impl MovementPolicy {
    /// Policy for ids outside the tile type domain.
    pub const UNKNOWN: MovementPolicy = MovementPolicy {
        speed_multiplier: 1.0,
        passable: false,
        walkable: true,
        ladder: false,
    };

    const fn solid(speed_multiplier: f32) -> Self {
        Self {
            speed_multiplier,
            passable: false,
            walkable: true,
            ladder: false,
        }
    }
}

impl Default for MovementPolicy {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

// ============================================================================
// Raw TOML Structures
// ============================================================================

/// Per-tile override from `tiles.toml`; omitted fields keep the reference value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTilePolicy {
    pub speed_multiplier: Option<f32>,
    pub passable: Option<bool>,
    pub walkable: Option<bool>,
    pub ladder: Option<bool>,
}

// ============================================================================
// Policy Table
// ============================================================================

/// Immutable lookup table indexed by tile ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePolicyTable {
    entries: [MovementPolicy; TileType::COUNT],
}

impl TilePolicyTable {
    /// The shipped configuration: only air and ladders can be moved through,
    /// everything but air gives footing.
    pub fn reference() -> Self {
        Self {
            entries: [
                // Air
                MovementPolicy {
                    speed_multiplier: 1.0,
                    passable: true,
                    walkable: false,
                    ladder: false,
                },
                MovementPolicy::solid(0.9),  // Dirt
                MovementPolicy::solid(1.0),  // Stone
                MovementPolicy::solid(1.0),  // CopperOre
                MovementPolicy::solid(1.0),  // IronOre
                MovementPolicy::solid(1.0),  // GoldOre
                MovementPolicy::solid(1.0),  // Grass
                MovementPolicy::solid(1.25), // ProcessedDirt
                // Ladder
                MovementPolicy {
                    speed_multiplier: 0.5,
                    passable: true,
                    walkable: true,
                    ladder: true,
                },
            ],
        }
    }

    /// Build a table from the reference configuration with overrides applied.
    pub fn from_overrides(overrides: &HashMap<String, RawTilePolicy>) -> Result<Self, DataError> {
        let mut table = Self::reference();

        for (name, raw) in overrides {
            let tile = TileType::from_name(name).ok_or_else(|| DataError::InvalidTile {
                tile: name.clone(),
                reason: "unknown tile type".to_string(),
            })?;

            let entry = &mut table.entries[tile as usize];
            if let Some(speed) = raw.speed_multiplier {
                entry.speed_multiplier = speed;
            }
            if let Some(passable) = raw.passable {
                entry.passable = passable;
            }
            if let Some(walkable) = raw.walkable {
                entry.walkable = walkable;
            }
            if let Some(ladder) = raw.ladder {
                entry.ladder = ladder;
            }

            Self::validate(tile, entry)?;
        }

        Ok(table)
    }

    fn validate(tile: TileType, policy: &MovementPolicy) -> Result<(), DataError> {
        if !policy.speed_multiplier.is_finite() || policy.speed_multiplier < 0.0 {
            return Err(DataError::InvalidTile {
                tile: tile.name().to_string(),
                reason: format!("speed multiplier {} must be finite and >= 0", policy.speed_multiplier),
            });
        }
        if policy.ladder && !policy.passable {
            return Err(DataError::InvalidTile {
                tile: tile.name().to_string(),
                reason: "ladder tiles must be passable".to_string(),
            });
        }
        Ok(())
    }

    /// Load `tiles.toml` from the data directory. A missing file yields the
    /// reference table.
    pub fn load_from_directory(data_dir: &Path) -> Result<Self, DataError> {
        let path = data_dir.join("tiles.toml");

        if !path.exists() {
            warn!("Tile policy file does not exist: {:?}, using reference table", path);
            return Ok(Self::reference());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| DataError::Io {
            path: path.clone(),
            source,
        })?;
        let overrides: HashMap<String, RawTilePolicy> =
            toml::from_str(&content).map_err(|source| DataError::Parse {
                path: path.clone(),
                source,
            })?;

        let table = Self::from_overrides(&overrides)?;
        info!("Loaded tile policy table ({} overrides)", overrides.len());
        Ok(table)
    }

    pub fn policy(&self, tile: impl Into<TileId>) -> MovementPolicy {
        self.entries
            .get(tile.into() as usize)
            .copied()
            .unwrap_or(MovementPolicy::UNKNOWN)
    }

    pub fn speed_multiplier(&self, tile: impl Into<TileId>) -> f32 {
        self.policy(tile).speed_multiplier
    }

    pub fn is_passable(&self, tile: impl Into<TileId>) -> bool {
        self.policy(tile).passable
    }

    pub fn is_walkable(&self, tile: impl Into<TileId>) -> bool {
        self.policy(tile).walkable
    }

    pub fn is_ladder(&self, tile: impl Into<TileId>) -> bool {
        self.policy(tile).ladder
    }
}

impl Default for TilePolicyTable {
    fn default() -> Self {
        Self::reference()
    }
}
