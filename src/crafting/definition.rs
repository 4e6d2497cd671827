//! Crafting Recipe Definitions
//!
//! Defines the data structures for crafting recipes, including TOML
//! deserialization (Raw*) and validated versions with defaults applied.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DataError;
use crate::item::ItemStack;

/// Recipe categories for grouping stations' recipe lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeCategory {
    #[default]
    Materials,
    Tools,
    Building,
    Food,
}

impl RecipeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeCategory::Materials => "materials",
            RecipeCategory::Tools => "tools",
            RecipeCategory::Building => "building",
            RecipeCategory::Food => "food",
        }
    }
}

/// Longest crafting time a recipe may declare (one week of game time)
pub const MAX_CRAFT_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// ============================================================================
// Raw TOML Structures
// ============================================================================

fn default_count() -> u32 {
    1
}

/// Raw item stack entry from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawStack {
    pub item_id: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

/// Raw recipe definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecipeDefinition {
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub category: RecipeCategory,
    /// Crafting time in game seconds
    #[serde(default)]
    pub duration_secs: f32,
    pub output: RawStack,
    #[serde(default)]
    pub materials: Vec<RawStack>,
}

// ============================================================================
// Validated Recipe
// ============================================================================

/// Immutable recipe: consumes `materials`, produces `output` after `duration`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub category: RecipeCategory,
    pub output: ItemStack,
    /// One entry per item id, counts of repeated ids summed
    pub materials: Vec<ItemStack>,
    pub duration: Duration,
}

impl Recipe {
    /// Build a recipe, validating amounts and duration.
    pub fn new(
        id: &str,
        output: ItemStack,
        materials: Vec<ItemStack>,
        duration_secs: f32,
    ) -> Result<Self, DataError> {
        let invalid = |reason: String| DataError::InvalidRecipe {
            id: id.to_string(),
            reason,
        };

        if output.count == 0 {
            return Err(invalid(format!("output '{}' has zero amount", output.item_id)));
        }
        let duration = Duration::try_from_secs_f32(duration_secs)
            .map_err(|_| invalid(format!("duration {} must be finite and >= 0", duration_secs)))?;
        if duration > MAX_CRAFT_DURATION {
            return Err(invalid(format!(
                "duration {:?} exceeds the {:?} limit",
                duration, MAX_CRAFT_DURATION
            )));
        }

        let mut merged: Vec<ItemStack> = Vec::with_capacity(materials.len());
        for stack in materials {
            if stack.count == 0 {
                return Err(invalid(format!("material '{}' has zero count", stack.item_id)));
            }
            match merged.iter_mut().find(|m| m.item_id == stack.item_id) {
                Some(existing) => {
                    existing.count = existing.count.checked_add(stack.count).ok_or_else(|| {
                        invalid(format!("material '{}' count overflows", stack.item_id))
                    })?;
                }
                None => merged.push(stack),
            }
        }

        Ok(Self {
            id: id.to_string(),
            display_name: id.replace('_', " "),
            description: String::new(),
            category: RecipeCategory::default(),
            output,
            materials: merged,
            duration,
        })
    }

    /// Create a validated Recipe from raw TOML data
    pub fn from_raw(id: &str, raw: &RawRecipeDefinition) -> Result<Self, DataError> {
        let materials = raw
            .materials
            .iter()
            .map(|m| ItemStack::new(&m.item_id, m.count))
            .collect();

        let mut recipe = Self::new(
            id,
            ItemStack::new(&raw.output.item_id, raw.output.count),
            materials,
            raw.duration_secs,
        )?;

        if let Some(name) = &raw.display_name {
            recipe.display_name = name.clone();
        }
        recipe.description = raw.description.clone().unwrap_or_default();
        recipe.category = raw.category;

        Ok(recipe)
    }
}
