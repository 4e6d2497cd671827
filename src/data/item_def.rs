use serde::{Deserialize, Serialize};

use crate::item::DEFAULT_MAX_STACK;

// ============================================================================
// Item Categories
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    #[default]
    Material,
    Tool,
    Food,
    Placeable,
}

// ============================================================================
// Raw Item Definition (direct from TOML)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RawItemDefinition {
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub category: ItemCategory,
    pub max_stack: Option<u32>,
}

// ============================================================================
// Resolved Item Definition
// ============================================================================

#[derive(Debug, Clone)]
pub struct ItemDefinition {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub category: ItemCategory,
    pub max_stack: u32,
}

impl ItemDefinition {
    pub fn from_raw(id: &str, raw: &RawItemDefinition) -> Self {
        Self {
            id: id.to_string(),
            display_name: raw.display_name.clone()
                .unwrap_or_else(|| id.to_string()),
            description: raw.description.clone()
                .unwrap_or_default(),
            category: raw.category,
            // A zero stack limit would make the item impossible to hold
            max_stack: raw.max_stack.unwrap_or(DEFAULT_MAX_STACK).max(1),
        }
    }
}
