//! Crafting Recipe Registry
//!
//! Loads and caches recipe definitions from TOML files.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::definition::{RawRecipeDefinition, Recipe, RecipeCategory};
use crate::error::DataError;

/// Registry for all recipe definitions
pub struct RecipeRegistry {
    recipes: HashMap<String, Arc<Recipe>>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self {
            recipes: HashMap::new(),
        }
    }

    /// Load all recipe definitions from `<data_dir>/recipes`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), DataError> {
        let recipes_dir = data_dir.join("recipes");

        if !recipes_dir.exists() {
            warn!("Recipes directory does not exist: {:?}", recipes_dir);
            return Ok(());
        }

        let entries = std::fs::read_dir(&recipes_dir).map_err(|source| DataError::Io {
            path: recipes_dir.clone(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| DataError::Io {
                path: recipes_dir.clone(),
                source,
            })?;
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "toml") {
                let content = std::fs::read_to_string(&path).map_err(|source| DataError::Io {
                    path: path.clone(),
                    source,
                })?;

                // Parse as table of recipes
                let table: HashMap<String, RawRecipeDefinition> = toml::from_str(&content)
                    .map_err(|source| DataError::Parse {
                        path: path.clone(),
                        source,
                    })?;

                for (id, raw) in table {
                    let recipe = Recipe::from_raw(&id, &raw)?;
                    info!(
                        "Loaded recipe: {} ({}) - {} materials -> {}x {} in {:?}",
                        recipe.display_name,
                        id,
                        recipe.materials.len(),
                        recipe.output.count,
                        recipe.output.item_id,
                        recipe.duration
                    );
                    self.insert(recipe);
                }
            }
        }

        info!("Loaded {} recipe definitions", self.recipes.len());

        Ok(())
    }

    /// Add a recipe, replacing any existing recipe with the same ID
    pub fn insert(&mut self, recipe: Recipe) {
        if self.recipes.contains_key(&recipe.id) {
            warn!("Duplicate recipe ID '{}', overwriting", recipe.id);
        }
        self.recipes.insert(recipe.id.clone(), Arc::new(recipe));
    }

    /// Get a shared recipe by ID
    pub fn get(&self, id: &str) -> Option<Arc<Recipe>> {
        self.recipes.get(id).cloned()
    }

    /// Get all recipe IDs
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.recipes.keys()
    }

    /// Get all recipes
    pub fn all(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.values()
    }

    /// Get recipes by category
    pub fn by_category(&self, category: RecipeCategory) -> Vec<Arc<Recipe>> {
        self.recipes
            .values()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.recipes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl Default for RecipeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
