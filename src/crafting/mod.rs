//! Crafting System
//!
//! Recipe definitions, a registry loaded from TOML, and the timed
//! single-slot crafting station.

pub mod definition;
pub mod registry;
pub mod station;

pub use definition::{Recipe, RecipeCategory};
pub use registry::RecipeRegistry;
pub use station::{CraftOutcome, CraftTicket, CraftingStation, StationState};
