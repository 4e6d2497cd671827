//! Tile movement policy and timed crafting for a 2D survival game.
//!
//! The host owns the event loop and the inventory; this crate answers
//! per-tile movement queries and runs crafting transactions against an
//! injected [`item::ItemStore`].

pub mod config;
pub mod crafting;
pub mod data;
pub mod error;
pub mod item;
pub mod pickup;
pub mod services;
pub mod tile;

pub use crafting::{CraftOutcome, CraftTicket, CraftingStation, Recipe, RecipeRegistry};
pub use error::{CraftError, DataError};
pub use item::{inventory_handle, Inventory, InventoryHandle, ItemStack, ItemStore};
pub use tile::{MovementPolicy, TilePolicyTable, TileType};
