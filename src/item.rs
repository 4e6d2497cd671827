use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::data::ItemRegistry;

// ============================================================================
// Item Stacks
// ============================================================================

/// String item id, as used in content files
pub type ItemId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemStack {
    pub item_id: ItemId,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item_id: &str, count: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            count,
        }
    }
}

/// Sum counts per item id so repeated entries are checked together
fn totals(requirements: &[ItemStack]) -> BTreeMap<&str, u32> {
    let mut totals = BTreeMap::new();
    for stack in requirements {
        let total = totals.entry(stack.item_id.as_str()).or_insert(0u32);
        *total = total.saturating_add(stack.count);
    }
    totals
}

// ============================================================================
// Item Store
// ============================================================================

/// Inventory operations a crafting station or pickup needs from its host.
///
/// Each call is expected to be atomic on its own. Callers that need
/// `has_items` + `remove_items` to be one step hold the store's lock across
/// both.
pub trait ItemStore: Send + 'static {
    fn has_items(&self, requirements: &[ItemStack]) -> bool;

    /// Only called after `has_items` returned true for the same requirements.
    fn remove_items(&mut self, requirements: &[ItemStack]);

    /// Always succeeds from the caller's view; overflow is the store's concern.
    fn add_item(&mut self, item_id: &str, amount: u32);
}

/// Shared handle to a host inventory.
pub type InventoryHandle<S> = Arc<Mutex<S>>;

pub fn inventory_handle<S: ItemStore>(store: S) -> InventoryHandle<S> {
    Arc::new(Mutex::new(store))
}

// ============================================================================
// Inventory
// ============================================================================

pub const DEFAULT_INVENTORY_SIZE: usize = 20;
pub const DEFAULT_MAX_STACK: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySlot {
    pub item_id: ItemId,
    pub quantity: u32,
}

impl InventorySlot {
    pub fn new(item_id: &str, quantity: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            quantity,
        }
    }
}

/// Slot based player inventory
#[derive(Debug, Clone)]
pub struct Inventory {
    pub slots: Vec<Option<InventorySlot>>,
    items: Option<Arc<ItemRegistry>>,
}

impl Inventory {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
            items: None,
        }
    }

    /// Inventory that takes stack limits from item definitions
    pub fn with_registry(size: usize, items: Arc<ItemRegistry>) -> Self {
        Self {
            slots: vec![None; size],
            items: Some(items),
        }
    }

    fn max_stack(&self, item_id: &str) -> u32 {
        self.items
            .as_ref()
            .and_then(|registry| registry.get(item_id))
            .map(|def| def.max_stack)
            .unwrap_or(DEFAULT_MAX_STACK)
    }

    /// Try to add an item to inventory. Returns the quantity that couldn't fit.
    pub fn insert(&mut self, item_id: &str, mut quantity: u32) -> u32 {
        let max_stack = self.max_stack(item_id);

        // First, try to stack with existing items
        for slot in self.slots.iter_mut().flatten() {
            if quantity == 0 {
                break;
            }
            if slot.item_id == item_id && slot.quantity < max_stack {
                let add = quantity.min(max_stack - slot.quantity);
                slot.quantity += add;
                quantity -= add;
            }
        }

        // Then, fill empty slots with the remainder
        for slot in &mut self.slots {
            if quantity == 0 {
                break;
            }
            if slot.is_none() {
                let add = quantity.min(max_stack);
                *slot = Some(InventorySlot::new(item_id, add));
                quantity -= add;
            }
        }

        quantity
    }

    /// Total quantity of an item across all slots
    pub fn count(&self, item_id: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.item_id == item_id)
            .fold(0u32, |total, s| total.saturating_add(s.quantity))
    }

    /// Remove up to `quantity`, emptying later slots first. Returns the amount removed.
    pub fn take(&mut self, item_id: &str, quantity: u32) -> u32 {
        let mut remaining = quantity;
        for slot in self.slots.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            if let Some(inv_slot) = slot {
                if inv_slot.item_id == item_id {
                    let take = remaining.min(inv_slot.quantity);
                    inv_slot.quantity -= take;
                    remaining -= take;
                    if inv_slot.quantity == 0 {
                        *slot = None;
                    }
                }
            }
        }
        quantity - remaining
    }

    /// Item totals keyed by id; items with no quantity are absent
    pub fn snapshot(&self) -> BTreeMap<ItemId, u32> {
        let mut snapshot = BTreeMap::new();
        for slot in self.slots.iter().flatten() {
            let total = snapshot.entry(slot.item_id.clone()).or_insert(0u32);
            *total = total.saturating_add(slot.quantity);
        }
        snapshot
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(DEFAULT_INVENTORY_SIZE)
    }
}

impl ItemStore for Inventory {
    fn has_items(&self, requirements: &[ItemStack]) -> bool {
        totals(requirements)
            .into_iter()
            .all(|(item_id, count)| self.count(item_id) >= count)
    }

    fn remove_items(&mut self, requirements: &[ItemStack]) {
        for stack in requirements {
            let removed = self.take(&stack.item_id, stack.count);
            if removed < stack.count {
                warn!(
                    "Removed only {}/{} of '{}' from inventory",
                    removed, stack.count, stack.item_id
                );
            }
        }
    }

    fn add_item(&mut self, item_id: &str, amount: u32) {
        let overflow = self.insert(item_id, amount);
        if overflow > 0 {
            warn!("Inventory full, discarded {}x {}", overflow, item_id);
        }
    }
}
