//! World pickups driven by host pointer events.
//!
//! The host forwards hover and click events; a click moves the pickup's
//! stack into the inventory it is given and marks the pickup collected so the
//! host can despawn it.

use tracing::debug;

use crate::item::{ItemStack, ItemStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter,
    Exit,
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickupOutcome {
    Highlighted(bool),
    Collected(ItemStack),
    /// Event arrived after the pickup was collected
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub stack: ItemStack,
    highlighted: bool,
    collected: bool,
}

impl Pickup {
    pub fn new(item_id: &str, amount: u32) -> Self {
        Self {
            stack: ItemStack::new(item_id, amount),
            highlighted: false,
            collected: false,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    pub fn handle<S: ItemStore + ?Sized>(&mut self, event: PointerEvent, store: &mut S) -> PickupOutcome {
        if self.collected {
            return PickupOutcome::Ignored;
        }

        match event {
            PointerEvent::Enter => {
                self.highlighted = true;
                PickupOutcome::Highlighted(true)
            }
            PointerEvent::Exit => {
                self.highlighted = false;
                PickupOutcome::Highlighted(false)
            }
            PointerEvent::Click => {
                store.add_item(&self.stack.item_id, self.stack.count);
                self.collected = true;
                self.highlighted = false;
                debug!("Picked up {}x {}", self.stack.count, self.stack.item_id);
                PickupOutcome::Collected(self.stack.clone())
            }
        }
    }
}
