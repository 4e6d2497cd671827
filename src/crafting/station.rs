//! Crafting Station
//!
//! Runs one craft at a time: materials are taken from the caller's inventory
//! when the request is accepted, and the output is deposited once the
//! recipe's duration has elapsed on the tokio clock.

use std::sync::{Arc, PoisonError, Weak};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::definition::{Recipe, MAX_CRAFT_DURATION};
use crate::error::CraftError;
use crate::item::{InventoryHandle, ItemStack, ItemStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationState {
    Idle,
    Crafting { recipe_id: String, ready_at: Instant },
}

impl StationState {
    pub fn is_crafting(&self) -> bool {
        matches!(self, StationState::Crafting { .. })
    }
}

/// How a committed craft ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CraftOutcome {
    Deposited(ItemStack),
    /// The inventory was dropped before completion; consumed materials are lost
    InventoryGone,
}

/// Returned for an accepted request. Awaiting it is optional; the deposit
/// happens whether or not anyone listens.
#[derive(Debug)]
pub struct CraftTicket {
    pub recipe_id: String,
    pub ready_at: Instant,
    completion: oneshot::Receiver<CraftOutcome>,
}

impl CraftTicket {
    /// Wait for the craft to finish. `None` if the station was dropped first.
    pub async fn completed(self) -> Option<CraftOutcome> {
        self.completion.await.ok()
    }
}

pub struct CraftingStation {
    pub id: String,
    pub name: String,
    recipes: Vec<Arc<Recipe>>,
    state: Arc<Mutex<StationState>>,
    /// In-flight completion task, aborted when the station is dropped
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CraftingStation {
    pub fn new(name: &str, recipes: Vec<Arc<Recipe>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            recipes,
            state: Arc::new(Mutex::new(StationState::Idle)),
            task: std::sync::Mutex::new(None),
        }
    }

    pub fn recipes(&self) -> &[Arc<Recipe>] {
        &self.recipes
    }

    /// Find one of this station's recipes by ID
    pub fn recipe(&self, recipe_id: &str) -> Option<&Arc<Recipe>> {
        self.recipes.iter().find(|r| r.id == recipe_id)
    }

    pub async fn state(&self) -> StationState {
        self.state.lock().await.clone()
    }

    pub async fn is_crafting(&self) -> bool {
        self.state.lock().await.is_crafting()
    }

    /// Start crafting `recipe` using materials from `inventory`.
    ///
    /// Returns as soon as the materials are taken. The station lock is held
    /// from the busy check through the state change, and the inventory lock
    /// across the availability check and removal, so two requests can never
    /// both commit.
    pub async fn request_craft<S: ItemStore>(
        &self,
        recipe: &Recipe,
        inventory: &InventoryHandle<S>,
    ) -> Result<CraftTicket, CraftError> {
        let mut state = self.state.lock().await;
        if state.is_crafting() {
            return Err(CraftError::StationBusy);
        }

        // Recipe fields are public, so clamp here as well as at load time
        let ready_at = Instant::now() + recipe.duration.min(MAX_CRAFT_DURATION);

        {
            let mut store = inventory.lock().await;
            if !store.has_items(&recipe.materials) {
                return Err(CraftError::InsufficientMaterials);
            }
            store.remove_items(&recipe.materials);
        }

        *state = StationState::Crafting {
            recipe_id: recipe.id.clone(),
            ready_at,
        };

        info!(
            "Station {} started '{}' ({:?})",
            self.name, recipe.id, recipe.duration
        );

        let (done_tx, done_rx) = oneshot::channel();
        let handle = tokio::spawn(complete_craft(
            self.name.clone(),
            recipe.id.clone(),
            recipe.output.clone(),
            ready_at,
            Arc::downgrade(inventory),
            self.state.clone(),
            done_tx,
        ));

        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(CraftTicket {
            recipe_id: recipe.id.clone(),
            ready_at,
            completion: done_rx,
        })
    }
}

/// Timed completion phase of an accepted craft
async fn complete_craft<S: ItemStore>(
    station: String,
    recipe_id: String,
    output: ItemStack,
    ready_at: Instant,
    inventory: Weak<Mutex<S>>,
    state: Arc<Mutex<StationState>>,
    done_tx: oneshot::Sender<CraftOutcome>,
) {
    tokio::time::sleep_until(ready_at).await;

    let outcome = match inventory.upgrade() {
        Some(inventory) => {
            inventory.lock().await.add_item(&output.item_id, output.count);
            info!(
                "Station {} finished '{}' -> {}x {}",
                station, recipe_id, output.count, output.item_id
            );
            CraftOutcome::Deposited(output)
        }
        None => {
            warn!(
                "Station {} finished '{}' but the inventory is gone, output dropped",
                station, recipe_id
            );
            CraftOutcome::InventoryGone
        }
    };

    *state.lock().await = StationState::Idle;

    if done_tx.send(outcome).is_err() {
        debug!("Nobody waiting on '{}' at station {}", recipe_id, station);
    }
}

impl Drop for CraftingStation {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{inventory_handle, Inventory};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn axe_recipe() -> Arc<Recipe> {
        Arc::new(
            Recipe::new(
                "stone_axe",
                ItemStack::new("axe", 1),
                vec![ItemStack::new("wood", 3), ItemStack::new("stone", 2)],
                5.0,
            )
            .unwrap(),
        )
    }

    fn stocked(items: &[(&str, u32)]) -> InventoryHandle<Inventory> {
        let mut inventory = Inventory::default();
        for (item_id, count) in items {
            inventory.insert(item_id, *count);
        }
        inventory_handle(inventory)
    }

    async fn snapshot(inventory: &InventoryHandle<Inventory>) -> BTreeMap<String, u32> {
        inventory.lock().await.snapshot()
    }

    /// Let spawned tasks run on the current-thread test runtime
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_axe_scenario() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![recipe.clone()]);
        let inventory = stocked(&[("wood", 5), ("stone", 2)]);
        let start = Instant::now();

        let ticket = station.request_craft(&recipe, &inventory).await.unwrap();
        assert_eq!(ticket.ready_at, start + Duration::from_secs(5));
        assert!(station.is_crafting().await);
        {
            let inv = inventory.lock().await;
            assert_eq!(inv.count("wood"), 2);
            assert_eq!(inv.count("stone"), 0);
        }

        // Mid-craft request is refused without touching the inventory
        tokio::time::advance(Duration::from_secs(2)).await;
        let before = snapshot(&inventory).await;
        assert_eq!(
            station.request_craft(&recipe, &inventory).await.unwrap_err(),
            CraftError::StationBusy
        );
        assert_eq!(snapshot(&inventory).await, before);

        let outcome = ticket.completed().await;
        assert_eq!(Instant::now() - start, Duration::from_secs(5));
        assert_eq!(outcome, Some(CraftOutcome::Deposited(ItemStack::new("axe", 1))));

        let inv = inventory.lock().await;
        assert_eq!(inv.count("wood"), 2);
        assert_eq!(inv.count("stone"), 0);
        assert_eq!(inv.count("axe"), 1);
        drop(inv);
        assert_eq!(station.state().await, StationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_not_deposited_early() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![]);
        let inventory = stocked(&[("wood", 3), ("stone", 2)]);

        let _ticket = station.request_craft(&recipe, &inventory).await.unwrap();

        tokio::time::advance(Duration::from_millis(4_999)).await;
        settle().await;
        assert_eq!(inventory.lock().await.count("axe"), 0);
        assert!(station.is_crafting().await);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(inventory.lock().await.count("axe"), 1);
        assert!(!station.is_crafting().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_even_with_materials_available() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![recipe.clone()]);
        let inventory = stocked(&[("wood", 9), ("stone", 6)]);

        let _ticket = station.request_craft(&recipe, &inventory).await.unwrap();
        let before = snapshot(&inventory).await;

        for _ in 0..3 {
            assert_eq!(
                station.request_craft(&recipe, &inventory).await.unwrap_err(),
                CraftError::StationBusy
            );
        }
        assert_eq!(snapshot(&inventory).await, before);
        assert_eq!(before["wood"], 6);
        assert_eq!(before["stone"], 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_materials_has_no_side_effects() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![recipe.clone()]);
        let inventory = stocked(&[("wood", 5), ("stone", 1)]);
        let before = snapshot(&inventory).await;

        let result = station.request_craft(&recipe, &inventory).await;

        assert_eq!(result.unwrap_err(), CraftError::InsufficientMaterials);
        assert_eq!(snapshot(&inventory).await, before);
        assert_eq!(station.state().await, StationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_station_reusable_after_completion() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![recipe.clone()]);
        let inventory = stocked(&[("wood", 6), ("stone", 4)]);

        let first = station.request_craft(&recipe, &inventory).await.unwrap();
        first.completed().await.unwrap();

        let second = station.request_craft(&recipe, &inventory).await.unwrap();
        second.completed().await.unwrap();

        assert_eq!(
            snapshot(&inventory).await,
            BTreeMap::from([("axe".to_string(), 2)])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_completes_immediately() {
        let recipe = Recipe::new(
            "planks",
            ItemStack::new("plank", 4),
            vec![ItemStack::new("wood", 1)],
            0.0,
        )
        .unwrap();
        let station = CraftingStation::new("sawhorse", vec![]);
        let inventory = stocked(&[("wood", 1)]);
        let start = Instant::now();

        let ticket = station.request_craft(&recipe, &inventory).await.unwrap();
        assert_eq!(
            ticket.completed().await,
            Some(CraftOutcome::Deposited(ItemStack::new("plank", 4)))
        );
        assert_eq!(Instant::now(), start);
        assert_eq!(inventory.lock().await.count("plank"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_inventory_skips_deposit() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![]);
        let inventory = stocked(&[("wood", 3), ("stone", 2)]);

        let ticket = station.request_craft(&recipe, &inventory).await.unwrap();
        drop(inventory);

        assert_eq!(ticket.completed().await, Some(CraftOutcome::InventoryGone));
        assert_eq!(station.state().await, StationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_station_never_deposits() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![]);
        let inventory = stocked(&[("wood", 3), ("stone", 2)]);

        let ticket = station.request_craft(&recipe, &inventory).await.unwrap();
        drop(station);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(ticket.completed().await, None);
        assert!(snapshot(&inventory).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_duration_is_clamped() {
        let mut recipe = Recipe::new("eternity", ItemStack::new("gem", 1), vec![], 1.0).unwrap();
        recipe.duration = Duration::from_secs_f32(1.0e19);
        let station = CraftingStation::new("altar", vec![]);
        let inventory = stocked(&[]);
        let start = Instant::now();

        let ticket = station.request_craft(&recipe, &inventory).await.unwrap();
        assert_eq!(ticket.ready_at, start + MAX_CRAFT_DURATION);
        assert!(station.is_crafting().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stations_sharing_inventory_commit_once() {
        let recipe = axe_recipe();

        for _ in 0..50 {
            let inventory = stocked(&[("wood", 3), ("stone", 2)]);
            let left = Arc::new(CraftingStation::new("left bench", vec![]));
            let right = Arc::new(CraftingStation::new("right bench", vec![]));

            let spawn_request = |station: Arc<CraftingStation>| {
                let recipe = recipe.clone();
                let inventory = inventory.clone();
                tokio::spawn(async move {
                    station
                        .request_craft(&recipe, &inventory)
                        .await
                        .map(|ticket| ticket.recipe_id)
                })
            };

            let (a, b) = tokio::join!(spawn_request(left.clone()), spawn_request(right.clone()));
            let results = [a.unwrap(), b.unwrap()];

            let accepted = results.iter().filter(|r| r.is_ok()).count();
            let refused: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
            assert_eq!(accepted, 1);
            assert_eq!(refused, vec![&CraftError::InsufficientMaterials]);
            assert!(snapshot(&inventory).await.is_empty());
            assert_ne!(left.is_crafting().await, right.is_crafting().await);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poisoned_task_slot_still_aborts_on_drop() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![]);
        let inventory = stocked(&[("wood", 3), ("stone", 2)]);

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = station.task.lock().unwrap();
            panic!("poison the task slot");
        }));
        assert!(station.task.is_poisoned());

        let ticket = station.request_craft(&recipe, &inventory).await.unwrap();
        drop(station);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(ticket.completed().await, None);
        assert_eq!(inventory.lock().await.count("axe"), 0);
    }

    #[test]
    fn test_recipe_lookup() {
        let recipe = axe_recipe();
        let station = CraftingStation::new("workbench", vec![recipe.clone()]);
        assert_eq!(station.recipes().len(), 1);
        assert_eq!(station.recipe("stone_axe"), Some(&recipe));
        assert!(station.recipe("pickaxe").is_none());
    }
}
