use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use tilecraft::config::{HostConfig, CONFIG_FILE};
use tilecraft::data::ItemRegistry;
use tilecraft::services::{Lifetime, ServiceRegistry};
use tilecraft::tile::TileType;
use tilecraft::{
    inventory_handle, CraftError, CraftingStation, DataError, Inventory, InventoryHandle,
    RecipeRegistry, TilePolicyTable,
};

/// Tiles per second on a neutral tile
const BASE_WALK_SPEED: f32 = 4.0;

// ============================================================================
// Content
// ============================================================================

fn load_services(config: &HostConfig) -> Result<ServiceRegistry, DataError> {
    let data_dir = config.data_dir.as_path();

    let mut items = ItemRegistry::new();
    items.load_from_directory(data_dir)?;

    let mut recipes = RecipeRegistry::new();
    recipes.load_from_directory(data_dir)?;

    let tiles = TilePolicyTable::load_from_directory(data_dir)?;

    let items = Arc::new(items);
    let mut inventory = Inventory::with_registry(config.inventory_slots, items.clone());
    for (item_id, count) in &config.starting_inventory {
        let overflow = inventory.insert(item_id, *count);
        if overflow > 0 {
            warn!("Starting inventory has no room for {}x {}", overflow, item_id);
        }
    }

    let services = ServiceRegistry::new();
    if services.register(items, Lifetime::Persistent).is_err() {
        warn!("Item registry already registered, keeping the existing one");
    }
    if services.register(recipes, Lifetime::Persistent).is_err() {
        warn!("Recipe registry already registered, keeping the existing one");
    }
    if services.register(tiles, Lifetime::Persistent).is_err() {
        warn!("Tile policy table already registered, keeping the existing one");
    }
    if services
        .register(inventory_handle(inventory), Lifetime::Scene)
        .is_err()
    {
        warn!("Inventory already registered, keeping the existing one");
    }

    Ok(services)
}

// ============================================================================
// Movement demo
// ============================================================================

fn walk(tiles: &TilePolicyTable, path: &[u8]) {
    for (step, &tile) in path.iter().enumerate() {
        let policy = tiles.policy(tile);
        let name = TileType::from_u8(tile).map_or("unknown", |t| t.name());
        info!(
            "step {:>2}: {:<14} speed {:.2} passable={} walkable={} ladder={}",
            step,
            name,
            BASE_WALK_SPEED * policy.speed_multiplier,
            policy.passable,
            policy.walkable,
            policy.ladder
        );
    }
}

// ============================================================================
// Crafting loop
// ============================================================================

async fn run_crafts(
    station: &CraftingStation,
    recipes: &RecipeRegistry,
    inventory: &InventoryHandle<Inventory>,
    mut queue: VecDeque<String>,
    tick_rate: Duration,
) {
    let mut interval = tokio::time::interval(tick_rate);

    loop {
        interval.tick().await;

        if station.is_crafting().await {
            continue;
        }
        let Some(recipe_id) = queue.pop_front() else {
            break;
        };
        let Some(recipe) = recipes.get(&recipe_id) else {
            warn!("Unknown recipe '{}', skipping", recipe_id);
            continue;
        };

        match station.request_craft(&recipe, inventory).await {
            Ok(ticket) => {
                info!(
                    "Crafting {} [{}] until {:?}",
                    recipe.display_name,
                    recipe.category.as_str(),
                    ticket.ready_at
                );
            }
            Err(CraftError::InsufficientMaterials) => {
                warn!("Not enough materials for '{}'", recipe_id);
            }
            Err(CraftError::StationBusy) => {
                queue.push_front(recipe_id);
            }
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "tilecraft=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match HostConfig::load(Path::new(CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let services = match load_services(&config) {
        Ok(services) => services,
        Err(e) => {
            error!("Failed to load content: {}", e);
            std::process::exit(1);
        }
    };

    let (Some(tiles), Some(recipes), Some(inventory)) = (
        services.get::<TilePolicyTable>(),
        services.get::<RecipeRegistry>(),
        services.get::<InventoryHandle<Inventory>>(),
    ) else {
        error!("Core services missing after load");
        std::process::exit(1);
    };

    walk(&tiles, &config.walk_path);

    // Recipe ids from the command line, or every recipe in id order
    let mut queue: VecDeque<String> = std::env::args().skip(1).collect();
    if queue.is_empty() {
        let mut ids: Vec<String> = recipes.ids().cloned().collect();
        ids.sort();
        queue.extend(ids);
    }

    let station = CraftingStation::new("workbench", recipes.all().cloned().collect());
    info!("Station {} ({}) offers {} recipe(s)", station.name, station.id, station.recipes().len());

    run_crafts(
        &station,
        &recipes,
        &inventory,
        queue,
        Duration::from_millis(config.tick_rate_ms.max(1)),
    )
    .await;

    let snapshot = inventory.lock().await.snapshot();
    if let Some(items) = services.get::<Arc<ItemRegistry>>() {
        for (item_id, count) in &snapshot {
            info!("  {:>4}x {}", count, items.display_name(item_id));
        }
    }
    match serde_json::to_string(&snapshot) {
        Ok(json) => info!("Final inventory: {}", json),
        Err(e) => error!("Failed to serialize inventory: {}", e),
    }

    services.unload_scene();
}
