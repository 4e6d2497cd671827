//! Process-wide service registry
//!
//! One instance per type, keyed by `TypeId`. Each service is registered with
//! a [`Lifetime`]: scene services are dropped by [`ServiceRegistry::unload_scene`],
//! persistent ones survive until removed explicitly.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Dropped when the current scene unloads
    Scene,
    /// Kept across scene changes
    Persistent,
}

struct ServiceEntry {
    name: &'static str,
    lifetime: Lifetime,
    value: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<TypeId, ServiceEntry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the instance for `T`. The first registration wins; a
    /// duplicate is handed back to the caller untouched.
    pub fn register<T: Any + Send + Sync>(&self, value: T, lifetime: Lifetime) -> Result<Arc<T>, T> {
        match self.services.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => {
                warn!("Service {} already registered, rejecting duplicate", type_name::<T>());
                Err(value)
            }
            Entry::Vacant(slot) => {
                let value = Arc::new(value);
                slot.insert(ServiceEntry {
                    name: type_name::<T>(),
                    lifetime,
                    value: value.clone(),
                });
                debug!("Registered service {} ({:?})", type_name::<T>(), lifetime);
                Ok(value)
            }
        }
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value.clone().downcast::<T>().ok())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services
            .remove(&TypeId::of::<T>())
            .and_then(|(_, entry)| entry.value.downcast::<T>().ok())
    }

    /// Drop every scene-scoped service. Returns how many were dropped.
    pub fn unload_scene(&self) -> usize {
        let before = self.services.len();
        self.services.retain(|_, entry| {
            let keep = entry.lifetime == Lifetime::Persistent;
            if !keep {
                debug!("Unloading scene service {}", entry.name);
            }
            keep
        });
        let dropped = before - self.services.len();
        info!("Scene unloaded, dropped {} service(s)", dropped);
        dropped
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{inventory_handle, Inventory, InventoryHandle};
    use crate::tile::TilePolicyTable;

    #[derive(Debug, PartialEq)]
    struct Music(&'static str);

    #[test]
    fn test_first_registration_wins() {
        let registry = ServiceRegistry::new();
        assert!(registry.register(Music("title"), Lifetime::Persistent).is_ok());

        let rejected = registry.register(Music("cave"), Lifetime::Scene).unwrap_err();
        assert_eq!(rejected, Music("cave"));
        assert_eq!(*registry.get::<Music>().unwrap(), Music("title"));
    }

    #[test]
    fn test_unload_scene_keeps_persistent() {
        let registry = ServiceRegistry::new();
        registry.register(Music("title"), Lifetime::Persistent).unwrap();
        registry
            .register(inventory_handle(Inventory::default()), Lifetime::Scene)
            .unwrap();
        registry.register(TilePolicyTable::reference(), Lifetime::Scene).unwrap();
        assert_eq!(registry.len(), 3);

        assert_eq!(registry.unload_scene(), 2);
        assert!(registry.contains::<Music>());
        assert!(registry.get::<InventoryHandle<Inventory>>().is_none());
        assert!(!registry.contains::<TilePolicyTable>());
    }

    #[test]
    fn test_remove_allows_reregistration() {
        let registry = ServiceRegistry::new();
        registry.register(Music("title"), Lifetime::Scene).unwrap();

        assert_eq!(*registry.remove::<Music>().unwrap(), Music("title"));
        assert!(registry.is_empty());
        assert!(registry.register(Music("cave"), Lifetime::Scene).is_ok());
    }
}
