//! Shared, read-only view of the entity registry.
//!
//! The session controller is the only writer. Turn logic reads through
//! [`World::read`], which holds the lock for the duration of the closure, so a
//! delta is never observed half-applied.
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use game_state::{EntityId, Registry, SchemaTable, Value};

#[derive(Clone, Debug)]
pub struct World {
    registry: Arc<RwLock<Registry>>,
    player: Arc<OnceLock<EntityId>>,
}

impl World {
    pub(crate) fn new(schema: SchemaTable) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new(Arc::new(schema)))),
            player: Arc::new(OnceLock::new()),
        }
    }

    /// Runs `f` against the registry.
    ///
    /// Do not hold anything borrowed from the registry across an `.await`;
    /// copy out ids or values first.
    pub fn read<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        let guard = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        let mut guard = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Id of the player this client controls, once the game has started.
    pub fn player_id(&self) -> Option<EntityId> {
        self.player.get().cloned()
    }

    pub(crate) fn set_player(&self, id: EntityId) -> bool {
        self.player.set(id).is_ok()
    }

    /// Copies one attribute out of the registry.
    pub fn attribute(&self, id: &EntityId, attribute: &str) -> Option<Value> {
        self.read(|registry| registry.get(id)?.get(attribute).cloned())
    }

    /// Whether `id` names a live entity.
    pub fn is_live(&self, id: &EntityId) -> bool {
        self.read(|registry| registry.contains(id))
    }

    /// Owned copy of the whole registry.
    pub fn snapshot(&self) -> Registry {
        self.read(Registry::clone)
    }
}
