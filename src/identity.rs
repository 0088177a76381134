//! Identity Registry
//!
//! Identity map, id generator and lifecycle state tracker for one session.
//!
//! ## Responsibilities
//! - Keep at most one live handle per (entity type, id)
//! - Assign ids to new entities: one past the highest id ever seen
//! - Track each handle as new, persisted or detached
//!
//! ## Id space
//! The first id generated for a type loads the ids already stored for it
//! through an [`IdSpace`]. From then on the high-water mark only grows: ids
//! freed by deletion are never handed out again during the session.
//!
//! Callers must not hold a lock on an entity handle while passing it in; the
//! registry reads and assigns ids through the handle's lock.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::metadata::{Entity, EntityRef};

/// Lifecycle state of an attached handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Id assigned, not yet stored
    New,
    /// Backed by a stored row
    Persisted,
    /// Removed from the identity map
    Detached,
}

/// Source of the ids already in use for an entity type
pub trait IdSpace {
    fn existing_ids(&self) -> Result<Vec<i64>>;
}

impl IdSpace for Vec<i64> {
    fn existing_ids(&self) -> Result<Vec<i64>> {
        Ok(self.clone())
    }
}

type ErasedHandle = Arc<dyn Any + Send + Sync>;

struct Tracked {
    handle: Weak<dyn Any + Send + Sync>,
    state: EntityState,
}

/// Registry state of one entity type
#[derive(Default)]
struct ClassEntry {
    by_id: HashMap<i64, ErasedHandle>,
    /// Keyed by handle address; the weak reference pins the address
    states: HashMap<usize, Tracked>,
    id_space_loaded: bool,
    high_water_mark: i64,
}

impl ClassEntry {
    fn state_of(&self, address: usize) -> Option<EntityState> {
        self.states
            .get(&address)
            .filter(|tracked| tracked.handle.strong_count() > 0)
            .map(|tracked| tracked.state)
    }

    fn is_attached(&self, address: usize) -> bool {
        matches!(self.state_of(address), Some(EntityState::New | EntityState::Persisted))
    }

    fn observe(&mut self, id: i64) {
        self.high_water_mark = self.high_water_mark.max(id);
    }

    fn set_state(&mut self, address: usize, state: EntityState) {
        if let Some(tracked) = self.states.get_mut(&address) {
            tracked.state = state;
        }
    }

    fn prune(&mut self) {
        self.states.retain(|_, tracked| tracked.handle.strong_count() > 0);
    }
}

fn address<E>(entity: &EntityRef<E>) -> usize {
    Arc::as_ptr(entity) as *const () as usize
}

fn erased_address(handle: &ErasedHandle) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

/// Per-session identity map
#[derive(Default)]
pub struct IdentityRegistry {
    classes: HashMap<TypeId, ClassEntry>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry<E: Entity>(&self) -> Option<&ClassEntry> {
        self.classes.get(&TypeId::of::<E>())
    }

    fn entry_mut<E: Entity>(&mut self) -> &mut ClassEntry {
        self.classes.entry(TypeId::of::<E>()).or_default()
    }

    // =========================================================================
    // Attach / Detach
    // =========================================================================

    /// Register a handle in the identity map.
    ///
    /// Returns `false` if the handle is already attached. An entity without
    /// an id receives the next id and becomes [`EntityState::New`]; one that
    /// already has an id becomes [`EntityState::Persisted`]. Fails with
    /// `EntityAlreadyAttached` if a different handle holds that id.
    pub fn attach<E: Entity>(&mut self, entity: &EntityRef<E>, id_space: &dyn IdSpace) -> Result<bool> {
        let key = address(entity);
        let existing_id = entity.read().id();
        let entry = self.entry_mut::<E>();

        if entry.is_attached(key) {
            return Ok(false);
        }

        let (id, state) = match existing_id {
            Some(id) => {
                if let Some(other) = entry.by_id.get(&id) {
                    if erased_address(other) != key {
                        return Err(StoreError::EntityAlreadyAttached {
                            entity: E::NAME.to_string(),
                            id,
                        });
                    }
                }
                entry.observe(id);
                (id, EntityState::Persisted)
            }
            None => {
                let id = Self::next_id::<E>(entry, id_space)?;
                entity.write().entity_id_mut().assign(E::NAME, id)?;
                (id, EntityState::New)
            }
        };

        let erased: ErasedHandle = entity.clone();
        entry.states.insert(
            key,
            Tracked {
                handle: Arc::downgrade(&erased),
                state,
            },
        );
        entry.by_id.insert(id, erased);

        debug!(entity = E::NAME, id, ?state, "Attached entity");
        Ok(true)
    }

    /// Remove a handle from the identity map. Returns whether it was attached.
    pub fn detach<E: Entity>(&mut self, entity: &EntityRef<E>) -> bool {
        let key = address(entity);
        let id = entity.read().id();
        let Some(entry) = self.classes.get_mut(&TypeId::of::<E>()) else {
            return false;
        };

        if !entry.is_attached(key) {
            return false;
        }

        entry.set_state(key, EntityState::Detached);
        if let Some(id) = id {
            if entry.by_id.get(&id).map(erased_address) == Some(key) {
                entry.by_id.remove(&id);
            }
        }
        entry.prune();

        debug!(entity = E::NAME, ?id, "Detached entity");
        true
    }

    /// Remove whatever handle holds `id`. Returns whether one was attached.
    pub fn detach_by_id<E: Entity>(&mut self, id: i64) -> bool {
        let Some(entry) = self.classes.get_mut(&TypeId::of::<E>()) else {
            return false;
        };
        let Some(handle) = entry.by_id.remove(&id) else {
            return false;
        };

        entry.set_state(erased_address(&handle), EntityState::Detached);
        entry.prune();

        debug!(entity = E::NAME, id, "Detached entity");
        true
    }

    /// Transition a handle from new to persisted. Returns whether it changed.
    pub fn mark_persisted<E: Entity>(&mut self, entity: &EntityRef<E>) -> bool {
        let key = address(entity);
        let Some(entry) = self.classes.get_mut(&TypeId::of::<E>()) else {
            return false;
        };

        if entry.state_of(key) != Some(EntityState::New) {
            return false;
        }
        entry.set_state(key, EntityState::Persisted);
        true
    }

    /// Drop every entry of every type
    pub fn clear(&mut self) {
        self.classes.clear();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Attached handle holding `id`. Never loads from storage.
    pub fn get_by_id<E: Entity>(&self, id: i64) -> Option<EntityRef<E>> {
        let handle = self.entry::<E>()?.by_id.get(&id)?;
        Arc::clone(handle).downcast().ok()
    }

    pub fn state<E: Entity>(&self, entity: &EntityRef<E>) -> Option<EntityState> {
        self.entry::<E>()?.state_of(address(entity))
    }

    pub fn is_attached<E: Entity>(&self, entity: &EntityRef<E>) -> bool {
        self.entry::<E>().is_some_and(|entry| entry.is_attached(address(entity)))
    }

    pub fn is_persisted<E: Entity>(&self, entity: &EntityRef<E>) -> bool {
        self.state(entity) == Some(EntityState::Persisted)
    }

    /// Number of attached handles of type `E`
    pub fn attached_count<E: Entity>(&self) -> usize {
        self.entry::<E>().map_or(0, |entry| entry.by_id.len())
    }

    /// Highest id seen or generated for `E` so far
    pub fn high_water_mark<E: Entity>(&self) -> i64 {
        self.entry::<E>().map_or(0, |entry| entry.high_water_mark)
    }

    // =========================================================================
    // Id generation
    // =========================================================================

    fn next_id<E: Entity>(entry: &mut ClassEntry, id_space: &dyn IdSpace) -> Result<i64> {
        if !entry.id_space_loaded {
            let ids = id_space.existing_ids()?;
            let count = ids.len();
            for id in ids {
                entry.observe(id);
            }
            entry.id_space_loaded = true;
            debug!(
                entity = E::NAME,
                existing = count,
                high_water_mark = entry.high_water_mark,
                "Loaded id space"
            );
        }

        let id = entry
            .high_water_mark
            .checked_add(1)
            .ok_or_else(|| StoreError::IdSpaceExhausted {
                entity: E::NAME.to_string(),
                high_water_mark: entry.high_water_mark,
            })?;
        entry.high_water_mark = id;

        debug!(entity = E::NAME, id, "Generated id");
        Ok(id)
    }
}
