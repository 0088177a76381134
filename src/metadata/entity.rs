//! Entity contract
//!
//! An entity is a typed record with a set-once integer identifier and a
//! declared list of persisted properties.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, StoreError};

use super::Declaration;

/// Shared handle to a managed entity.
///
/// The identity map hands out clones of the same handle for the same id, so
/// pointer equality (`Arc::ptr_eq`) is entity identity.
pub type EntityRef<E> = Arc<RwLock<E>>;

/// Wrap a freshly constructed entity into a handle
pub fn entity_ref<E>(entity: E) -> EntityRef<E> {
    Arc::new(RwLock::new(entity))
}

/// Lifecycle events entities can bind hooks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleEvent {
    BeforePersist,
    BeforeDelete,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 2] = [LifecycleEvent::BeforePersist, LifecycleEvent::BeforeDelete];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::BeforePersist => "beforePersist",
            LifecycleEvent::BeforeDelete => "beforeDelete",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set-once entity identifier.
///
/// Cloning yields an *unassigned* id: a cloned entity is a new entity and
/// receives its own id when persisted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EntityId(Option<i64>);

impl EntityId {
    pub fn get(&self) -> Option<i64> {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0.is_some()
    }

    /// Assign the id. Fails if one is already assigned, even the same one.
    pub fn assign(&mut self, entity: &str, id: i64) -> Result<()> {
        if let Some(current) = self.0 {
            return Err(StoreError::IdAlreadyAssigned {
                entity: entity.to_string(),
                current,
            });
        }
        self.0 = Some(id);
        Ok(())
    }
}

impl Clone for EntityId {
    fn clone(&self) -> Self {
        EntityId(None)
    }
}

/// A type persisted as rows of its own document.
///
/// Implementors declare their properties and hooks ahead of time in
/// [`Entity::declare`]; nothing is discovered at runtime.
///
/// ```ignore
/// #[derive(Default)]
/// struct Widget {
///     id: EntityId,
///     name: String,
///     age: Option<i64>,
/// }
///
/// impl Entity for Widget {
///     const NAME: &'static str = "Widget";
///
///     fn declare(decl: &mut Declaration<Self>) {
///         decl.property("name")
///             .descriptor(PropertyDescriptor::string())
///             .field(|w| &w.name, |w| &mut w.name);
///         decl.property("age")
///             .descriptor(PropertyDescriptor::integer().nullable())
///             .field(|w| &w.age, |w| &mut w.age);
///     }
///
///     fn entity_id(&self) -> &EntityId { &self.id }
///     fn entity_id_mut(&mut self) -> &mut EntityId { &mut self.id }
/// }
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    /// Type name; its snake_case form names the document files
    const NAME: &'static str;

    /// Declare persisted properties and lifecycle hooks
    fn declare(decl: &mut Declaration<Self>);

    fn entity_id(&self) -> &EntityId;

    fn entity_id_mut(&mut self) -> &mut EntityId;

    /// Current id, if assigned
    fn id(&self) -> Option<i64> {
        self.entity_id().get()
    }
}
