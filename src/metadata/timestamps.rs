//! Creation and modification timestamps
//!
//! A field group entities embed to record when they were created and last
//! persisted.

use chrono::{DateTime, Utc};

use super::{Declaration, LifecycleEvent, PropertyDescriptor};

/// `createdAt` / `updatedAt` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Timestamps {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Timestamps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `updated_at` to the current time
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    /// Declare the group's properties and its `touchUpdatedAt` hook.
    ///
    /// The properties are inherited, so an entity may redeclare either one
    /// with a different descriptor.
    pub fn declare<E: 'static>(
        decl: &mut Declaration<E>,
        get: fn(&E) -> &Timestamps,
        get_mut: fn(&mut E) -> &mut Timestamps,
    ) {
        decl.inherit(|decl| {
            decl.property("createdAt")
                .descriptor(PropertyDescriptor::datetime())
                .field(move |e| &get(e).created_at, move |e| &mut get_mut(e).created_at);
            decl.property("updatedAt")
                .descriptor(PropertyDescriptor::datetime().nullable())
                .field(move |e| &get(e).updated_at, move |e| &mut get_mut(e).updated_at);
            decl.on("touchUpdatedAt", &[LifecycleEvent::BeforePersist], move |e, _| {
                get_mut(e).touch()
            });
        });
    }
}
