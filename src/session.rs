//! Session
//!
//! Explicit unit of work holding the per-session caches: entity metadata and
//! the identity map. Every repository operation takes the session it runs in,
//! so two sessions never observe each other's entities.

use std::sync::Arc;

use crate::error::Result;
use crate::identity::IdentityRegistry;
use crate::metadata::{Entity, EntityMetadata, Introspector};

/// Metadata cache and identity map of one unit of work
#[derive(Default)]
pub struct Session {
    introspector: Introspector,
    identity: IdentityRegistry,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata of `E`, cached for the lifetime of the session
    pub fn describe<E: Entity>(&mut self) -> Result<Arc<EntityMetadata<E>>> {
        self.introspector.describe::<E>()
    }

    pub fn introspector(&self) -> &Introspector {
        &self.introspector
    }

    pub fn identity(&self) -> &IdentityRegistry {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut IdentityRegistry {
        &mut self.identity
    }

    /// Tear down the identity map. Handles already returned stay valid but
    /// are no longer tracked.
    pub fn clear(&mut self) {
        self.identity.clear();
    }
}
