//! Repository
//!
//! Typed entry point over one entity type: turns rows into entities and back.
//!
//! ## Data flow
//! ```text
//! find(id) ──▶ identity map hit? ──yes──▶ handle
//!                    │ no
//!                    ▼
//!              DocumentStore row ──▶ TypeConverter ──▶ entity ──▶ attach
//!
//! persist(e) ──▶ beforePersist hooks ──▶ attach (assign id) ──▶ update | create
//! delete(e)  ──▶ beforeDelete hooks  ──▶ detach ──▶ DocumentStore::delete
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::convert::TypeConverter;
use crate::error::{Result, StoreError};
use crate::identity::EntityState;
use crate::metadata::{entity_ref, Entity, EntityMetadata, EntityRef, LifecycleEvent, PropertyMetadata, Value};
use crate::session::Session;
use crate::store::{DocumentStore, Row, RowField};

/// Typed persistence for entities of type `E`
pub struct Repository<E: Entity> {
    metadata: Arc<EntityMetadata<E>>,
    store: DocumentStore,
}

impl<E: Entity> Repository<E> {
    /// Describe `E` and open its document
    pub fn open(config: &Config, session: &mut Session) -> Result<Self> {
        let metadata = session.describe::<E>()?;
        let store = DocumentStore::open(config, metadata.shape())?;

        info!(
            entity = E::NAME,
            rows = store.len(),
            document = %store.document_path().display(),
            "Opened repository"
        );

        Ok(Self { metadata, store })
    }

    pub fn metadata(&self) -> &EntityMetadata<E> {
        &self.metadata
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Entity with `id`, from the identity map or the document
    pub fn find(&self, session: &mut Session, id: i64) -> Result<Option<EntityRef<E>>> {
        if let Some(entity) = session.identity().get_by_id::<E>(id) {
            debug!(entity = E::NAME, id, "Identity map hit");
            return Ok(Some(entity));
        }

        match self.store.find_by_id(id) {
            Some(row) => self.hydrate(session, row).map(Some),
            None => Ok(None),
        }
    }

    /// First entity whose properties equal every criterion (property name, stored text)
    pub fn find_one_by(&self, session: &mut Session, criteria: &[(&str, &str)]) -> Result<Option<EntityRef<E>>> {
        match self.store.find_by_criteria(criteria) {
            Some(row) => self.hydrate(session, row).map(Some),
            None => Ok(None),
        }
    }

    /// Every stored entity, in document order
    pub fn find_all(&self, session: &mut Session) -> Result<Vec<EntityRef<E>>> {
        self.store
            .rows()
            .iter()
            .map(|row| self.hydrate(session, row))
            .collect()
    }

    /// Number of stored entities
    pub fn count(&self) -> usize {
        self.store.len()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Run `beforePersist` hooks, assign an id if needed, and write the entity
    pub fn persist(&mut self, session: &mut Session, entity: &EntityRef<E>) -> Result<EntityRef<E>> {
        self.metadata.run_hooks(&mut entity.write(), LifecycleEvent::BeforePersist);

        session.identity_mut().attach(entity, &self.store)?;
        let state = session.identity().state(entity);

        let (id, fields) = {
            let guard = entity.read();
            let id = guard.id().ok_or_else(|| StoreError::IdNotAssigned {
                entity: E::NAME.to_string(),
            })?;
            (id, self.row_fields(&guard)?)
        };

        if state == Some(EntityState::Persisted) {
            self.store.update(id, fields)?;
        } else {
            self.store.create(fields)?;
            session.identity_mut().mark_persisted(entity);
        }

        debug!(entity = E::NAME, id, "Persisted entity");
        Ok(Arc::clone(entity))
    }

    /// Run `beforeDelete` hooks, detach the entity and remove its row.
    ///
    /// Returns whether a row was removed; an entity that never received an
    /// id removes nothing.
    pub fn delete(&mut self, session: &mut Session, entity: &EntityRef<E>) -> Result<bool> {
        self.metadata.run_hooks(&mut entity.write(), LifecycleEvent::BeforeDelete);

        session.identity_mut().detach(entity);

        let Some(id) = entity.read().id() else {
            return Ok(false);
        };
        let removed = self.store.delete(id)?;

        debug!(entity = E::NAME, id, removed, "Deleted entity");
        Ok(removed)
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Materialise a row, reusing the attached handle for its id if any
    fn hydrate(&self, session: &mut Session, row: &Row) -> Result<EntityRef<E>> {
        let id = row.id().ok_or_else(|| StoreError::MalformedDocument {
            document: self.store.shape().document_file_name(),
            message: "row without a valid id".to_string(),
        })?;

        if let Some(entity) = session.identity().get_by_id::<E>(id) {
            return Ok(entity);
        }

        let mut entity = E::default();
        for property in self.metadata.properties() {
            let value = self.read_field(row, property)?;
            property.write(&mut entity, value)?;
        }

        let handle = entity_ref(entity);
        session.identity_mut().attach(&handle, &self.store)?;
        Ok(handle)
    }

    fn read_field(&self, row: &Row, property: &PropertyMetadata<E>) -> Result<Value> {
        let descriptor = property.descriptor();
        let runtime = property.runtime_type();
        let not_set = || StoreError::PropertyValueNotSet {
            entity: E::NAME.to_string(),
            property: property.name().to_string(),
        };

        match row.field(property.element()) {
            Some(field) if field.nil && !descriptor.nullable => Err(not_set()),
            Some(field) => TypeConverter::decode_field(&field.value, field.nil, descriptor, runtime),
            None if descriptor.nullable => TypeConverter::to_typed("", descriptor, runtime),
            None => Err(not_set()),
        }
    }

    fn row_fields(&self, entity: &E) -> Result<Vec<RowField>> {
        self.metadata
            .properties()
            .iter()
            .map(|property| {
                let value = property.read(entity)?;
                let (raw, nil) = TypeConverter::encode_field(&value, property.descriptor(), property.runtime_type())?;
                Ok(RowField::new(property.element(), raw, nil))
            })
            .collect()
    }
}
