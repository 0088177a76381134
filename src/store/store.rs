//! Document Store
//!
//! Owns the document of one entity type.
//!
//! ## Lifecycle
//! ```text
//! Unloaded ──load──▶ Loaded ──validate──▶ Validated
//! ```
//! [`DocumentStore::open`] runs both steps; a store that fails either step is
//! never handed out.
//!
//! ## Writes
//! Every mutation is applied to a copy of the document, checked against the
//! unique constraints of the entity, written through to disk, and only then
//! becomes the in-memory state. A rejected or failed write leaves the store
//! exactly as it was.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::durable;
use crate::error::{Result, StoreError};
use crate::identity::IdSpace;
use crate::metadata::EntityShape;
use crate::naming;
use crate::schema::{Schema, SchemaSynchronizer};

use super::{validate_document, validate_unique, Document, Field, Row};

/// Load state of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Unloaded,
    Loaded,
    Validated,
}

/// One field of a row to write, keyed by element name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowField {
    pub name: String,
    pub value: String,
    pub nil: bool,
}

impl RowField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, nil: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            nil,
        }
    }
}

impl From<RowField> for Field {
    fn from(field: RowField) -> Self {
        Field {
            name: field.name,
            value: if field.nil { String::new() } else { field.value },
            nil: field.nil,
        }
    }
}

/// Row-level access to one entity document
pub struct DocumentStore {
    /// Store configuration
    config: Config,

    /// Definition of the stored entity
    shape: EntityShape,

    /// `<data_dir>/<basename>.xml`
    document_path: PathBuf,

    /// `<data_dir>/<basename>.xsd`
    schema_path: PathBuf,

    /// Current document, identical to the file contents
    document: Document,

    /// Schema derived from `shape`, consulted before every write
    constraints: Schema,

    state: StoreState,
}

impl DocumentStore {
    /// Load and validate the document of `shape`, regenerating its schema first if stale
    pub fn open(config: &Config, shape: &EntityShape) -> Result<Self> {
        config.validate()?;

        if !config.data_dir.is_dir() {
            return Err(StoreError::DataDirectoryNotFound(config.data_dir.clone()));
        }

        let mut store = Self {
            config: config.clone(),
            shape: shape.clone(),
            document_path: config.data_dir.join(shape.document_file_name()),
            schema_path: config.data_dir.join(shape.schema_file_name()),
            document: Document::empty(),
            constraints: Schema::for_shape(shape),
            state: StoreState::Unloaded,
        };

        store.load()?;
        store.validate()?;

        Ok(store)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    fn load(&mut self) -> Result<()> {
        let text = match fs::read_to_string(&self.document_path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        self.document = match text {
            Some(text) if !text.trim().is_empty() => {
                Document::parse(&text, &self.shape.document_file_name())?
            }
            _ if self.config.create_missing_documents => {
                let document = Document::empty();
                self.write(&document)?;
                info!(
                    entity = %self.shape.name,
                    path = %self.document_path.display(),
                    "Created empty document"
                );
                document
            }
            _ => return Err(StoreError::DocumentNotFound(self.document_path.clone())),
        };

        self.state = StoreState::Loaded;
        debug!(
            entity = %self.shape.name,
            rows = self.document.rows.len(),
            "Loaded document"
        );
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        SchemaSynchronizer::new(&self.config).sync(&self.shape, &self.schema_path)?;

        let schema_text = fs::read_to_string(&self.schema_path)?;
        let schema = Schema::parse(&schema_text, &self.shape.schema_file_name())?;

        let violations = validate_document(&self.document, &schema);
        if !violations.is_empty() {
            return Err(StoreError::InvalidDocument {
                document: self.shape.document_file_name(),
                violations: violations.iter().map(ToString::to_string).collect(),
            });
        }

        self.state = StoreState::Validated;
        debug!(entity = %self.shape.name, "Validated document");
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn shape(&self) -> &EntityShape {
        &self.shape
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    /// Row with the given id
    pub fn find_by_id(&self, id: i64) -> Option<&Row> {
        self.document.rows.iter().find(|row| row.id() == Some(id))
    }

    /// First row whose fields equal every criterion.
    ///
    /// Criteria keys are property names and go through the same name
    /// conversion as stored elements. Nil fields never match.
    pub fn find_by_criteria(&self, criteria: &[(&str, &str)]) -> Option<&Row> {
        let criteria: Vec<(String, &str)> = criteria
            .iter()
            .map(|(property, value)| (naming::element_name(property), *value))
            .collect();

        self.document.rows.iter().find(|row| {
            criteria
                .iter()
                .all(|(element, value)| row.value(element) == Some(*value))
        })
    }

    /// Every row, in document order
    pub fn rows(&self) -> &[Row] {
        &self.document.rows
    }

    /// Ids of every row, in document order
    pub fn ids(&self) -> Vec<i64> {
        self.document.rows.iter().filter_map(Row::id).collect()
    }

    pub fn len(&self) -> usize {
        self.document.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.rows.is_empty()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append a row
    pub fn create(&mut self, fields: Vec<RowField>) -> Result<()> {
        let mut next = self.document.clone();
        next.rows.push(Row::new(fields.into_iter().map(Field::from).collect()));

        self.commit(next)?;
        debug!(entity = %self.shape.name, rows = self.len(), "Created row");
        Ok(())
    }

    /// Overwrite the given fields of the row with `id`
    pub fn update(&mut self, id: i64, fields: Vec<RowField>) -> Result<()> {
        let mut next = self.document.clone();

        let row = next
            .rows
            .iter_mut()
            .find(|row| row.id() == Some(id))
            .ok_or_else(|| StoreError::RowNotFound {
                entity: self.shape.name.clone(),
                id,
            })?;

        for field in fields {
            let target = row.field_mut(&field.name).ok_or_else(|| StoreError::FieldNotFound {
                entity: self.shape.name.clone(),
                field: field.name.clone(),
                id,
            })?;
            *target = Field::from(field);
        }

        self.commit(next)?;
        debug!(entity = %self.shape.name, id, "Updated row");
        Ok(())
    }

    /// Remove the row with `id`. Returns whether a row was removed.
    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let Some(index) = self.document.rows.iter().position(|row| row.id() == Some(id)) else {
            return Ok(false);
        };

        let mut next = self.document.clone();
        next.rows.remove(index);

        self.commit(next)?;
        debug!(entity = %self.shape.name, id, "Deleted row");
        Ok(true)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn commit(&mut self, next: Document) -> Result<()> {
        let mut violations = Vec::new();
        validate_unique(&next, &self.constraints, &mut violations);
        if !violations.is_empty() {
            return Err(StoreError::InvalidDocument {
                document: self.shape.document_file_name(),
                violations: violations.iter().map(ToString::to_string).collect(),
            });
        }

        self.write(&next)?;
        self.document = next;
        Ok(())
    }

    fn write(&self, document: &Document) -> Result<()> {
        let text = document.render(self.config.indent_width)?;
        durable::write_atomic(&self.document_path, text.as_bytes(), self.config.sync_strategy)
    }
}

impl IdSpace for DocumentStore {
    fn existing_ids(&self) -> Result<Vec<i64>> {
        Ok(self.ids())
    }
}
