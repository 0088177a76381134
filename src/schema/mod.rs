//! Schema Module
//!
//! Structural contract of an entity document and its synchronisation with
//! the entity definition.
//!
//! ## Responsibilities
//! - Derive a [`Schema`] from an entity shape
//! - Render it as an XML Schema document and parse it back
//! - Detect stale schema files through a fingerprint trailer and regenerate them

mod generator;
mod parser;
mod sync;

pub use sync::{fingerprint_trailer, SchemaSynchronizer};

use crate::metadata::{EntityShape, StorageType};
use crate::naming;

/// One field element of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub storage_type: StorageType,
    pub nillable: bool,
}

/// Uniqueness of one field across all rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    /// Element the constraint ranges over (the row element)
    pub selector: String,
    /// Field whose values must be distinct
    pub field: String,
}

/// Expected structure of an entity document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Root wrapper element
    pub root: String,
    /// Row element
    pub row: String,
    /// Row fields, in required order
    pub fields: Vec<FieldDefinition>,
    pub unique: Vec<UniqueConstraint>,
}

impl Schema {
    /// Schema describing documents of the given entity shape
    pub fn for_shape(shape: &EntityShape) -> Self {
        let fields = shape
            .fields
            .iter()
            .map(|f| FieldDefinition {
                name: f.element.clone(),
                storage_type: f.descriptor.storage_type,
                nillable: f.descriptor.nullable,
            })
            .collect();

        let unique = shape
            .fields
            .iter()
            .filter(|f| f.descriptor.unique)
            .map(|f| UniqueConstraint {
                name: format!("unique_{}", f.element),
                selector: naming::ROW_ELEMENT.to_string(),
                field: f.element.clone(),
            })
            .collect();

        Self {
            root: naming::ROOT_ELEMENT.to_string(),
            row: naming::ROW_ELEMENT.to_string(),
            fields,
            unique,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in the row sequence
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}
