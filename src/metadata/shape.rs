//! Type-erased entity shape
//!
//! The schema and document layers are not generic over the entity type; they
//! only need the ordered element list and its descriptors. [`EntityShape`]
//! carries exactly that, plus the fingerprint of the definition.

use std::fmt::Write as _;

use crate::naming;

use super::PropertyDescriptor;

/// One persisted field as seen by the storage layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeField {
    /// Property name as declared (`createdAt`)
    pub property: String,
    /// Element name in documents (`created_at`)
    pub element: String,
    pub descriptor: PropertyDescriptor,
}

/// Storage-facing definition of an entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityShape {
    pub name: String,
    /// File base name of the document and schema
    pub basename: String,
    /// Persisted fields in declaration order; the id comes first
    pub fields: Vec<ShapeField>,
    /// Hex CRC32 of the canonical definition
    pub fingerprint: String,
}

impl EntityShape {
    pub fn new(name: &str, fields: Vec<ShapeField>) -> Self {
        let basename = naming::document_basename(name);
        let fingerprint = fingerprint(name, &fields);
        Self {
            name: name.to_string(),
            basename,
            fields,
            fingerprint,
        }
    }

    pub fn field(&self, element: &str) -> Option<&ShapeField> {
        self.fields.iter().find(|f| f.element == element)
    }

    pub fn document_file_name(&self) -> String {
        format!("{}.xml", self.basename)
    }

    pub fn schema_file_name(&self) -> String {
        format!("{}.xsd", self.basename)
    }
}

/// Canonical text of a definition: one line per field with every attribute
/// that influences the schema.
fn canonical_definition(name: &str, fields: &[ShapeField]) -> String {
    let mut text = format!("entity {}\n", naming::document_basename(name));
    for field in fields {
        let _ = writeln!(
            text,
            "{} {} nullable={} unique={}",
            field.element, field.descriptor.storage_type, field.descriptor.nullable, field.descriptor.unique
        );
    }
    text
}

fn fingerprint(name: &str, fields: &[ShapeField]) -> String {
    let checksum = crc32fast::hash(canonical_definition(name, fields).as_bytes());
    format!("{:08x}", checksum)
}

