//! Error types for xmlstore
//!
//! Every failure inside the engine funnels into [`StoreError`], so outer layers
//! can answer "storage failed" uniformly. [`StoreError::kind`] classifies a
//! failure for callers that need finer handling.
//!
//! Lookups that find nothing are not errors: they return `Ok(None)`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for xmlstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    #[error("Data directory not found: {}", .0.display())]
    DataDirectoryNotFound(PathBuf),

    #[error("Document not found or empty: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Declaration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid entity declaration for {entity}: {message}")]
    InvalidEntityDeclaration { entity: String, message: String },

    // -------------------------------------------------------------------------
    // Conversion Errors
    // -------------------------------------------------------------------------
    #[error(
        "Nullability mismatch: descriptor nullable={declared}, runtime nullable={runtime}; \
         a property and its descriptor must be both nullable or both non-nullable"
    )]
    NullabilityMismatch { declared: bool, runtime: bool },

    #[error("Conversion between storage type {storage} and runtime type {runtime} is not supported")]
    UnsupportedConversion { storage: String, runtime: String },

    #[error("Cannot convert {raw:?} ({storage} -> {runtime})")]
    Conversion {
        raw: String,
        storage: String,
        runtime: String,
    },

    #[error("Type mismatch: expected {expected} value, found {found}")]
    TypeMismatch { expected: String, found: String },

    // -------------------------------------------------------------------------
    // Structural Errors
    // -------------------------------------------------------------------------
    #[error("Malformed document {document}: {message}")]
    MalformedDocument { document: String, message: String },

    #[error("Invalid schema {schema}: {message}")]
    InvalidSchema { schema: String, message: String },

    #[error("Row for {entity} #{id} not found in document")]
    RowNotFound { entity: String, id: i64 },

    #[error("Element <{field}> not found in {entity} row #{id}")]
    FieldNotFound {
        entity: String,
        field: String,
        id: i64,
    },

    #[error("Property {entity}::{property} is not nullable and has no stored value")]
    PropertyValueNotSet { entity: String, property: String },

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Document {document} is not valid against its schema:\n{}", .violations.join("\n"))]
    InvalidDocument {
        document: String,
        violations: Vec<String>,
    },

    // -------------------------------------------------------------------------
    // Identity Errors
    // -------------------------------------------------------------------------
    #[error("Another {entity} instance with id {id} is already attached")]
    EntityAlreadyAttached { entity: String, id: i64 },

    #[error("{entity} id is already assigned ({current})")]
    IdAlreadyAssigned { entity: String, current: i64 },

    #[error("{entity} has no id assigned")]
    IdNotAssigned { entity: String },

    #[error("No ids left for {entity}: the highest id in use is {high_water_mark}")]
    IdSpaceExhausted { entity: String, high_water_mark: i64 },
}

/// Coarse classification of a [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity metadata is malformed
    Declaration,
    /// A value could not be converted between its typed and textual forms
    Conversion,
    /// Stored data or schema is corrupt, or the identity map and document disagree
    Structural,
    /// The document failed schema validation at load time, or a write would break a unique constraint
    Validation,
    /// Identity map misuse
    Identity,
    /// Underlying I/O failure
    Io,
    /// Missing data directory, missing document or bad configuration
    Configuration,
}

impl StoreError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Io(_) => ErrorKind::Io,
            StoreError::Xml(_)
            | StoreError::MalformedDocument { .. }
            | StoreError::InvalidSchema { .. }
            | StoreError::RowNotFound { .. }
            | StoreError::FieldNotFound { .. }
            | StoreError::PropertyValueNotSet { .. } => ErrorKind::Structural,
            StoreError::DataDirectoryNotFound(_)
            | StoreError::DocumentNotFound(_)
            | StoreError::Config(_) => ErrorKind::Configuration,
            StoreError::InvalidEntityDeclaration { .. } => ErrorKind::Declaration,
            StoreError::NullabilityMismatch { .. }
            | StoreError::UnsupportedConversion { .. }
            | StoreError::Conversion { .. }
            | StoreError::TypeMismatch { .. } => ErrorKind::Conversion,
            StoreError::InvalidDocument { .. } => ErrorKind::Validation,
            StoreError::EntityAlreadyAttached { .. }
            | StoreError::IdAlreadyAssigned { .. }
            | StoreError::IdNotAssigned { .. }
            | StoreError::IdSpaceExhausted { .. } => ErrorKind::Identity,
        }
    }

    pub(crate) fn declaration(entity: &str, message: impl Into<String>) -> Self {
        StoreError::InvalidEntityDeclaration {
            entity: entity.to_string(),
            message: message.into(),
        }
    }
}
