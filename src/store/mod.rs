//! Store Module
//!
//! Row-level persistence of entity documents.
//!
//! ## Responsibilities
//! - Parse and serialize documents
//! - Validate documents against their schema file
//! - Look up, create, update and delete rows with write-through persistence

mod document;
#[allow(clippy::module_inception)]
mod store;
mod validate;

pub use document::{Document, Field, Row};
pub use store::{DocumentStore, RowField, StoreState};
pub use validate::{validate_document, Violation};

pub(crate) use validate::validate_unique;
