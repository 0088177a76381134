//! # xmlstore
//!
//! A flat-file persistence engine mapping typed entities onto XML documents:
//! - One document per entity type, validated against a generated schema
//! - Schema regeneration when the entity definition changes
//! - Typed round-tripping with explicit nil markers for absent values
//! - Identity map with monotonic, never-reused id assignment
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Repository<E>                          │
//! │            (find / find_one_by / persist / delete)          │
//! └──────┬───────────────────┬──────────────────────┬───────────┘
//!        │                   │                      │
//!        ▼                   ▼                      ▼
//! ┌─────────────┐   ┌─────────────────┐   ┌──────────────────┐
//! │   Session   │   │  TypeConverter  │   │  DocumentStore   │
//! │ Introspector│   │ (text <-> Value)│   │ (rows, validate) │
//! │ IdentityReg │   └─────────────────┘   └────────┬─────────┘
//! └─────────────┘                                  │
//!                                                  ▼
//!                                       ┌────────────────────┐
//!                                       │ SchemaSynchronizer │
//!                                       │  (.xsd + trailer)  │
//!                                       └────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let config = Config::builder().data_dir("./data").create_missing_documents(true).build();
//! let mut session = Session::new();
//! let mut widgets = Repository::<Widget>::open(&config, &mut session)?;
//!
//! let widget = entity_ref(Widget { name: "A".into(), ..Default::default() });
//! widgets.persist(&mut session, &widget)?;
//! assert_eq!(widget.read().id(), Some(1));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod naming;

pub mod metadata;
pub mod convert;
pub mod schema;
pub mod store;
pub mod identity;
pub mod session;
pub mod repository;

mod durable;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, Result, StoreError};
pub use config::{Config, SyncStrategy};
pub use convert::TypeConverter;
pub use identity::{EntityState, IdSpace, IdentityRegistry};
pub use metadata::{
    entity_ref, Declaration, Entity, EntityId, EntityMetadata, EntityRef, Introspector,
    LifecycleEvent, PropertyDescriptor, StorageType, Timestamps, Value,
};
pub use repository::Repository;
pub use schema::{Schema, SchemaSynchronizer};
pub use session::Session;
pub use store::{DocumentStore, RowField, StoreState};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of xmlstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
