//! Metadata Module
//!
//! Ahead-of-time description of persisted entity types.
//!
//! ## Responsibilities
//! - Storage descriptors and runtime types of properties
//! - The `Entity` contract and its declaration API
//! - Validation and caching of entity metadata (`Introspector`)
//! - Type-erased entity shapes for the storage layer

mod declaration;
mod descriptor;
mod entity;
mod introspector;
mod shape;
mod timestamps;
mod value;

pub use declaration::{Accessor, Declaration, PropertyDeclaration};
pub use descriptor::{PropertyDescriptor, StorageType};
pub use entity::{entity_ref, Entity, EntityId, EntityRef, LifecycleEvent};
pub use introspector::{
    EntityMetadata, Introspector, LifecycleHook, PropertyMetadata, ID_PROPERTY,
};
pub use shape::{EntityShape, ShapeField};
pub use timestamps::Timestamps;
pub use value::{EnumType, FieldValue, RuntimeKind, RuntimeType, Value};
