//! Tests for the metadata Introspector
//!
//! These tests verify:
//! - Property order, element names and descriptors
//! - The implicit id property and inherited timestamp properties
//! - Overriding inherited properties in place
//! - Lifecycle hook registration and dispatch
//! - Rejection of malformed declarations
//! - Per-type caching and definition fingerprints

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use xmlstore::metadata::{
    Declaration, Entity, EntityId, EntityMetadata, Introspector, LifecycleEvent, PropertyDescriptor, RuntimeKind,
    RuntimeType, StorageType, Timestamps, Value,
};
use xmlstore::{ErrorKind, StoreError};

use common::{Gadget, Widget};

// =============================================================================
// Helper Functions
// =============================================================================

/// Declare a throwaway entity with `name` and `other` string fields
macro_rules! entity {
    ($name:ident, $entity_name:expr, |$decl:ident| $body:block) => {
        #[allow(dead_code)]
        #[derive(Default)]
        struct $name {
            id: EntityId,
            name: String,
            other: String,
        }

        impl Entity for $name {
            const NAME: &'static str = $entity_name;

            fn declare($decl: &mut Declaration<Self>) $body

            fn entity_id(&self) -> &EntityId {
                &self.id
            }

            fn entity_id_mut(&mut self) -> &mut EntityId {
                &mut self.id
            }
        }
    };
}

fn declaration_error<E: Entity>() -> String {
    match EntityMetadata::<E>::build() {
        Ok(_) => panic!("declaration of {} should be rejected", E::NAME),
        Err(e) => {
            assert_eq!(e.kind(), ErrorKind::Declaration);
            match e {
                StoreError::InvalidEntityDeclaration { entity, message } => {
                    assert_eq!(entity, E::NAME);
                    message
                }
                other => panic!("unexpected error: {}", other),
            }
        }
    }
}

fn property_names<E: Entity>(metadata: &EntityMetadata<E>) -> Vec<&str> {
    metadata.properties().iter().map(|p| p.name()).collect()
}

// =============================================================================
// Property Tests
// =============================================================================

#[test]
fn test_properties_in_declaration_order_with_id_first() {
    let metadata = EntityMetadata::<Widget>::build().unwrap();

    assert_eq!(metadata.name(), "Widget");
    assert_eq!(property_names(&metadata), vec!["id", "name", "age"]);
}

#[test]
fn test_id_property_is_unique_integer() {
    let metadata = EntityMetadata::<Widget>::build().unwrap();
    let id = metadata.property("id").unwrap();

    assert_eq!(id.descriptor(), &PropertyDescriptor::integer().unique());
    assert_eq!(id.runtime_type(), RuntimeType::required(RuntimeKind::Integer));
    assert_eq!(id.element(), "id");
}

#[test]
fn test_descriptors_and_runtime_types() {
    let metadata = EntityMetadata::<Widget>::build().unwrap();

    let name = metadata.property("name").unwrap();
    assert_eq!(name.descriptor().storage_type, StorageType::String);
    assert!(!name.descriptor().nullable);
    assert_eq!(name.runtime_type(), RuntimeType::required(RuntimeKind::String));

    let age = metadata.property("age").unwrap();
    assert_eq!(age.descriptor(), &PropertyDescriptor::integer().nullable());
    assert_eq!(age.runtime_type(), RuntimeType::optional(RuntimeKind::Integer));
}

#[test]
fn test_inherited_timestamps_come_before_own_properties() {
    let metadata = EntityMetadata::<Gadget>::build().unwrap();

    assert_eq!(
        property_names(&metadata),
        vec!["id", "createdAt", "updatedAt", "label", "active", "color", "releasedAt", "note"]
    );

    let elements: Vec<&str> = metadata.properties().iter().map(|p| p.element()).collect();
    assert_eq!(
        elements,
        vec!["id", "created_at", "updated_at", "label", "active", "color", "released_at", "note"]
    );

    let updated = metadata.property_by_element("updated_at").unwrap();
    assert_eq!(updated.name(), "updatedAt");
    assert!(updated.descriptor().nullable);
}

#[test]
fn test_enum_property_runtime_type() {
    let metadata = EntityMetadata::<Gadget>::build().unwrap();
    let color = metadata.property("color").unwrap();

    match color.runtime_type().kind {
        RuntimeKind::Enum(enum_type) => {
            assert_eq!(enum_type.name, "Color");
            assert_eq!(enum_type.variants, &["red", "blue"]);
        }
        other => panic!("expected enum runtime kind, got {}", other),
    }
}

#[test]
fn test_property_read_and_write() {
    let metadata = EntityMetadata::<Widget>::build().unwrap();
    let mut widget = Widget::new("A", None);

    let name = metadata.property("name").unwrap();
    assert_eq!(name.read(&widget).unwrap(), Value::String("A".to_string()));
    name.write(&mut widget, Value::String("B".to_string())).unwrap();
    assert_eq!(widget.name, "B");

    let age = metadata.property("age").unwrap();
    assert_eq!(age.read(&widget).unwrap(), Value::Null);
    age.write(&mut widget, Value::Integer(30)).unwrap();
    assert_eq!(widget.age, Some(30));
}

#[test]
fn test_property_write_with_wrong_value_type() {
    let metadata = EntityMetadata::<Widget>::build().unwrap();
    let mut widget = Widget::default();

    let result = metadata
        .property("name")
        .unwrap()
        .write(&mut widget, Value::Integer(1));
    assert!(matches!(result, Err(StoreError::TypeMismatch { .. })));
}

#[test]
fn test_id_read_and_write() {
    let metadata = EntityMetadata::<Widget>::build().unwrap();
    let id = metadata.property("id").unwrap();
    let mut widget = Widget::default();

    assert!(matches!(id.read(&widget), Err(StoreError::IdNotAssigned { .. })));

    id.write(&mut widget, Value::Integer(4)).unwrap();
    assert_eq!(widget.id(), Some(4));
    assert_eq!(id.read(&widget).unwrap(), Value::Integer(4));

    // Set-once
    let result = id.write(&mut widget, Value::Integer(5));
    assert!(matches!(result, Err(StoreError::IdAlreadyAssigned { current: 4, .. })));
}

#[test]
fn test_cloned_entity_has_no_id() {
    let mut widget = Widget::new("A", None);
    widget.id.assign("Widget", 1).unwrap();

    let copy = widget.clone();
    assert_eq!(widget.id(), Some(1));
    assert_eq!(copy.id(), None);
}

// =============================================================================
// Override Tests
// =============================================================================

#[derive(Default)]
struct Imported {
    id: EntityId,
    timestamps: Timestamps,
    imported_at: Option<DateTime<Utc>>,
}

impl Entity for Imported {
    const NAME: &'static str = "Imported";

    fn declare(decl: &mut Declaration<Self>) {
        Timestamps::declare(decl, |e| &e.timestamps, |e| &mut e.timestamps);

        // Imported rows may lack a creation time
        decl.property("createdAt")
            .descriptor(PropertyDescriptor::datetime().nullable())
            .field(|e| &e.imported_at, |e| &mut e.imported_at);
    }

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn entity_id_mut(&mut self) -> &mut EntityId {
        &mut self.id
    }
}

#[test]
fn test_own_declaration_overrides_inherited_in_place() {
    let metadata = EntityMetadata::<Imported>::build().unwrap();

    assert_eq!(property_names(&metadata), vec!["id", "createdAt", "updatedAt"]);

    let created = metadata.property("createdAt").unwrap();
    assert_eq!(created.descriptor(), &PropertyDescriptor::datetime().nullable());
    assert_eq!(created.runtime_type(), RuntimeType::optional(RuntimeKind::DateTime));

    let entity = Imported::default();
    assert_eq!(created.read(&entity).unwrap(), Value::Null);
}

#[derive(Default)]
struct Backfilled {
    id: EntityId,
    timestamps: Timestamps,
    backfilled_at: Option<DateTime<Utc>>,
}

impl Entity for Backfilled {
    const NAME: &'static str = "Backfilled";

    fn declare(decl: &mut Declaration<Self>) {
        decl.property("createdAt")
            .descriptor(PropertyDescriptor::datetime().nullable())
            .field(|e| &e.backfilled_at, |e| &mut e.backfilled_at);

        Timestamps::declare(decl, |e| &e.timestamps, |e| &mut e.timestamps);
    }

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn entity_id_mut(&mut self) -> &mut EntityId {
        &mut self.id
    }
}

#[test]
fn test_own_declaration_overrides_inherited_declared_later() {
    let metadata = EntityMetadata::<Backfilled>::build().unwrap();

    assert_eq!(property_names(&metadata), vec!["id", "createdAt", "updatedAt"]);

    let created = metadata.property("createdAt").unwrap();
    assert_eq!(created.descriptor(), &PropertyDescriptor::datetime().nullable());

    let mut entity = Backfilled::default();
    entity.timestamps.created_at = Utc::now();
    assert_eq!(created.read(&entity).unwrap(), Value::Null);
}

// =============================================================================
// Lifecycle Hook Tests
// =============================================================================

#[test]
fn test_lifecycle_hooks_grouped_by_event() {
    let metadata = EntityMetadata::<Gadget>::build().unwrap();
    let hooks = metadata.lifecycle_hooks();

    assert_eq!(hooks.len(), 2);
    assert_eq!(
        hooks[&LifecycleEvent::BeforePersist],
        vec!["touchUpdatedAt", "recordPersist", "recordAny"]
    );
    assert_eq!(hooks[&LifecycleEvent::BeforeDelete], vec!["recordDelete", "recordAny"]);
}

#[test]
fn test_lifecycle_hooks_empty_lists_without_hooks() {
    let metadata = EntityMetadata::<Widget>::build().unwrap();
    let hooks = metadata.lifecycle_hooks();

    assert!(metadata.hooks().is_empty());
    assert_eq!(hooks.len(), 2);
    assert!(hooks.values().all(|names| names.is_empty()));
}

#[test]
fn test_run_hooks_only_runs_matching_event() {
    let metadata = EntityMetadata::<Gadget>::build().unwrap();
    let mut gadget = Gadget::new("g");

    metadata.run_hooks(&mut gadget, LifecycleEvent::BeforeDelete);
    assert_eq!(gadget.hook_log, vec!["recordDelete:beforeDelete", "recordAny:beforeDelete"]);
    assert!(gadget.timestamps.updated_at.is_none());

    gadget.hook_log.clear();
    metadata.run_hooks(&mut gadget, LifecycleEvent::BeforePersist);
    assert_eq!(gadget.hook_log, vec!["recordPersist:beforePersist", "recordAny:beforePersist"]);
    assert!(gadget.timestamps.updated_at.is_some());
}

#[test]
fn test_hook_events_deduplicated() {
    entity!(Repeated, "Repeated", |decl| {
        decl.on(
            "twice",
            &[LifecycleEvent::BeforeDelete, LifecycleEvent::BeforePersist, LifecycleEvent::BeforeDelete],
            |e, _| e.other.push('x'),
        );
    });

    let metadata = EntityMetadata::<Repeated>::build().unwrap();
    assert_eq!(
        metadata.hooks()[0].events(),
        &[LifecycleEvent::BeforePersist, LifecycleEvent::BeforeDelete]
    );

    let mut entity = Repeated::default();
    metadata.run_hooks(&mut entity, LifecycleEvent::BeforeDelete);
    assert_eq!(entity.other, "x");
}

// =============================================================================
// Declaration Error Tests
// =============================================================================

#[test]
fn test_property_without_descriptor_rejected() {
    entity!(NoDescriptor, "NoDescriptor", |decl| {
        decl.property("name").field(|e| &e.name, |e| &mut e.name);
    });

    let message = declaration_error::<NoDescriptor>();
    assert!(message.contains("no descriptor"), "{}", message);
}

#[test]
fn test_property_with_two_descriptors_rejected() {
    entity!(TwoDescriptors, "TwoDescriptors", |decl| {
        decl.property("name")
            .descriptor(PropertyDescriptor::string())
            .descriptor(PropertyDescriptor::string().unique())
            .field(|e| &e.name, |e| &mut e.name);
    });

    let message = declaration_error::<TwoDescriptors>();
    assert!(message.contains("2 descriptors"), "{}", message);
}

#[test]
fn test_property_without_accessor_rejected() {
    entity!(NoAccessor, "NoAccessor", |decl| {
        decl.property("name").descriptor(PropertyDescriptor::string());
    });

    let message = declaration_error::<NoAccessor>();
    assert!(message.contains("missing type information"), "{}", message);
}

#[test]
fn test_duplicate_own_property_rejected() {
    entity!(Duplicate, "Duplicate", |decl| {
        decl.property("name")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.name, |e| &mut e.name);
        decl.property("name")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.other, |e| &mut e.other);
    });

    let message = declaration_error::<Duplicate>();
    assert!(message.contains("more than once"), "{}", message);
}

#[test]
fn test_redeclared_id_rejected() {
    entity!(OwnId, "OwnId", |decl| {
        decl.property("id")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.name, |e| &mut e.name);
    });

    let message = declaration_error::<OwnId>();
    assert!(message.contains("implicit"), "{}", message);
}

#[test]
fn test_element_name_clash_rejected() {
    entity!(Clash, "Clash", |decl| {
        decl.property("lastName")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.name, |e| &mut e.name);
        decl.property("last_name")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.other, |e| &mut e.other);
    });

    let message = declaration_error::<Clash>();
    assert!(message.contains("<last_name>"), "{}", message);
}

#[test]
fn test_hook_without_events_rejected() {
    entity!(Unbound, "Unbound", |decl| {
        decl.on("noop", &[], |_, _| {});
    });

    let message = declaration_error::<Unbound>();
    assert!(message.contains("not bound to any event"), "{}", message);
}

#[test]
fn test_duplicate_hook_rejected() {
    entity!(TwoHooks, "TwoHooks", |decl| {
        decl.on("audit", &[LifecycleEvent::BeforePersist], |_, _| {});
        decl.on("audit", &[LifecycleEvent::BeforeDelete], |_, _| {});
    });

    let message = declaration_error::<TwoHooks>();
    assert!(message.contains("hook audit"), "{}", message);
}

// =============================================================================
// Caching Tests
// =============================================================================

#[test]
fn test_describe_caches_per_type() {
    let mut introspector = Introspector::new();
    assert!(introspector.is_empty());

    let first = introspector.describe::<Widget>().unwrap();
    let second = introspector.describe::<Widget>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(introspector.is_cached::<Widget>());
    assert!(!introspector.is_cached::<Gadget>());

    introspector.describe::<Gadget>().unwrap();
    assert_eq!(introspector.len(), 2);

    introspector.clear();
    assert!(introspector.is_empty());
    let third = introspector.describe::<Widget>().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn test_failed_description_not_cached() {
    entity!(Broken, "Broken", |decl| {
        decl.property("name").descriptor(PropertyDescriptor::string());
    });

    let mut introspector = Introspector::new();
    assert!(introspector.describe::<Broken>().is_err());
    assert!(!introspector.is_cached::<Broken>());
}

// =============================================================================
// Shape and Fingerprint Tests
// =============================================================================

#[test]
fn test_shape_file_names() {
    let metadata = EntityMetadata::<Gadget>::build().unwrap();
    let shape = metadata.shape();

    assert_eq!(shape.basename, "gadget");
    assert_eq!(shape.document_file_name(), "gadget.xml");
    assert_eq!(shape.schema_file_name(), "gadget.xsd");
    assert_eq!(shape.fields.len(), metadata.properties().len());
}

#[test]
fn test_shape_file_names_from_module_path() {
    entity!(Profile, "app::domain::UserProfile", |decl| {
        decl.property("name")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.name, |e| &mut e.name);
    });

    let metadata = EntityMetadata::<Profile>::build().unwrap();
    assert_eq!(metadata.shape().document_file_name(), "user_profile.xml");
}

#[test]
fn test_fingerprint_is_stable() {
    let first = EntityMetadata::<Widget>::build().unwrap();
    let second = EntityMetadata::<Widget>::build().unwrap();

    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.fingerprint().len(), 8);
    assert!(first.fingerprint().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_fingerprint_changes_with_definition() {
    entity!(WidgetAddedField, "Widget", |decl| {
        decl.property("name")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.name, |e| &mut e.name);
        decl.property("other")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.other, |e| &mut e.other);
    });
    entity!(WidgetNameOnly, "Widget", |decl| {
        decl.property("name")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.name, |e| &mut e.name);
    });
    entity!(WidgetUniqueName, "Widget", |decl| {
        decl.property("name")
            .descriptor(PropertyDescriptor::string().unique())
            .field(|e| &e.name, |e| &mut e.name);
    });

    let added = EntityMetadata::<WidgetAddedField>::build().unwrap();
    let name_only = EntityMetadata::<WidgetNameOnly>::build().unwrap();
    let unique = EntityMetadata::<WidgetUniqueName>::build().unwrap();

    assert_ne!(added.fingerprint(), name_only.fingerprint());
    assert_ne!(unique.fingerprint(), name_only.fingerprint());
    assert_eq!(added.shape().basename, name_only.shape().basename);
}
