//! Metadata Introspector
//!
//! Turns an entity's [`Declaration`] into validated, cached [`EntityMetadata`].
//!
//! ## Responsibilities
//! - Prepend the implicit `id` property every entity inherits
//! - Resolve overrides of inherited properties
//! - Reject malformed declarations with `InvalidEntityDeclaration`
//! - Cache one metadata instance per entity type

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::naming;

use super::declaration::{HookFn, Scope};
use super::{
    Accessor, Declaration, Entity, EntityShape, FieldValue, LifecycleEvent, PropertyDescriptor,
    RuntimeKind, RuntimeType, ShapeField, Value,
};

/// Name of the identifier property every entity inherits
pub const ID_PROPERTY: &str = "id";

// =============================================================================
// Resolved metadata
// =============================================================================

/// One validated property of an entity
pub struct PropertyMetadata<E> {
    name: String,
    element: String,
    descriptor: PropertyDescriptor,
    accessor: Accessor<E>,
}

impl<E> PropertyMetadata<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element name in documents
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.accessor.runtime_type()
    }

    /// Read the property value out of an entity
    pub fn read(&self, entity: &E) -> Result<Value> {
        self.accessor.read(entity)
    }

    /// Write a property value into an entity
    pub fn write(&self, entity: &mut E, value: Value) -> Result<()> {
        self.accessor.write(entity, value)
    }
}

/// A named hook bound to one or more lifecycle events
pub struct LifecycleHook<E> {
    name: &'static str,
    events: Vec<LifecycleEvent>,
    callback: Arc<HookFn<E>>,
}

impl<E> LifecycleHook<E> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    pub fn handles(&self, event: LifecycleEvent) -> bool {
        self.events.contains(&event)
    }
}

/// Validated description of one entity type
pub struct EntityMetadata<E> {
    name: &'static str,
    properties: Vec<PropertyMetadata<E>>,
    hooks: Vec<LifecycleHook<E>>,
    shape: EntityShape,
}

impl<E: Entity> EntityMetadata<E> {
    /// Collect and validate the declaration of `E`
    pub fn build() -> Result<Self> {
        let mut decl = Declaration::new(E::NAME);
        decl.inherit(declare_id::<E>);
        E::declare(&mut decl);

        let properties = resolve_properties(E::NAME, decl.properties)?;
        let hooks = resolve_hooks(E::NAME, decl.hooks)?;

        let fields = properties
            .iter()
            .map(|p| ShapeField {
                property: p.name.clone(),
                element: p.element.clone(),
                descriptor: p.descriptor,
            })
            .collect();
        let shape = EntityShape::new(E::NAME, fields);

        debug!(
            entity = E::NAME,
            properties = properties.len(),
            hooks = hooks.len(),
            fingerprint = %shape.fingerprint,
            "Described entity"
        );

        Ok(Self {
            name: E::NAME,
            properties,
            hooks,
            shape,
        })
    }
}

impl<E> EntityMetadata<E> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Persisted properties in declaration order, `id` first
    pub fn properties(&self) -> &[PropertyMetadata<E>] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMetadata<E>> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Property stored under the given element name
    pub fn property_by_element(&self, element: &str) -> Option<&PropertyMetadata<E>> {
        self.properties.iter().find(|p| p.element == element)
    }

    pub fn hooks(&self) -> &[LifecycleHook<E>] {
        &self.hooks
    }

    /// Hook names per event kind, in declaration order.
    ///
    /// Every event kind is present, with an empty list when nothing is bound.
    pub fn lifecycle_hooks(&self) -> BTreeMap<LifecycleEvent, Vec<&'static str>> {
        LifecycleEvent::ALL
            .iter()
            .map(|event| {
                let names = self
                    .hooks
                    .iter()
                    .filter(|h| h.handles(*event))
                    .map(|h| h.name)
                    .collect();
                (*event, names)
            })
            .collect()
    }

    /// Invoke the hooks bound to `event`, in declaration order
    pub fn run_hooks(&self, entity: &mut E, event: LifecycleEvent) {
        for hook in self.hooks.iter().filter(|h| h.handles(event)) {
            debug!(entity = self.name, hook = hook.name, %event, "Running lifecycle hook");
            (hook.callback)(entity, event);
        }
    }

    pub fn shape(&self) -> &EntityShape {
        &self.shape
    }

    pub fn fingerprint(&self) -> &str {
        &self.shape.fingerprint
    }
}

// =============================================================================
// Declaration resolution
// =============================================================================

fn declare_id<E: Entity>(decl: &mut Declaration<E>) {
    decl.property(ID_PROPERTY)
        .descriptor(PropertyDescriptor::integer().unique())
        .accessor(Accessor::new(
            RuntimeType::required(RuntimeKind::Integer),
            |entity: &E| {
                entity
                    .entity_id()
                    .get()
                    .map(Value::Integer)
                    .ok_or_else(|| StoreError::IdNotAssigned {
                        entity: E::NAME.to_string(),
                    })
            },
            |entity: &mut E, value: Value| {
                let id = i64::from_value(value)?;
                entity.entity_id_mut().assign(E::NAME, id)
            },
        ));
}

fn resolve_properties<E>(
    entity: &str,
    declared: Vec<super::PropertyDeclaration<E>>,
) -> Result<Vec<PropertyMetadata<E>>> {
    let mut resolved: Vec<(Scope, PropertyMetadata<E>)> = Vec::with_capacity(declared.len());

    for decl in declared {
        if decl.name.is_empty() {
            return Err(StoreError::declaration(entity, "property with an empty name"));
        }

        let descriptor = match decl.descriptors.as_slice() {
            [descriptor] => *descriptor,
            [] => {
                return Err(StoreError::declaration(
                    entity,
                    format!("property {} has no descriptor", decl.name),
                ))
            }
            many => {
                return Err(StoreError::declaration(
                    entity,
                    format!(
                        "property {} has {} descriptors, exactly one is allowed",
                        decl.name,
                        many.len()
                    ),
                ))
            }
        };

        let accessor = decl.accessor.ok_or_else(|| {
            StoreError::declaration(
                entity,
                format!("property {} is missing type information (no field accessor)", decl.name),
            )
        })?;

        let property = PropertyMetadata {
            element: naming::element_name(&decl.name),
            name: decl.name,
            descriptor,
            accessor,
        };

        if let Some(index) = resolved.iter().position(|(_, p)| p.name == property.name) {
            let scope = resolved[index].0;
            if property.name == ID_PROPERTY {
                return Err(StoreError::declaration(
                    entity,
                    "property id is implicit and cannot be redeclared",
                ));
            }
            match (scope, decl.scope) {
                (Scope::Inherited, Scope::Own) => {
                    resolved[index] = (Scope::Own, property);
                    continue;
                }
                (Scope::Own, Scope::Inherited) => continue,
                _ => {}
            }
            return Err(StoreError::declaration(
                entity,
                format!("property {} is declared more than once", property.name),
            ));
        }

        if let Some((_, other)) = resolved.iter().find(|(_, p)| p.element == property.element) {
            return Err(StoreError::declaration(
                entity,
                format!(
                    "properties {} and {} both map to element <{}>",
                    other.name, property.name, property.element
                ),
            ));
        }

        resolved.push((decl.scope, property));
    }

    Ok(resolved.into_iter().map(|(_, p)| p).collect())
}

fn resolve_hooks<E>(
    entity: &str,
    declared: Vec<super::declaration::HookDeclaration<E>>,
) -> Result<Vec<LifecycleHook<E>>> {
    let mut hooks: Vec<LifecycleHook<E>> = Vec::with_capacity(declared.len());

    for decl in declared {
        if decl.events.is_empty() {
            return Err(StoreError::declaration(
                entity,
                format!("hook {} is not bound to any event", decl.name),
            ));
        }
        if hooks.iter().any(|h| h.name == decl.name) {
            return Err(StoreError::declaration(
                entity,
                format!("hook {} is declared more than once", decl.name),
            ));
        }
        let mut events = decl.events;
        events.sort();
        events.dedup();
        hooks.push(LifecycleHook {
            name: decl.name,
            events,
            callback: decl.callback,
        });
    }

    Ok(hooks)
}

// =============================================================================
// Introspector
// =============================================================================

/// Per-session cache of entity metadata
#[derive(Default)]
pub struct Introspector {
    cache: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Introspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata of `E`, built on first request and cached afterwards
    pub fn describe<E: Entity>(&mut self) -> Result<Arc<EntityMetadata<E>>> {
        let key = TypeId::of::<E>();
        if let Some(cached) = self.cache.get(&key) {
            if let Ok(metadata) = Arc::clone(cached).downcast::<EntityMetadata<E>>() {
                return Ok(metadata);
            }
        }

        let metadata = Arc::new(EntityMetadata::<E>::build()?);
        let erased: Arc<dyn Any + Send + Sync> = metadata.clone();
        self.cache.insert(key, erased);
        Ok(metadata)
    }

    pub fn is_cached<E: Entity>(&self) -> bool {
        self.cache.contains_key(&TypeId::of::<E>())
    }

    /// Number of cached entity types
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
