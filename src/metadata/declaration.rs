//! Ahead-of-time entity declarations
//!
//! Entities describe themselves through a [`Declaration`] instead of being
//! reflected at runtime. Shared field groups are embedded with
//! [`Declaration::inherit`], which places their properties in ancestor scope
//! so the entity may override them.

use std::sync::Arc;

use crate::error::Result;

use super::{FieldValue, LifecycleEvent, PropertyDescriptor, RuntimeType, Value};

/// Where a property declaration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Declared by an embedded group (or the implicit id)
    Inherited,
    /// Declared by the entity itself
    Own,
}

type ReadFn<E> = dyn Fn(&E) -> Result<Value> + Send + Sync;
type WriteFn<E> = dyn Fn(&mut E, Value) -> Result<()> + Send + Sync;
pub(crate) type HookFn<E> = dyn Fn(&mut E, LifecycleEvent) + Send + Sync;

/// Typed getter/setter pair for one property, erased to [`Value`]
pub struct Accessor<E> {
    runtime: RuntimeType,
    read: Box<ReadFn<E>>,
    write: Box<WriteFn<E>>,
}

impl<E: 'static> Accessor<E> {
    /// Accessor over a struct field of a [`FieldValue`] type
    pub fn field<T, G, M>(get: G, get_mut: M) -> Self
    where
        T: FieldValue + 'static,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        M: Fn(&mut E) -> &mut T + Send + Sync + 'static,
    {
        Self {
            runtime: T::runtime_type(),
            read: Box::new(move |entity: &E| Ok(get(entity).to_value())),
            write: Box::new(move |entity: &mut E, value: Value| {
                *get_mut(entity) = T::from_value(value)?;
                Ok(())
            }),
        }
    }

    /// Accessor with hand-written conversion, for values not stored in a plain field
    pub fn new<R, W>(runtime: RuntimeType, read: R, write: W) -> Self
    where
        R: Fn(&E) -> Result<Value> + Send + Sync + 'static,
        W: Fn(&mut E, Value) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            runtime,
            read: Box::new(read),
            write: Box::new(write),
        }
    }
}

impl<E> Accessor<E> {
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime
    }

    pub fn read(&self, entity: &E) -> Result<Value> {
        (self.read)(entity)
    }

    pub fn write(&self, entity: &mut E, value: Value) -> Result<()> {
        (self.write)(entity, value)
    }
}

/// One property as declared, before validation
pub struct PropertyDeclaration<E> {
    pub(crate) name: String,
    pub(crate) scope: Scope,
    pub(crate) descriptors: Vec<PropertyDescriptor>,
    pub(crate) accessor: Option<Accessor<E>>,
}

impl<E: 'static> PropertyDeclaration<E> {
    /// Attach the storage descriptor. Exactly one is required.
    pub fn descriptor(&mut self, descriptor: PropertyDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Bind the property to a struct field
    pub fn field<T, G, M>(&mut self, get: G, get_mut: M) -> &mut Self
    where
        T: FieldValue + 'static,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        M: Fn(&mut E) -> &mut T + Send + Sync + 'static,
    {
        self.accessor = Some(Accessor::field(get, get_mut));
        self
    }

    /// Bind the property to a custom accessor
    pub fn accessor(&mut self, accessor: Accessor<E>) -> &mut Self {
        self.accessor = Some(accessor);
        self
    }
}

pub(crate) struct HookDeclaration<E> {
    pub(crate) name: &'static str,
    pub(crate) events: Vec<LifecycleEvent>,
    pub(crate) callback: Arc<HookFn<E>>,
}

/// Collects the properties and lifecycle hooks of one entity type
pub struct Declaration<E> {
    entity: &'static str,
    scope: Scope,
    pub(crate) properties: Vec<PropertyDeclaration<E>>,
    pub(crate) hooks: Vec<HookDeclaration<E>>,
}

impl<E: 'static> Declaration<E> {
    pub(crate) fn new(entity: &'static str) -> Self {
        Self {
            entity,
            scope: Scope::Own,
            properties: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Name of the entity being declared
    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    /// Start declaring a persisted property
    pub fn property(&mut self, name: impl Into<String>) -> &mut PropertyDeclaration<E> {
        let index = self.properties.len();
        self.properties.push(PropertyDeclaration {
            name: name.into(),
            scope: self.scope,
            descriptors: Vec::new(),
            accessor: None,
        });
        &mut self.properties[index]
    }

    /// Run a shared group's declaration in ancestor scope.
    ///
    /// Properties declared inside are overridden by a declaration of the same
    /// name at the entity's own level, whether it comes before or after.
    pub fn inherit(&mut self, declare: impl FnOnce(&mut Self)) {
        let previous = self.scope;
        self.scope = Scope::Inherited;
        declare(self);
        self.scope = previous;
    }

    /// Bind a hook to one or more lifecycle events.
    ///
    /// Hooks run in declaration order, embedded groups first.
    pub fn on<F>(&mut self, name: &'static str, events: &[LifecycleEvent], hook: F)
    where
        F: Fn(&mut E, LifecycleEvent) + Send + Sync + 'static,
    {
        self.hooks.push(HookDeclaration {
            name,
            events: events.to_vec(),
            callback: Arc::new(hook),
        });
    }
}
