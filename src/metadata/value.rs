//! Runtime values and types
//!
//! [`Value`] is the type-erased form in which property values travel between
//! entity fields and the converter. [`FieldValue`] ties a Rust field type to
//! its [`RuntimeType`] and to `Value`.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};

/// Type-erased property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value (only legal for nullable properties)
    Null,
    Boolean(bool),
    Integer(i64),
    String(String),
    /// Variant text of an enumerated string type
    Enum(String),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::DateTime(_) => "datetime",
        }
    }
}

/// Closed set of textual values an enumerated string type accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumType {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumType {
    pub fn contains(&self, text: &str) -> bool {
        self.variants.contains(&text)
    }
}

/// In-memory type of a property, without nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Boolean,
    Integer,
    String,
    Enum(EnumType),
    DateTime,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::Boolean => f.write_str("bool"),
            RuntimeKind::Integer => f.write_str("i64"),
            RuntimeKind::String => f.write_str("String"),
            RuntimeKind::Enum(enum_type) => f.write_str(enum_type.name),
            RuntimeKind::DateTime => f.write_str("DateTime<Utc>"),
        }
    }
}

/// In-memory type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeType {
    pub kind: RuntimeKind,
    pub nullable: bool,
}

impl RuntimeType {
    pub const fn required(kind: RuntimeKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub const fn optional(kind: RuntimeKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "Option<{}>", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// A Rust type that can back a persisted property
pub trait FieldValue: Sized {
    fn runtime_type() -> RuntimeType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, found: &Value) -> StoreError {
    StoreError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

impl FieldValue for bool {
    fn runtime_type() -> RuntimeType {
        RuntimeType::required(RuntimeKind::Boolean)
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl FieldValue for i64 {
    fn runtime_type() -> RuntimeType {
        RuntimeType::required(RuntimeKind::Integer)
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FieldValue for String {
    fn runtime_type() -> RuntimeType {
        RuntimeType::required(RuntimeKind::String)
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn runtime_type() -> RuntimeType {
        RuntimeType::required(RuntimeKind::DateTime)
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn runtime_type() -> RuntimeType {
        RuntimeType::optional(T::runtime_type().kind)
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Declare an enumerated string type usable as a property.
///
/// Each variant maps to the text stored for it. The generated enum derives
/// `Debug, Clone, Copy, PartialEq, Eq, Hash`; further attributes (for example
/// `#[derive(Default)]` together with `#[default]` on a variant) pass through.
///
/// ```ignore
/// storage_enum! {
///     pub enum Gender {
///         Male = "m",
///         Female = "f",
///     }
/// }
/// ```
#[macro_export]
macro_rules! storage_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Stored text of every variant, in declaration order
            pub const VARIANTS: &'static [&'static str] = &[$($text),+];

            /// Stored text of this variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            /// Variant stored as `text`, if any
            pub fn parse(text: &str) -> ::std::option::Option<Self> {
                match text {
                    $( $text => ::std::option::Option::Some($name::$variant), )+
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $crate::metadata::FieldValue for $name {
            fn runtime_type() -> $crate::metadata::RuntimeType {
                $crate::metadata::RuntimeType::required($crate::metadata::RuntimeKind::Enum(
                    $crate::metadata::EnumType {
                        name: stringify!($name),
                        variants: $name::VARIANTS,
                    },
                ))
            }

            fn to_value(&self) -> $crate::metadata::Value {
                $crate::metadata::Value::Enum(self.as_str().to_string())
            }

            fn from_value(value: $crate::metadata::Value) -> $crate::error::Result<Self> {
                match value {
                    $crate::metadata::Value::Enum(ref text)
                    | $crate::metadata::Value::String(ref text) => {
                        $name::parse(text).ok_or_else(|| $crate::error::StoreError::TypeMismatch {
                            expected: stringify!($name).to_string(),
                            found: format!("{:?}", text),
                        })
                    }
                    other => Err($crate::error::StoreError::TypeMismatch {
                        expected: stringify!($name).to_string(),
                        found: other.type_name().to_string(),
                    }),
                }
            }
        }
    };
}
