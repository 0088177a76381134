//! Property descriptors
//!
//! Static, per-property storage metadata declared once at the type level.

use std::fmt;

/// Storage-layer type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageType {
    Boolean,
    Integer,
    String,
    DateTime,
}

impl StorageType {
    /// XML Schema built-in type name (without the `xs:` prefix)
    pub fn xsd_name(&self) -> &'static str {
        match self {
            StorageType::Boolean => "boolean",
            StorageType::Integer => "integer",
            StorageType::String => "string",
            StorageType::DateTime => "dateTime",
        }
    }

    /// Inverse of [`StorageType::xsd_name`]; accepts an optional `xs:` prefix
    pub fn from_xsd_name(name: &str) -> Option<Self> {
        match name.strip_prefix("xs:").unwrap_or(name) {
            "boolean" => Some(StorageType::Boolean),
            "integer" => Some(StorageType::Integer),
            "string" => Some(StorageType::String),
            "dateTime" => Some(StorageType::DateTime),
            _ => None,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xsd_name())
    }
}

/// Declared storage type, nullability and uniqueness of one property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyDescriptor {
    pub storage_type: StorageType,
    pub nullable: bool,
    pub unique: bool,
}

impl PropertyDescriptor {
    /// Non-nullable, non-unique descriptor of the given type
    pub const fn new(storage_type: StorageType) -> Self {
        Self {
            storage_type,
            nullable: false,
            unique: false,
        }
    }

    pub const fn boolean() -> Self {
        Self::new(StorageType::Boolean)
    }

    pub const fn integer() -> Self {
        Self::new(StorageType::Integer)
    }

    pub const fn string() -> Self {
        Self::new(StorageType::String)
    }

    pub const fn datetime() -> Self {
        Self::new(StorageType::DateTime)
    }

    /// Mark the property as nullable
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the property as unique across rows
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}
