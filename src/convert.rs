//! Type Converter
//!
//! Stateless conversion between the textual storage form of a property and
//! its typed [`Value`].
//!
//! ## Responsibilities
//! - Enforce that descriptor and runtime type agree on nullability
//! - Restrict conversions to the legal storage/runtime type pairs
//! - Parse and format booleans, integers, strings, enums and datetimes
//!
//! ## Textual forms
//! ```text
//! boolean   true | false        (1 and 0 are accepted on read)
//! integer   -42                 (surrounding whitespace accepted on read)
//! string    verbatim
//! datetime  2024-05-01T10:00:00+00:00   (RFC 3339, sub-seconds kept)
//! ```
//!
//! The empty string is the "no value" sentinel of nullable properties. The
//! storage layer additionally carries an explicit nil flag, handled by
//! [`TypeConverter::decode_field`] and [`TypeConverter::encode_field`].

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::metadata::{PropertyDescriptor, RuntimeKind, RuntimeType, StorageType, Value};

/// Converter between stored text and typed values
pub struct TypeConverter;

impl TypeConverter {
    /// Whether a storage type may back a runtime kind
    pub fn is_supported(storage_type: StorageType, kind: &RuntimeKind) -> bool {
        matches!(
            (storage_type, kind),
            (StorageType::Boolean, RuntimeKind::Boolean)
                | (StorageType::Integer, RuntimeKind::Integer)
                | (StorageType::String, RuntimeKind::String)
                | (StorageType::String, RuntimeKind::Enum(_))
                | (StorageType::DateTime, RuntimeKind::DateTime)
        )
    }

    /// Decode stored text into a typed value.
    ///
    /// Empty text is absence for nullable properties. Text that fails to parse
    /// is an error for non-nullable properties and absence otherwise.
    pub fn to_typed(raw: &str, descriptor: &PropertyDescriptor, runtime: RuntimeType) -> Result<Value> {
        Self::check(descriptor, runtime)?;

        if raw.is_empty() && runtime.nullable {
            return Ok(Value::Null);
        }

        match Self::parse(raw, &runtime.kind) {
            Some(value) => Ok(value),
            None if runtime.nullable => {
                warn!(
                    raw,
                    storage = %descriptor.storage_type,
                    runtime = %runtime,
                    "Unparseable stored value on nullable property, treating as absent"
                );
                Ok(Value::Null)
            }
            None => Err(Self::conversion_error(raw, descriptor, runtime)),
        }
    }

    /// Encode a typed value into stored text.
    ///
    /// Absence on a nullable property yields the empty string.
    pub fn to_raw(value: &Value, descriptor: &PropertyDescriptor, runtime: RuntimeType) -> Result<String> {
        Self::check(descriptor, runtime)?;

        match (value, &runtime.kind) {
            (Value::Null, _) if runtime.nullable => Ok(String::new()),
            (Value::Null, _) => Err(Self::conversion_error("null", descriptor, runtime)),
            (Value::Boolean(b), RuntimeKind::Boolean) => Ok(if *b { "true" } else { "false" }.to_string()),
            (Value::Integer(i), RuntimeKind::Integer) => Ok(i.to_string()),
            (Value::String(s), RuntimeKind::String) => Ok(s.clone()),
            (Value::Enum(text), RuntimeKind::Enum(enum_type)) => {
                if enum_type.contains(text) {
                    Ok(text.clone())
                } else {
                    Err(Self::conversion_error(text, descriptor, runtime))
                }
            }
            (Value::DateTime(dt), RuntimeKind::DateTime) => Ok(format_datetime(dt)),
            (other, kind) => Err(StoreError::TypeMismatch {
                expected: kind.to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Decode a stored field, honoring its nil flag.
    ///
    /// A nil field is absence. A non-nil empty string on a string property is
    /// an empty string, not absence.
    pub fn decode_field(
        raw: &str,
        nil: bool,
        descriptor: &PropertyDescriptor,
        runtime: RuntimeType,
    ) -> Result<Value> {
        Self::check(descriptor, runtime)?;

        if nil {
            return if runtime.nullable {
                Ok(Value::Null)
            } else {
                Err(Self::conversion_error("", descriptor, runtime))
            };
        }
        if raw.is_empty() && runtime.kind == RuntimeKind::String {
            return Ok(Value::String(String::new()));
        }
        Self::to_typed(raw, descriptor, runtime)
    }

    /// Encode a value into stored text and its nil flag
    pub fn encode_field(
        value: &Value,
        descriptor: &PropertyDescriptor,
        runtime: RuntimeType,
    ) -> Result<(String, bool)> {
        let raw = Self::to_raw(value, descriptor, runtime)?;
        Ok((raw, value.is_null()))
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn check(descriptor: &PropertyDescriptor, runtime: RuntimeType) -> Result<()> {
        if descriptor.nullable != runtime.nullable {
            return Err(StoreError::NullabilityMismatch {
                declared: descriptor.nullable,
                runtime: runtime.nullable,
            });
        }
        if !Self::is_supported(descriptor.storage_type, &runtime.kind) {
            return Err(StoreError::UnsupportedConversion {
                storage: descriptor.storage_type.to_string(),
                runtime: runtime.to_string(),
            });
        }
        Ok(())
    }

    fn parse(raw: &str, kind: &RuntimeKind) -> Option<Value> {
        match kind {
            RuntimeKind::Boolean => parse_boolean(raw).map(Value::Boolean),
            RuntimeKind::Integer => raw.trim().parse::<i64>().ok().map(Value::Integer),
            RuntimeKind::String => Some(Value::String(raw.to_string())),
            RuntimeKind::Enum(enum_type) => enum_type
                .contains(raw)
                .then(|| Value::Enum(raw.to_string())),
            RuntimeKind::DateTime => parse_datetime(raw).map(Value::DateTime),
        }
    }

    fn conversion_error(raw: &str, descriptor: &PropertyDescriptor, runtime: RuntimeType) -> StoreError {
        StoreError::Conversion {
            raw: raw.to_string(),
            storage: descriptor.storage_type.to_string(),
            runtime: runtime.to_string(),
        }
    }
}

/// xs:boolean lexical forms
pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// RFC 3339 datetime, normalised to UTC
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// RFC 3339 with a numeric `+00:00` offset
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
