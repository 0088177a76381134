//! Document validation against a parsed schema
//!
//! Collects every violation instead of stopping at the first one, so a
//! broken document can be fixed in a single pass.

use std::collections::HashMap;
use std::fmt;

use crate::convert::{parse_boolean, parse_datetime};
use crate::metadata::StorageType;
use crate::schema::{FieldDefinition, Schema};

use super::{Document, Field};

/// One structural or lexical problem in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// 1-based row position, None for document-level problems
    pub row: Option<usize>,
    pub message: String,
}

impl Violation {
    fn document(message: String) -> Self {
        Self { row: None, message }
    }

    fn row(index: usize, message: String) -> Self {
        Self {
            row: Some(index + 1),
            message,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: {}", row, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Check `document` against `schema`, returning every violation found
pub fn validate_document(document: &Document, schema: &Schema) -> Vec<Violation> {
    let mut violations = Vec::new();

    if document.root != schema.root {
        violations.push(Violation::document(format!(
            "root element is <{}>, expected <{}>",
            document.root, schema.root
        )));
    }

    for (index, row) in document.rows.iter().enumerate() {
        if row.name != schema.row {
            violations.push(Violation::row(
                index,
                format!("element <{}> is not a <{}> element", row.name, schema.row),
            ));
            continue;
        }
        validate_fields(index, &row.fields, schema, &mut violations);
    }

    validate_unique(document, schema, &mut violations);

    violations
}

fn validate_fields(index: usize, fields: &[Field], schema: &Schema, violations: &mut Vec<Violation>) {
    let mut seen = vec![false; schema.fields.len()];
    let mut expected = 0;

    for field in fields {
        let Some(position) = schema.position(&field.name) else {
            violations.push(Violation::row(index, format!("unexpected element <{}>", field.name)));
            continue;
        };

        if seen[position] {
            violations.push(Violation::row(index, format!("duplicate element <{}>", field.name)));
            continue;
        }
        seen[position] = true;

        if position < expected {
            violations.push(Violation::row(index, format!("element <{}> is out of order", field.name)));
        } else {
            expected = position + 1;
        }

        if let Some(message) = check_value(field, &schema.fields[position]) {
            violations.push(Violation::row(index, message));
        }
    }

    for (definition, present) in schema.fields.iter().zip(seen) {
        if !present {
            violations.push(Violation::row(index, format!("missing element <{}>", definition.name)));
        }
    }
}

fn check_value(field: &Field, definition: &FieldDefinition) -> Option<String> {
    if field.nil {
        if !definition.nillable {
            return Some(format!("element <{}> is nil but not nillable", field.name));
        }
        if !field.value.is_empty() {
            return Some(format!("nil element <{}> must be empty", field.name));
        }
        return None;
    }

    let valid = match definition.storage_type {
        StorageType::String => true,
        StorageType::Boolean => parse_boolean(&field.value).is_some(),
        StorageType::Integer => field.value.trim().parse::<i64>().is_ok(),
        StorageType::DateTime => parse_datetime(&field.value).is_some(),
    };

    (!valid).then(|| {
        format!(
            "value {:?} of element <{}> is not a valid {}",
            field.value, field.name, definition.storage_type
        )
    })
}

/// Append a violation for every row repeating a value of a unique field
pub(crate) fn validate_unique(document: &Document, schema: &Schema, violations: &mut Vec<Violation>) {
    for constraint in &schema.unique {
        let mut first_seen: HashMap<&str, usize> = HashMap::new();

        for (index, row) in document.rows.iter().enumerate() {
            if row.name != constraint.selector {
                continue;
            }
            let Some(value) = row.value(&constraint.field) else {
                continue;
            };
            let key = value.trim();
            match first_seen.get(key) {
                Some(first) => violations.push(Violation::row(
                    index,
                    format!(
                        "duplicate value {:?} for unique constraint {} (first used in row {})",
                        key,
                        constraint.name,
                        first + 1
                    ),
                )),
                None => {
                    first_seen.insert(key, index);
                }
            }
        }
    }
}
