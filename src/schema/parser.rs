//! XML Schema parsing
//!
//! Reads back the subset of XML Schema the generator emits: top-level
//! element definitions with a field sequence, a root element referencing the
//! row element, and `xs:unique` constraints. Comments (including the
//! fingerprint trailer) are ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, StoreError};
use crate::metadata::StorageType;

use super::{FieldDefinition, Schema, UniqueConstraint};

#[derive(Default)]
struct ElementDefinition {
    name: String,
    fields: Vec<FieldDefinition>,
    row_ref: Option<String>,
}

/// Parse state while walking the schema document
#[derive(Default)]
struct SchemaBuilder {
    depth: usize,
    definitions: Vec<ElementDefinition>,
    open_definition: Option<ElementDefinition>,
    unique: Vec<UniqueConstraint>,
    open_unique: Option<UniqueConstraint>,
}

impl Schema {
    /// Parse schema text. `schema_name` only labels errors.
    pub fn parse(text: &str, schema_name: &str) -> Result<Schema> {
        let invalid = |message: String| StoreError::InvalidSchema {
            schema: schema_name.to_string(),
            message,
        };

        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut builder = SchemaBuilder::default();

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| invalid(format!("{} at byte {}", e, position)))?;

            match event {
                Event::Start(e) => {
                    builder.open(&e, false).map_err(invalid)?;
                    builder.depth += 1;
                }
                Event::Empty(e) => builder.open(&e, true).map_err(invalid)?,
                Event::End(e) => {
                    builder.depth = builder.depth.saturating_sub(1);
                    builder.close(e.local_name().as_ref());
                }
                Event::Eof => break,
                _ => {}
            }
        }

        builder.finish().map_err(invalid)
    }
}

impl SchemaBuilder {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> std::result::Result<(), String> {
        match e.local_name().as_ref() {
            b"element" if self.depth == 1 => {
                let name = required_attr(e, b"name")?;
                let definition = ElementDefinition {
                    name,
                    ..Default::default()
                };
                if empty {
                    self.definitions.push(definition);
                } else {
                    self.open_definition = Some(definition);
                }
            }
            b"element" if self.depth > 1 => {
                let Some(definition) = self.open_definition.as_mut() else {
                    return Ok(());
                };
                if let Some(row_ref) = attr(e, b"ref")? {
                    definition.row_ref = Some(local_part(&row_ref).to_string());
                    return Ok(());
                }
                let name = required_attr(e, b"name")?;
                let type_name = required_attr(e, b"type")?;
                let storage_type = StorageType::from_xsd_name(local_part(&type_name))
                    .ok_or_else(|| format!("element {} has unsupported type {}", name, type_name))?;
                let nillable = attr(e, b"nillable")?.as_deref() == Some("true");
                definition.fields.push(FieldDefinition {
                    name,
                    storage_type,
                    nillable,
                });
            }
            b"unique" => {
                let constraint = UniqueConstraint {
                    name: required_attr(e, b"name")?,
                    selector: String::new(),
                    field: String::new(),
                };
                if !empty {
                    self.open_unique = Some(constraint);
                }
            }
            b"selector" => {
                if let Some(constraint) = self.open_unique.as_mut() {
                    constraint.selector = required_attr(e, b"xpath")?;
                }
            }
            b"field" => {
                if let Some(constraint) = self.open_unique.as_mut() {
                    constraint.field = required_attr(e, b"xpath")?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, local_name: &[u8]) {
        match local_name {
            b"element" if self.depth == 1 => {
                if let Some(definition) = self.open_definition.take() {
                    self.definitions.push(definition);
                }
            }
            b"unique" => {
                if let Some(constraint) = self.open_unique.take() {
                    self.unique.push(constraint);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> std::result::Result<Schema, String> {
        let root = self
            .definitions
            .iter()
            .find(|d| d.row_ref.is_some())
            .ok_or_else(|| "no root element referencing a row element".to_string())?;
        let row = root.row_ref.clone().unwrap_or_default();

        let row_definition = self
            .definitions
            .iter()
            .find(|d| d.name == row)
            .ok_or_else(|| format!("row element {} is not defined", row))?;

        for constraint in &self.unique {
            if constraint.selector.is_empty() || constraint.field.is_empty() {
                return Err(format!("unique constraint {} is incomplete", constraint.name));
            }
            if !row_definition.fields.iter().any(|f| f.name == constraint.field) {
                return Err(format!(
                    "unique constraint {} refers to unknown field {}",
                    constraint.name, constraint.field
                ));
            }
        }

        Ok(Schema {
            root: root.name.clone(),
            row,
            fields: row_definition.fields.clone(),
            unique: self.unique,
        })
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> std::result::Result<Option<String>, String> {
    for attribute in e.attributes() {
        let attribute = attribute.map_err(|err| err.to_string())?;
        if attribute.key.local_name().as_ref() == name {
            let value = attribute.unescape_value().map_err(|err| err.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr(e: &BytesStart<'_>, name: &[u8]) -> std::result::Result<String, String> {
    attr(e, name)?.ok_or_else(|| {
        format!(
            "<{}> is missing attribute {}",
            String::from_utf8_lossy(e.name().as_ref()),
            String::from_utf8_lossy(name)
        )
    })
}

/// `xs:integer` -> `integer`
fn local_part(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}
