//! In-memory document model
//!
//! A document is a root wrapper element holding row elements, each of which
//! holds one text-only field element per persisted property:
//!
//! ```text
//! <data xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
//!   <row>
//!     <id>1</id>
//!     <name>A</name>
//!     <age xsi:nil="true"/>
//!   </row>
//! </data>
//! ```
//!
//! Parsing only checks well-formedness and this three-level nesting; field
//! names, order and values are checked by validation against the schema.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, StoreError};
use crate::metadata::ID_PROPERTY;
use crate::naming;

/// One field element of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    /// Marked absent with `xsi:nil="true"`
    pub nil: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            nil: false,
        }
    }

    pub fn nil(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            nil: true,
        }
    }
}

/// One stored entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Row {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            name: naming::ROW_ELEMENT.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Text of a non-nil field
    pub fn value(&self, name: &str) -> Option<&str> {
        self.field(name).filter(|f| !f.nil).map(|f| f.value.as_str())
    }

    /// Integer id of the row, if present and well-formed
    pub fn id(&self) -> Option<i64> {
        self.value(ID_PROPERTY)?.trim().parse().ok()
    }
}

/// A whole entity document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: String,
    pub rows: Vec<Row>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// Document with an empty root wrapper
    pub fn empty() -> Self {
        Self {
            root: naming::ROOT_ELEMENT.to_string(),
            rows: Vec::new(),
        }
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    /// Parse document text. `document_name` only labels errors.
    pub fn parse(text: &str, document_name: &str) -> Result<Document> {
        let malformed = |message: String| StoreError::MalformedDocument {
            document: document_name.to_string(),
            message,
        };

        let mut reader = Reader::from_str(text);
        reader.trim_text(false);

        let mut root: Option<String> = None;
        let mut root_closed = false;
        let mut rows: Vec<Row> = Vec::new();
        let mut open_row: Option<Row> = None;
        let mut open_field: Option<Field> = None;

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| malformed(format!("{} at byte {}", e, position)))?;

            match event {
                Event::Start(e) | Event::Empty(e) if root_closed => {
                    return Err(malformed(format!(
                        "element <{}> after the root element",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                Event::Start(e) => {
                    let name = element_name(&e).map_err(malformed)?;
                    if root.is_none() {
                        root = Some(name);
                    } else if open_field.is_some() {
                        return Err(malformed(format!("field element contains nested element <{}>", name)));
                    } else if open_row.is_some() {
                        open_field = Some(Field {
                            name,
                            value: String::new(),
                            nil: is_nil(&e)?,
                        });
                    } else {
                        open_row = Some(Row {
                            name,
                            fields: Vec::new(),
                        });
                    }
                }
                Event::Empty(e) => {
                    let name = element_name(&e).map_err(malformed)?;
                    if root.is_none() {
                        root = Some(name);
                        root_closed = true;
                    } else if open_field.is_some() {
                        return Err(malformed(format!("field element contains nested element <{}>", name)));
                    } else if let Some(row) = open_row.as_mut() {
                        row.fields.push(Field {
                            name,
                            value: String::new(),
                            nil: is_nil(&e)?,
                        });
                    } else {
                        rows.push(Row {
                            name,
                            fields: Vec::new(),
                        });
                    }
                }
                Event::End(_) => {
                    if let Some(field) = open_field.take() {
                        if let Some(row) = open_row.as_mut() {
                            row.fields.push(field);
                        }
                    } else if let Some(row) = open_row.take() {
                        rows.push(row);
                    } else {
                        root_closed = true;
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    match open_field.as_mut() {
                        Some(field) => field.value.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => return Err(malformed(format!("unexpected text {:?} outside a field", text.trim()))),
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    match open_field.as_mut() {
                        Some(field) => field.value.push_str(&text),
                        None => return Err(malformed("unexpected CDATA outside a field".to_string())),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        match root {
            Some(root) if root_closed => Ok(Document { root, rows }),
            Some(root) => Err(malformed(format!("root element <{}> is not closed", root))),
            None => Err(malformed("no root element".to_string())),
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Serialize with the given indentation width
    pub fn render(&self, indent_width: usize) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', indent_width);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new(self.root.as_str());
        root.push_attribute(("xmlns:xsi", naming::XSI_NAMESPACE));
        writer.write_event(Event::Start(root))?;

        for row in &self.rows {
            writer.write_event(Event::Start(BytesStart::new(row.name.as_str())))?;
            for field in &row.fields {
                let mut element = BytesStart::new(field.name.as_str());
                if field.nil {
                    element.push_attribute((naming::NIL_ATTRIBUTE, "true"));
                    writer.write_event(Event::Empty(element))?;
                } else if field.value.is_empty() {
                    writer.write_event(Event::Empty(element))?;
                } else {
                    writer.write_event(Event::Start(element))?;
                    writer.write_event(Event::Text(BytesText::new(&field.value)))?;
                    writer.write_event(Event::End(BytesEnd::new(field.name.as_str())))?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new(row.name.as_str())))?;
        }

        writer.write_event(Event::End(BytesEnd::new(self.root.as_str())))?;

        let mut text = String::from_utf8(writer.into_inner()).map_err(|e| StoreError::MalformedDocument {
            document: self.root.clone(),
            message: e.to_string(),
        })?;
        text.push('\n');
        Ok(text)
    }
}

fn element_name(e: &BytesStart<'_>) -> std::result::Result<String, String> {
    std::str::from_utf8(e.name().as_ref())
        .map(str::to_string)
        .map_err(|err| format!("element name is not UTF-8: {}", err))
}

fn is_nil(e: &BytesStart<'_>) -> Result<bool> {
    for attribute in e.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        if attribute.key.local_name().as_ref() == b"nil" {
            let value = attribute.unescape_value()?;
            return Ok(matches!(value.trim(), "true" | "1"));
        }
    }
    Ok(false)
}
