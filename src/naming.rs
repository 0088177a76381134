//! Naming conventions
//!
//! Maps entity type names to document file names and property names to
//! element names. Both directions of the storage layer go through here, so
//! criteria lookups and row writes agree on element names.

use convert_case::{Case, Casing};

/// Root wrapper element of every document
pub const ROOT_ELEMENT: &str = "data";

/// Element wrapping one stored entity
pub const ROW_ELEMENT: &str = "row";

/// Namespace of the `nil` marker attribute
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Qualified name of the `nil` marker attribute
pub const NIL_ATTRIBUTE: &str = "xsi:nil";

/// Element name for a property: `createdAt` -> `created_at`
pub fn element_name(property: &str) -> String {
    property.to_case(Case::Snake)
}

/// File base name (without extension) for an entity type.
///
/// Accepts a bare name (`UserProfile`) or a module path
/// (`app::domain::UserProfile`); only the last segment is used.
pub fn document_basename(entity_name: &str) -> String {
    let last = entity_name.rsplit("::").next().unwrap_or(entity_name);
    last.to_case(Case::Snake)
}

/// Data file name: `user_profile.xml`
pub fn document_file_name(entity_name: &str) -> String {
    format!("{}.xml", document_basename(entity_name))
}

/// Schema file name: `user_profile.xsd`
pub fn schema_file_name(entity_name: &str) -> String {
    format!("{}.xsd", document_basename(entity_name))
}
