//! XML Schema rendering

use std::fmt::Write as _;

use super::Schema;

const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

impl Schema {
    /// Render as an XML Schema document (without fingerprint trailer)
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(out, r#"<xs:schema xmlns:xs="{}">"#, XS_NAMESPACE)?;
        writeln!(out)?;

        writeln!(out, "  <!-- Define complex type for the {} element -->", self.row)?;
        writeln!(out, r#"  <xs:element name="{}">"#, self.row)?;
        writeln!(out, "    <xs:complexType>")?;
        writeln!(out, "      <xs:sequence>")?;
        for field in &self.fields {
            writeln!(
                out,
                r#"        <xs:element name="{}" type="xs:{}"{}/>"#,
                field.name,
                field.storage_type.xsd_name(),
                if field.nillable { r#" nillable="true""# } else { "" }
            )?;
        }
        writeln!(out, "      </xs:sequence>")?;
        writeln!(out, "    </xs:complexType>")?;
        writeln!(out, "  </xs:element>")?;
        writeln!(out)?;

        writeln!(out, "  <!-- Define complex type for the {} element -->", self.root)?;
        writeln!(out, r#"  <xs:element name="{}">"#, self.root)?;
        writeln!(out, "    <xs:complexType>")?;
        writeln!(out, "      <xs:sequence>")?;
        writeln!(
            out,
            r#"        <xs:element ref="{}" minOccurs="0" maxOccurs="unbounded"/>"#,
            self.row
        )?;
        writeln!(out, "      </xs:sequence>")?;
        writeln!(out, "    </xs:complexType>")?;
        for constraint in &self.unique {
            writeln!(out, r#"    <xs:unique name="{}">"#, constraint.name)?;
            writeln!(out, r#"      <xs:selector xpath="{}"/>"#, constraint.selector)?;
            writeln!(out, r#"      <xs:field xpath="{}"/>"#, constraint.field)?;
            writeln!(out, "    </xs:unique>")?;
        }
        writeln!(out, "  </xs:element>")?;
        writeln!(out)?;

        writeln!(out, "</xs:schema>")
    }
}
