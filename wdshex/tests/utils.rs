use std::fmt::Write;

use wdshex::{ParsedDocument, Properties, PropertyConstraint};

/// One line per property, document level first, so snapshots stay readable.
#[allow(unused)]
pub fn render(document: &ParsedDocument) -> String {
    let mut output = String::new();
    let mut section = |title: &str, properties: &Properties| {
        writeln!(output, "{title}").unwrap();
        for p in properties.iter() {
            write!(output, "  {} {} {}", p.id, p.cardinality, p.constraint).unwrap();
            if let Some(comment) = &p.schema_comment {
                write!(output, " # {comment}").unwrap();
            }
            if p.requires_source {
                write!(output, " [source]").unwrap();
            }
            writeln!(output).unwrap();
        }
    };

    section("(document)", &document.properties);
    for shape in document.shapes.values() {
        section(&format!("shape {}", shape.label), &shape.properties);
    }

    output
}

#[allow(unused)]
pub fn property<'d>(document: &'d ParsedDocument, id: &str) -> &'d PropertyConstraint {
    document
        .all_properties()
        .find(|p| p.id == id)
        .unwrap_or_else(|| panic!("{id} not found in:\n{}", render(document)))
}

#[allow(unused)]
pub fn ids(properties: &[PropertyConstraint]) -> Vec<&str> {
    properties.iter().map(|p| p.id.as_str()).collect()
}
