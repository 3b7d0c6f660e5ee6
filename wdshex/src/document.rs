//! The result of parsing an Entity Schema.

use indexmap::IndexMap;
use oxrdf::NamedNode;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::cardinality::Cardinality;
use crate::constraint::ValueConstraint;

/// One Wikidata property declaration, e.g. `wdt:P31 @<human> ; # instance of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyConstraint {
    /// `P31`
    pub id: String,
    /// Always in the `wdt:` namespace, whatever alias the schema used.
    #[serde(serialize_with = "serialize_named_node")]
    pub predicate: NamedNode,
    /// The constraint expression exactly as written.
    pub constraint: String,
    pub value_constraints: Vec<ValueConstraint>,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_comment: Option<String>,
    pub requires_source: bool,
}

impl PropertyConstraint {
    pub fn is_required(&self) -> bool {
        self.cardinality.is_required()
    }

    /// The property's page on Wikidata.
    pub fn wikidata_url(&self) -> String {
        wikidata_url(&self.id)
    }
}

pub(crate) fn wikidata_url(id: &str) -> String {
    format!("https://www.wikidata.org/wiki/Property:{id}")
}

fn serialize_named_node<S: Serializer>(node: &NamedNode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(node.as_str())
}

/// Properties of one scope, split by whether they must be present.
///
/// An id occurs at most once across both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Properties {
    pub required: Vec<PropertyConstraint>,
    pub optional: Vec<PropertyConstraint>,
}

impl Properties {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }

    pub fn len(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    /// Required properties first, then optional ones, each in source order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyConstraint> {
        self.required.iter().chain(&self.optional)
    }

    pub fn get(&self, id: &str) -> Option<&PropertyConstraint> {
        self.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Adds `property` unless its id is already present; the first declaration wins.
    pub fn insert(&mut self, property: PropertyConstraint) -> bool {
        if self.contains(&property.id) {
            return false;
        }

        if property.is_required() {
            self.required.push(property);
        } else {
            self.optional.push(property);
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeDefinition {
    pub label: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedDocument {
    /// Prefixes declared by the schema itself; built-ins are not repeated here.
    pub prefixes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// The label named by `start = @<label>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    pub shapes: IndexMap<String, ShapeDefinition>,
    /// Declarations outside of any shape.
    pub properties: Properties,
}

impl ParsedDocument {
    /// True when no Wikidata property was found anywhere.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.shapes.values().all(|s| s.properties.is_empty())
    }

    pub fn shape(&self, label: &str) -> Option<&ShapeDefinition> {
        self.shapes.get(label)
    }

    /// The shape named by `start`, if it was also defined.
    pub fn start_shape(&self) -> Option<&ShapeDefinition> {
        self.start.as_deref().and_then(|label| self.shape(label))
    }

    /// Every declaration: document level first, then each shape in declaration order.
    pub fn all_properties(&self) -> impl Iterator<Item = &PropertyConstraint> {
        self.properties
            .iter()
            .chain(self.shapes.values().flat_map(|s| s.properties.iter()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Scope {
    Document,
    Shape(String),
}

/// Accumulates declarations as the parser finds them.
#[derive(Default)]
pub(crate) struct DocumentBuilder {
    document: ParsedDocument,
}

impl DocumentBuilder {
    /// Registers a shape; a label seen before keeps its existing properties.
    pub fn open_shape(&mut self, label: &str) {
        if self.document.shapes.contains_key(label) {
            debug!(%label, "shape declared again, merging");
            return;
        }

        self.document.shapes.insert(
            label.to_string(),
            ShapeDefinition {
                label: label.to_string(),
                properties: Properties::default(),
            },
        );
    }

    pub fn add(&mut self, scope: &Scope, property: PropertyConstraint) {
        let properties = match scope {
            Scope::Document => &mut self.document.properties,
            Scope::Shape(label) => {
                &mut self
                    .document
                    .shapes
                    .entry(label.clone())
                    .or_insert_with(|| ShapeDefinition {
                        label: label.clone(),
                        properties: Properties::default(),
                    })
                    .properties
            }
        };

        let id = property.id.clone();
        if !properties.insert(property) {
            debug!(%id, ?scope, "duplicate property declaration dropped");
        }
    }

    pub fn set_base(&mut self, base: String) {
        self.document.base = Some(base);
    }

    pub fn set_start(&mut self, label: String) {
        self.document.start = Some(label);
    }

    pub fn finish(mut self, prefixes: IndexMap<String, String>) -> ParsedDocument {
        self.document.prefixes = prefixes;
        self.document
    }
}
