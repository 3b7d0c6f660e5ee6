//! Prefix handling: the built-in Wikidata prefixes, plus whatever the schema
//! declares with `PREFIX`.

use std::sync::OnceLock;

use curie::{Curie, InvalidPrefixError, PrefixMapping};
use indexmap::IndexMap;

/// Namespace of Wikidata "direct" (truthy) property predicates, i.e. `wdt:`.
pub const WIKIDATA_DIRECT_PROPERTY: &str = "http://www.wikidata.org/prop/direct/";

/// Namespace of Wikidata items and properties, i.e. `wd:`.
pub const WIKIDATA_ENTITY: &str = "http://www.wikidata.org/entity/";

pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Prefixes that every Wikidata Entity Schema may use without declaring them.
pub const WIKIDATA_PREFIXES: &[(&str, &str)] = &[
    ("wd", WIKIDATA_ENTITY),
    ("wds", "http://www.wikidata.org/entity/statement/"),
    ("wdv", "http://www.wikidata.org/value/"),
    ("wdref", "http://www.wikidata.org/reference/"),
    ("wdt", WIKIDATA_DIRECT_PROPERTY),
    ("wdtn", "http://www.wikidata.org/prop/direct-normalized/"),
    ("wdno", "http://www.wikidata.org/prop/novalue/"),
    ("p", "http://www.wikidata.org/prop/"),
    ("ps", "http://www.wikidata.org/prop/statement/"),
    ("psv", "http://www.wikidata.org/prop/statement/value/"),
    ("psn", "http://www.wikidata.org/prop/statement/value-normalized/"),
    ("pq", "http://www.wikidata.org/prop/qualifier/"),
    ("pqv", "http://www.wikidata.org/prop/qualifier/value/"),
    ("pqn", "http://www.wikidata.org/prop/qualifier/value-normalized/"),
    ("pr", "http://www.wikidata.org/prop/reference/"),
    ("prv", "http://www.wikidata.org/prop/reference/value/"),
    ("prn", "http://www.wikidata.org/prop/reference/value-normalized/"),
    ("wikibase", "http://wikiba.se/ontology#"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("xsd", XSD),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("schema", "http://schema.org/"),
    ("geo", "http://www.opengis.net/ont/geosparql#"),
];

pub fn wikidata_prefixes() -> &'static PrefixMapping {
    static BUILT_IN: OnceLock<PrefixMapping> = OnceLock::new();
    BUILT_IN.get_or_init(|| {
        let mut mapping = PrefixMapping::default();
        for (prefix, iri) in WIKIDATA_PREFIXES {
            mapping.add_prefix(prefix, iri).unwrap();
        }
        mapping
    })
}

/// Returns the property id (`P31`) if `iri` is a Wikidata direct-property IRI.
pub fn direct_property_id(iri: &str) -> Option<&str> {
    let local = iri.strip_prefix(WIKIDATA_DIRECT_PROPERTY)?;
    is_property_id(local).then_some(local)
}

pub fn is_property_id(value: &str) -> bool {
    value
        .strip_prefix('P')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Whether `iri` lives in one of the Wikidata predicate namespaces
/// (`wdt:`, `p:`, `ps:`, `pq:`, ...) or is the `prov:` reference link.
pub(crate) fn is_wikidata_predicate(iri: &str) -> bool {
    iri.starts_with("http://www.wikidata.org/prop/") || iri.starts_with("http://www.w3.org/ns/prov#")
}

/// The prefixes in scope while a single schema is being read.
pub(crate) struct PrefixTable {
    mapping: PrefixMapping,
    declared: IndexMap<String, String>,
}

impl PrefixTable {
    pub fn new() -> Self {
        let mut mapping = PrefixMapping::default();
        for (prefix, iri) in wikidata_prefixes().mappings() {
            // these were already accepted once
            let _ = mapping.add_prefix(prefix, iri);
        }

        Self {
            mapping,
            declared: IndexMap::new(),
        }
    }

    pub fn declare(&mut self, prefix: &str, iri: &str) -> Result<(), InvalidPrefixError> {
        self.mapping.add_prefix(prefix, iri)?;
        self.declared.insert(prefix.to_string(), iri.to_string());
        Ok(())
    }

    pub fn expand(&self, prefix: &str, local: &str) -> Option<String> {
        self.mapping
            .expand_curie(&Curie::new(Some(prefix), local))
            .ok()
    }

    pub fn into_declared(self) -> IndexMap<String, String> {
        self.declared
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn property_ids() {
        assert_eq!(
            direct_property_id("http://www.wikidata.org/prop/direct/P31"),
            Some("P31")
        );
        assert_eq!(direct_property_id("http://www.wikidata.org/prop/P31"), None);
        assert_eq!(
            direct_property_id("http://www.wikidata.org/prop/direct/Q5"),
            None
        );
        assert!(!is_property_id("P"));
        assert!(!is_property_id("P3a"));
    }

    #[test]
    fn declared_prefixes_override_built_ins() {
        let mut table = PrefixTable::new();
        assert_eq!(
            table.expand("wdt", "P31").as_deref(),
            Some("http://www.wikidata.org/prop/direct/P31")
        );

        table.declare("wdt", "http://example.org/").unwrap();
        assert_eq!(
            table.expand("wdt", "P31").as_deref(),
            Some("http://example.org/P31")
        );
        assert!(table.declare("_", "http://example.org/").is_err());
        assert_eq!(table.expand("nope", "x"), None);
    }
}
