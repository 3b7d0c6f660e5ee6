//! Reads Wikidata Entity Schemas, written in the compact syntax of Shape
//! Expressions (ShExC), and reports which Wikidata properties they ask for:
//! required or optional, how many values, what kind of values, and whether a
//! statement should carry a reference.
//!
//! ```
//! let doc = wdshex::parse_shex_code("wdt:P31 @<Q5> ; # instance of");
//! let p31 = &doc.properties.required[0];
//! assert_eq!(p31.id, "P31");
//! assert_eq!(p31.schema_comment.as_deref(), Some("instance of"));
//! ```
//!
//! [`parse_shex_code`] never fails: whatever it cannot read is skipped. Use
//! [`parse_shex_code_strict`] to get a located [`ShExParseError`] instead.
//! The older `{required, optional}` interface lives in [`legacy`].

pub mod cardinality;
pub mod constraint;
pub mod document;
mod error;
mod grammar;
pub mod legacy;
mod lexer;
mod parser;
pub mod prefixes;

pub use cardinality::{Cardinality, CardinalityMarker};
pub use constraint::{NodeKind, RequiresSource, ValueConstraint, classify_constraint};
pub use document::{ParsedDocument, Properties, PropertyConstraint, ShapeDefinition};
pub use error::ShExParseError;
pub use legacy::{LegacyOptions, LegacyProperties, LegacyProperty, Strategy, parse_shex_properties};
pub use prefixes::{WIKIDATA_PREFIXES, wikidata_prefixes};

use parser::{Mode, Parser};
use tracing::debug;

/// A configured schema reader. Holds no state between calls, so one instance
/// can be shared freely (including across threads).
#[derive(Debug, Clone, Default)]
pub struct ShExParser {
    requires_source: RequiresSource,
}

impl ShExParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requires_source(requires_source: RequiresSource) -> Self {
        Self { requires_source }
    }

    pub fn requires_source(&self) -> &RequiresSource {
        &self.requires_source
    }

    /// Reads as much as possible; malformed input yields an empty document.
    pub fn parse(&self, source: &str) -> ParsedDocument {
        run(source, Mode::Graceful, &self.requires_source).unwrap_or_else(|err| {
            debug!(%err, "schema could not be read");
            ParsedDocument::default()
        })
    }

    /// Fails on the first thing that is not valid in the supported ShExC subset.
    pub fn parse_strict(&self, source: &str) -> Result<ParsedDocument, ShExParseError> {
        run(source, Mode::Strict, &self.requires_source)
    }
}

pub(crate) fn run(
    source: &str,
    mode: Mode,
    requires_source: &RequiresSource,
) -> Result<ParsedDocument, ShExParseError> {
    Parser::new(source, mode, requires_source).parse()
}

/// Parses with the default configuration; never fails.
pub fn parse_shex_code(source: &str) -> ParsedDocument {
    ShExParser::new().parse(source)
}

pub fn parse_shex_code_strict(source: &str) -> Result<ParsedDocument, ShExParseError> {
    ShExParser::new().parse_strict(source)
}
