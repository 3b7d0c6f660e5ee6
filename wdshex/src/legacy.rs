//! The original `{required, optional}` interface, kept for existing callers.
//!
//! By default this runs the old line-oriented reader, which does not know
//! about shapes and has no dependency on [`crate::parser`]. Callers can opt in
//! to the new parser, with or without falling back to the old reader when the
//! new one rejects the input.

use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::cardinality::Cardinality;
use crate::constraint::RequiresSource;
use crate::document::{ParsedDocument, PropertyConstraint, wikidata_url};
use crate::error::ShExParseError;
use crate::parser::Mode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProperty {
    pub id: String,
    pub constraint: String,
    pub cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_comment: Option<String>,
    pub requires_source: bool,
    /// `Constraint: <constraint>`
    pub description: String,
    /// The property's page on Wikidata.
    pub url: String,
}

impl LegacyProperty {
    fn new(
        id: String,
        constraint: String,
        cardinality: Cardinality,
        schema_comment: Option<String>,
        requires_source: bool,
    ) -> Self {
        Self {
            description: format!("Constraint: {constraint}"),
            url: wikidata_url(&id),
            id,
            constraint,
            cardinality,
            schema_comment,
            requires_source,
        }
    }
}

impl From<&PropertyConstraint> for LegacyProperty {
    fn from(property: &PropertyConstraint) -> Self {
        LegacyProperty::new(
            property.id.clone(),
            property.constraint.clone(),
            property.cardinality,
            property.schema_comment.clone(),
            property.requires_source,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyProperties {
    pub required: Vec<LegacyProperty>,
    pub optional: Vec<LegacyProperty>,
}

impl LegacyProperties {
    pub fn iter(&self) -> impl Iterator<Item = &LegacyProperty> {
        self.required.iter().chain(&self.optional)
    }
}

/// Only document-level declarations carry over; shapes have no legacy equivalent.
impl From<&ParsedDocument> for LegacyProperties {
    fn from(document: &ParsedDocument) -> Self {
        Self {
            required: document.properties.required.iter().map_into().collect(),
            optional: document.properties.optional.iter().map_into().collect(),
        }
    }
}

/// Which reader [`parse_shex_properties`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// The line-oriented reader.
    #[default]
    Legacy,
    /// The strict new parser; if it fails, the line-oriented reader's result is returned instead.
    NewWithFallback,
    /// The strict new parser, failures reported to the caller.
    NewStrict,
}

#[derive(Debug, Clone, Default)]
pub struct LegacyOptions {
    use_new_parser: bool,
    enable_fallback: Option<bool>,
    requires_source: RequiresSource,
}

impl LegacyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_new_parser(mut self, use_new_parser: bool) -> Self {
        self.use_new_parser = use_new_parser;
        self
    }

    /// Only meaningful with the new parser, where it defaults to `true`.
    pub fn with_fallback(mut self, enable_fallback: bool) -> Self {
        self.enable_fallback = Some(enable_fallback);
        self
    }

    pub fn with_requires_source(mut self, requires_source: RequiresSource) -> Self {
        self.requires_source = requires_source;
        self
    }

    pub fn strategy(&self) -> Strategy {
        match (self.use_new_parser, self.enable_fallback.unwrap_or(true)) {
            (false, _) => Strategy::Legacy,
            (true, true) => Strategy::NewWithFallback,
            (true, false) => Strategy::NewStrict,
        }
    }
}

impl From<Strategy> for LegacyOptions {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Legacy => LegacyOptions::new(),
            Strategy::NewWithFallback => LegacyOptions::new().with_new_parser(true),
            Strategy::NewStrict => LegacyOptions::new()
                .with_new_parser(true)
                .with_fallback(false),
        }
    }
}

/// Only [`Strategy::NewStrict`] can fail.
pub fn parse_shex_properties(
    source: &str,
    options: &LegacyOptions,
) -> Result<LegacyProperties, ShExParseError> {
    let new_parser = || {
        crate::run(source, Mode::Strict, &options.requires_source)
            .map(|document| LegacyProperties::from(&document))
    };

    match options.strategy() {
        Strategy::Legacy => Ok(read_lines(source, &options.requires_source)),
        Strategy::NewStrict => new_parser(),
        Strategy::NewWithFallback => match new_parser() {
            Ok(properties) => Ok(properties),
            Err(err) => {
                debug!(%err, "new parser failed, using the line reader");
                Ok(read_lines(source, &options.requires_source))
            }
        },
    }
}

fn property_line() -> &'static Regex {
    static PROPERTY_LINE: OnceLock<Regex> = OnceLock::new();
    PROPERTY_LINE.get_or_init(|| {
        Regex::new(r"wdt:(P\d+)[ \t]+([^;#{}]*?)[ \t]*([?*+]|\{[ \t\d,*]*\})?[ \t]*(?:[;}#]|$)")
            .unwrap()
    })
}

/// One declaration per line, no shapes, no multi-line statements.
fn read_lines(source: &str, requires_source: &RequiresSource) -> LegacyProperties {
    let (mut required, optional): (Vec<_>, Vec<_>) = source
        .lines()
        .filter_map(|line| read_line(line, requires_source))
        .unique_by(|p| p.id.clone())
        .partition(|p| p.cardinality.is_required());

    if required.is_empty() {
        // the mapping screen always needs something to ask for
        let comment = "instance of".to_string();
        let requires_source = requires_source.check("P31", Some(&comment));
        required.push(LegacyProperty::new(
            "P31".to_string(),
            ".".to_string(),
            Cardinality::EXACTLY_ONE,
            Some(comment),
            requires_source,
        ));
    }

    LegacyProperties { required, optional }
}

fn read_line(line: &str, requires_source: &RequiresSource) -> Option<LegacyProperty> {
    let captures = property_line().captures(line)?;
    let whole = captures.get(0)?;
    if line[..whole.start()].contains('#') {
        // commented out
        return None;
    }

    let id = captures[1].to_string();
    let constraint = captures[2].trim().to_string();
    let marker = captures.get(3).map_or("", |m| m.as_str());
    let cardinality = match marker.parse::<Cardinality>() {
        Ok(cardinality) => cardinality,
        Err(err) => {
            debug!(%err, line, "skipping line");
            return None;
        }
    };

    let rest_from = captures
        .get(3)
        .or_else(|| captures.get(2))
        .map_or(whole.end(), |m| m.end());
    let schema_comment = line[rest_from..]
        .split_once('#')
        .map(|(_, comment)| comment.trim())
        .filter(|comment| !comment.is_empty())
        .map(str::to_string);

    let requires_source = requires_source.check(&id, schema_comment.as_deref());
    Some(LegacyProperty::new(
        id,
        constraint,
        cardinality,
        schema_comment,
        requires_source,
    ))
}
