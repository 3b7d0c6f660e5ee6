//! Classification of the value part of a triple constraint, and the
//! "does this statement need a reference" heuristic.

use indexmap::IndexSet;
use serde::Serialize;
use vec1::Vec1;

use crate::lexer::{Lexer, Spanned, Token};
use crate::prefixes::{PrefixTable, WIKIDATA_ENTITY};

/// One typed alternative of a constraint expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ValueConstraint {
    /// `xsd:dateTime`, `<http://...>`, or the bare `IRI` keyword.
    Datatype { datatype: String },
    /// `@<human>`
    ShapeReference { label: String },
    /// `[ wd:Q5 wd:Q6 ]`, values as written.
    ValueSet { values: Vec<String> },
    /// `LITERAL`, `BNODE` or `NONLITERAL`.
    NodeKind { kind: NodeKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    Literal,
    Bnode,
    NonLiteral,
}

impl ValueConstraint {
    pub fn is_datatype(&self) -> bool {
        matches!(self, ValueConstraint::Datatype { .. })
    }

    pub fn is_shape_reference(&self) -> bool {
        matches!(self, ValueConstraint::ShapeReference { .. })
    }
}

/// Classifies a standalone constraint expression such as `xsd:string OR @<person>`,
/// resolving prefixed names against the built-in Wikidata prefixes only.
pub fn classify_constraint(text: &str) -> Vec<ValueConstraint> {
    let tokens: Vec<_> = Lexer::new(text).collect();
    classify(&tokens, text, &PrefixTable::new())
}

/// Unrecognized expressions are not an error: they classify as "no constraints".
pub(crate) fn classify(
    tokens: &[Spanned<'_>],
    source: &str,
    prefixes: &PrefixTable,
) -> Vec<ValueConstraint> {
    let tokens: Vec<Spanned<'_>> = tokens
        .iter()
        .filter(|t| !matches!(t.token, Token::Comment(_)))
        .copied()
        .collect();

    if tokens.is_empty() {
        return Vec::new();
    }

    expression(&tokens, source, prefixes).unwrap_or_default()
}

/// `None` as soon as one alternative, at any depth, is not understood.
fn expression(
    tokens: &[Spanned<'_>],
    source: &str,
    prefixes: &PrefixTable,
) -> Option<Vec<ValueConstraint>> {
    let mut constraints = Vec::new();
    for alt in alternatives(unparenthesize(tokens)) {
        if unparenthesize(alt).len() < alt.len() {
            constraints.extend(expression(alt, source, prefixes)?);
        } else {
            constraints.push(atom(alt, source, prefixes)?);
        }
    }
    Some(constraints)
}

/// Splits on `OR` outside of any brackets. There is always at least one alternative.
fn alternatives<'t, 'a>(tokens: &'t [Spanned<'a>]) -> Vec1<&'t [Spanned<'a>]> {
    let mut depth = 0usize;
    let mut bounds = Vec::new();
    for (i, t) in tokens.iter().enumerate() {
        match t.token {
            Token::Punct('(' | '[' | '{') => depth += 1,
            Token::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            Token::Name(_) if depth == 0 && t.is_keyword("OR") => bounds.push(i),
            _ => {}
        }
    }
    bounds.push(tokens.len());

    let mut result = Vec1::new(&tokens[..bounds[0]]);
    for pair in bounds.windows(2) {
        result.push(&tokens[pair[0] + 1..pair[1]]);
    }
    result
}

/// Strips one pair of parentheses, but only if they enclose all of `tokens`.
fn unparenthesize<'t, 'a>(tokens: &'t [Spanned<'a>]) -> &'t [Spanned<'a>] {
    match tokens {
        [open, inner @ .., close]
            if open.is_punct('(') && close.is_punct(')') && is_balanced(inner) =>
        {
            inner
        }
        _ => tokens,
    }
}

fn is_balanced(tokens: &[Spanned<'_>]) -> bool {
    tokens.iter().try_fold(0usize, |depth, t| match t.token {
        Token::Punct('(' | '[' | '{') => Some(depth + 1),
        Token::Punct(')' | ']' | '}') => depth.checked_sub(1),
        _ => Some(depth),
    }) == Some(0)
}

fn atom(tokens: &[Spanned<'_>], source: &str, prefixes: &PrefixTable) -> Option<ValueConstraint> {
    let constraint = match tokens {
        [at, label] if at.is_punct('@') => match label.token {
            Token::IriRef(iri) => ValueConstraint::ShapeReference {
                label: iri.to_string(),
            },
            Token::PrefixedName { .. } => ValueConstraint::ShapeReference {
                label: source[label.span()].to_string(),
            },
            _ => return None,
        },
        [single] => match single.token {
            Token::Name(_) if single.is_keyword("IRI") => ValueConstraint::Datatype {
                datatype: "IRI".to_string(),
            },
            Token::Name(_) if single.is_keyword("LITERAL") => ValueConstraint::NodeKind {
                kind: NodeKind::Literal,
            },
            Token::Name(_) if single.is_keyword("BNODE") => ValueConstraint::NodeKind {
                kind: NodeKind::Bnode,
            },
            Token::Name(_) if single.is_keyword("NONLITERAL") => ValueConstraint::NodeKind {
                kind: NodeKind::NonLiteral,
            },
            Token::PrefixedName { prefix, local } => {
                let iri = prefixes.expand(prefix, local)?;
                if iri.starts_with(WIKIDATA_ENTITY) {
                    // an item is a value, not a datatype
                    return None;
                }
                ValueConstraint::Datatype {
                    datatype: source[single.span()].to_string(),
                }
            }
            Token::IriRef(iri) => ValueConstraint::Datatype {
                datatype: iri.to_string(),
            },
            _ => return None,
        },
        [open, .., close] if open.is_punct('[') && close.is_punct(']') => {
            ValueConstraint::ValueSet {
                values: source[open.end..close.start]
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            }
        }
        _ => return None,
    };

    Some(constraint)
}

/// Decides whether statements using a property should carry a reference.
///
/// This is configuration, not something derivable from the schema: callers
/// can extend both the property registry and the comment markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiresSource {
    properties: IndexSet<String>,
    markers: Vec<String>,
}

impl Default for RequiresSource {
    fn default() -> Self {
        Self::empty()
            // stated in
            .with_property("P248")
            .with_marker("requires source")
            .with_marker("requires a source")
            .with_marker("source required")
            .with_marker("requires reference")
            .with_marker("reference required")
    }
}

impl RequiresSource {
    pub fn empty() -> Self {
        Self {
            properties: IndexSet::new(),
            markers: Vec::new(),
        }
    }

    pub fn with_property(mut self, id: impl Into<String>) -> Self {
        self.properties.insert(id.into());
        self
    }

    /// Markers are matched case-insensitively anywhere in the schema comment.
    pub fn with_marker(mut self, phrase: impl AsRef<str>) -> Self {
        self.markers.push(phrase.as_ref().to_lowercase());
        self
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(String::as_str)
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }

    pub fn check(&self, id: &str, comment: Option<&str>) -> bool {
        if let Some(comment) = comment {
            let comment = comment.to_lowercase();
            if self.markers.iter().any(|m| comment.contains(m.as_str())) {
                return true;
            }
        }

        self.properties.contains(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn or_alternatives_keep_their_order() {
        assert_eq!(
            classify_constraint("xsd:string OR @<person> OR IRI"),
            vec![
                ValueConstraint::Datatype {
                    datatype: "xsd:string".to_string()
                },
                ValueConstraint::ShapeReference {
                    label: "person".to_string()
                },
                ValueConstraint::Datatype {
                    datatype: "IRI".to_string()
                },
            ]
        );
    }

    #[test]
    fn one_bad_alternative_spoils_the_expression() {
        assert_eq!(classify_constraint("xsd:string OR"), vec![]);
        assert_eq!(classify_constraint("@<a> OR MINLENGTH 3"), vec![]);
        assert_eq!(classify_constraint("."), vec![]);
        assert_eq!(classify_constraint("wd:Q5"), vec![]);
        assert_eq!(classify_constraint("undeclared:thing"), vec![]);
    }

    #[test]
    fn value_sets_and_node_kinds() {
        assert_eq!(
            classify_constraint("[ wd:Q5 wd:Q15632617 ]"),
            vec![ValueConstraint::ValueSet {
                values: vec!["wd:Q5".to_string(), "wd:Q15632617".to_string()]
            }]
        );
        assert_eq!(
            classify_constraint("( LITERAL OR NONLITERAL )"),
            vec![
                ValueConstraint::NodeKind {
                    kind: NodeKind::Literal
                },
                ValueConstraint::NodeKind {
                    kind: NodeKind::NonLiteral
                },
            ]
        );
        assert_eq!(
            classify_constraint("(LITERAL) OR (NONLITERAL)"),
            vec![
                ValueConstraint::NodeKind {
                    kind: NodeKind::Literal
                },
                ValueConstraint::NodeKind {
                    kind: NodeKind::NonLiteral
                },
            ]
        );
    }

    #[test]
    fn nested_parentheses() {
        assert_eq!(
            classify_constraint("((xsd:string) OR (@<person> OR IRI))"),
            vec![
                ValueConstraint::Datatype {
                    datatype: "xsd:string".to_string()
                },
                ValueConstraint::ShapeReference {
                    label: "person".to_string()
                },
                ValueConstraint::Datatype {
                    datatype: "IRI".to_string()
                },
            ]
        );
        assert_eq!(classify_constraint("(xsd:string OR MINLENGTH 3)"), vec![]);
        assert_eq!(classify_constraint("()"), vec![]);
    }

    #[test]
    fn requires_source() {
        let registry = RequiresSource::default();
        assert!(registry.check("P248", None));
        assert!(registry.check("P1", Some("Requires Source: yes")));
        assert!(!registry.check("P1", Some("instance of")));
        assert!(!registry.check("P1", None));

        let custom = RequiresSource::empty().with_property("P854");
        assert!(custom.check("P854", None));
        assert!(!custom.check("P248", None));
        assert!(!custom.check("P1", Some("requires source")));
    }
}
