//! `nom` productions for the ShExC subset Wikidata Entity Schemas use.
//!
//! The lexical productions feed the [`Lexer`](crate::lexer::Lexer); the
//! statement productions (directives and cardinalities) are run by the parser
//! directly on the schema text, starting at the token that opens them.
//!
//! ```text
//! prefix_decl := 'PREFIX' pname_ns iriref
//! base_decl   := 'BASE' iriref
//! import_decl := 'IMPORT' iriref
//! start_decl  := 'start' '=' '@' (iriref | pname)
//! cardinality := '?' | '*' | '+' | '{' INT (',' (INT | '*')?)? '}'
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{anychar, char, digit1, satisfy, space0},
    combinator::{map, map_res, not, opt, recognize, value},
    error::{ContextError, ErrorKind, FromExternalError, ParseError, context},
    multi::{many0_count, many1_count},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
};

use crate::cardinality::CardinalityMarker;

/// Where a production gave up, and what it was looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GrammarError<'a> {
    pub input: &'a str,
    /// The innermost [`context`] the failure happened in.
    pub expected: Option<&'static str>,
}

impl<'a> ParseError<&'a str> for GrammarError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        GrammarError {
            input,
            expected: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> ContextError<&'a str> for GrammarError<'a> {
    fn add_context(_input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.expected.get_or_insert(ctx);
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for GrammarError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        Self::from_error_kind(input, kind)
    }
}

pub(crate) type PResult<'a, O> = IResult<&'a str, O, GrammarError<'a>>;

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_local_char(c: char) -> bool {
    is_name_char(c) || c == '.' || c == '%'
}

pub(crate) fn is_iri_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '<' | '>' | '"' | '{' | '}')
}

// ── lexical ─────────────────────────────────────────────────────────

pub(crate) fn blank(input: &str) -> PResult<&str> {
    take_while(char::is_whitespace)(input)
}

/// Whitespace and comments.
pub(crate) fn ws(input: &str) -> PResult<()> {
    value(
        (),
        many0_count(alt((take_while1(char::is_whitespace), comment))),
    )(input)
}

/// The text of a `#` comment, without the `#`.
pub(crate) fn comment(input: &str) -> PResult<&str> {
    preceded(char('#'), take_while(|c| c != '\n' && c != '\r'))(input)
}

/// `<...>`, giving the text between the angle brackets.
pub(crate) fn iriref(input: &str) -> PResult<&str> {
    delimited(char('<'), take_while(is_iri_char), char('>'))(input)
}

pub(crate) fn name(input: &str) -> PResult<&str> {
    recognize(pair(satisfy(is_name_start), take_while(is_name_char)))(input)
}

/// A keyword, matched case-insensitively and not as the start of a longer name.
pub(crate) fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_name_char)))
}

fn local_name(input: &str) -> PResult<&str> {
    let (_, raw) = take_while::<_, _, GrammarError>(is_local_char)(input)?;
    // a trailing '.' terminates a statement, it is not part of the name
    let local = raw.trim_end_matches('.');
    Ok((&input[local.len()..], local))
}

/// `ex:` as written in a `PREFIX` declaration, giving `ex`.
pub(crate) fn pname_ns(input: &str) -> PResult<&str> {
    terminated(map(opt(name), Option::unwrap_or_default), char(':'))(input)
}

/// `prefix:local`, giving both halves; either may be empty.
pub(crate) fn pname(input: &str) -> PResult<(&str, &str)> {
    pair(pname_ns, local_name)(input)
}

/// A quoted literal, quotes included.
pub(crate) fn string<'a>(quote: char) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    recognize(delimited(
        char(quote),
        many0_count(alt((
            recognize(pair(char('\\'), anychar)),
            recognize(satisfy(move |c| c != quote && c != '\\' && c != '\n')),
        ))),
        char(quote),
    ))
}

/// A `/pattern/flags` facet, slashes and flags included.
pub(crate) fn regexp(input: &str) -> PResult<&str> {
    recognize(tuple((
        char('/'),
        many1_count(alt((
            recognize(pair(char('\\'), anychar)),
            recognize(satisfy(|c| c != '/' && c != '\\' && c != '\n')),
        ))),
        char('/'),
        take_while(|c: char| c.is_ascii_alphabetic()),
    )))(input)
}

pub(crate) fn integer(input: &str) -> PResult<&str> {
    digit1(input)
}

// ── statements ──────────────────────────────────────────────────────

/// `PREFIX ex: <http://example.org/>`, giving the prefix and the IRI text.
pub(crate) fn prefix_decl(input: &str) -> PResult<(&str, &str)> {
    preceded(
        pair(keyword("PREFIX"), ws),
        separated_pair(
            context("a prefix name such as `ex:` after PREFIX", pname_ns),
            ws,
            context("<IRI> after the prefix name", iriref),
        ),
    )(input)
}

pub(crate) fn base_decl(input: &str) -> PResult<&str> {
    preceded(pair(keyword("BASE"), ws), context("<IRI> after BASE", iriref))(input)
}

pub(crate) fn import_decl(input: &str) -> PResult<&str> {
    preceded(pair(keyword("IMPORT"), ws), context("<IRI> after IMPORT", iriref))(input)
}

/// `start = @<label>`, giving the label as it is stored on the document.
pub(crate) fn start_decl(input: &str) -> PResult<&str> {
    preceded(
        tuple((keyword("start"), ws, context("'=' after start", char('=')), ws)),
        context(
            "@<label> after start =",
            preceded(char('@'), alt((iriref, recognize(pname)))),
        ),
    )(input)
}

fn bound(input: &str) -> PResult<u32> {
    map_res(digit1, |digits: &str| digits.parse::<u32>())(input)
}

/// `{m}`, `{m,}`, `{m,*}` or `{m,n}`.
fn range(input: &str) -> PResult<CardinalityMarker> {
    let (input, min) = preceded(pair(char('{'), space0), bound)(input)?;
    let (input, max) = opt(preceded(
        tuple((space0, char(','), space0)),
        opt(alt((value(None, char('*')), map(bound, Some)))),
    ))(input)?;
    let (input, _) = pair(space0, char::<_, GrammarError>('}'))(input)?;

    let max = match max {
        None => Some(min),
        Some(None | Some(None)) => None,
        Some(Some(Some(max))) => Some(max),
    };
    Ok((input, CardinalityMarker::Range { min, max }))
}

pub(crate) fn cardinality(input: &str) -> PResult<CardinalityMarker> {
    context(
        "a cardinality",
        alt((
            value(CardinalityMarker::Optional, char('?')),
            value(CardinalityMarker::ZeroOrMore, char('*')),
            value(CardinalityMarker::OneOrMore, char('+')),
            range,
        )),
    )(input)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefixed_names() {
        assert_eq!(pname("wdt:P31 ;"), Ok((" ;", ("wdt", "P31"))));
        assert_eq!(pname(":reference"), Ok(("", ("", "reference"))));
        assert_eq!(pname("ex:a."), Ok((".", ("ex", "a"))));
        assert!(pname("PREFIX").is_err());
    }

    #[test]
    fn keywords_are_whole_words() {
        assert!(keyword("start")("START=@<x>").is_ok());
        assert!(keyword("start")("started").is_err());
    }

    #[test]
    fn regular_expressions() {
        assert_eq!(regexp(r"/^\d+$/ ;"), Ok((" ;", r"/^\d+$/")));
        assert_eq!(regexp(r"/a\/b/i"), Ok(("", r"/a\/b/i")));
        assert!(regexp("/unterminated").is_err());
    }

    #[test]
    fn directives() {
        assert_eq!(
            prefix_decl("PREFIX ex: # comment\n <http://example.org/>"),
            Ok(("", ("ex", "http://example.org/")))
        );
        assert_eq!(start_decl("start = @<human>"), Ok(("", "human")));
        assert_eq!(start_decl("start=@:human"), Ok(("", ":human")));

        let Err(nom::Err::Error(err)) = prefix_decl("PREFIX ex: wd:Q5") else {
            panic!("accepted a prefixed name as the IRI");
        };
        assert_eq!(err.expected, Some("<IRI> after the prefix name"));
        assert_eq!(err.input, "wd:Q5");
    }

    #[test]
    fn cardinalities() {
        assert_eq!(
            cardinality("{ 2 , * } ;"),
            Ok((" ;", CardinalityMarker::Range { min: 2, max: None }))
        );
        assert_eq!(
            cardinality("{3}"),
            Ok(("", CardinalityMarker::Range { min: 3, max: Some(3) }))
        );
        assert!(cardinality("{1,x}").is_err());
    }
}
