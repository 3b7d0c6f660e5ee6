//! Tokenizer for the ShExC subset used by Wikidata Entity Schemas.
//!
//! The lexer never fails: anything it cannot make sense of becomes a
//! [`Token::Invalid`] and the parser decides whether that is fatal.

use std::ops::Range;

use nom::{branch::alt, character::complete::one_of, combinator::map};

use crate::grammar::{self, PResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// `<...>`, without the angle brackets.
    IriRef(&'a str),
    /// `prefix:local`; `local` is empty for `PREFIX ex: <...>`.
    PrefixedName { prefix: &'a str, local: &'a str },
    /// A bare word: keywords (`PREFIX`, `OR`, `IRI`, `start`, ...) and anything else alphabetic.
    Name(&'a str),
    Integer(&'a str),
    /// A quoted literal, including its quotes.
    String(&'a str),
    /// `/pattern/flags`, slashes and flags included.
    Regexp(&'a str),
    /// The text of a `#` comment, without the `#`.
    Comment(&'a str),
    Punct(char),
    Invalid(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Spanned<'a> {
    pub token: Token<'a>,
    pub start: usize,
    pub end: usize,
    /// 1-based.
    pub line: usize,
    /// 1-based, counted in characters.
    pub column: usize,
}

impl Spanned<'_> {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.token == Token::Punct(c)
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.token, Token::Name(name) if name.eq_ignore_ascii_case(keyword))
    }
}

pub(crate) struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

const PUNCTUATION: &str = "{}()[];|,?*+.=@^~-$&%!\\";

fn token(input: &str) -> PResult<'_, Token<'_>> {
    alt((
        map(grammar::comment, Token::Comment),
        map(grammar::iriref, Token::IriRef),
        map(alt((grammar::string('"'), grammar::string('\''))), Token::String),
        map(grammar::regexp, Token::Regexp),
        map(grammar::pname, |(prefix, local)| Token::PrefixedName { prefix, local }),
        map(grammar::name, Token::Name),
        map(grammar::integer, Token::Integer),
        map(one_of(PUNCTUATION), Token::Punct),
    ))(input)
}

/// What to make of text no token matches: its length and the reason.
fn invalid(input: &str) -> (usize, &'static str) {
    let line_end = input.find(['\n', '\r']).unwrap_or(input.len());
    match input.chars().next() {
        Some('<') => (
            input[1..]
                .find(|c: char| !grammar::is_iri_char(c))
                .map_or(input.len(), |n| n + 1),
            "unterminated IRI",
        ),
        Some('"' | '\'') => (line_end, "unterminated string"),
        Some('/') => (line_end, "unterminated regular expression"),
        Some(c) => (c.len_utf8(), "unexpected character"),
        None => (0, "unexpected end of input"),
    }
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn advance(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += text.len();
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Spanned<'a>;

    fn next(&mut self) -> Option<Spanned<'a>> {
        if let Ok((_, skipped)) = grammar::blank(self.rest()) {
            self.advance(skipped);
        }

        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }

        let (start, line, column) = (self.pos, self.line, self.column);
        let (len, token) = match token(rest) {
            Ok((after, token)) => (rest.len() - after.len(), token),
            Err(_) => {
                let (len, reason) = invalid(rest);
                (len, Token::Invalid(reason))
            }
        };
        self.advance(&rest[..len]);

        Some(Spanned {
            token,
            start,
            end: self.pos,
            line,
            column,
        })
    }
}
