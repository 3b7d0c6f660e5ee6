//! Recursive-descent reader for Wikidata Entity Schemas.
//!
//! The grammar is the ShExC subset Wikidata schemas actually use:
//!
//! ```text
//! schema    := (PREFIX pname <iri> | BASE <iri> | IMPORT <iri> | start = @label
//!               | shape | triple)*
//! shape     := label header* '{' (triple | ';' | '|' | group)* '}'
//! triple    := '^'? predicate expression cardinality? (';' | '|')? comment?
//! cardinality := '?' | '*' | '+' | '{' INT (',' (INT | '*')?)? '}'
//! ```
//!
//! Directives and cardinalities are read by the `nom` productions in
//! [`grammar`](crate::grammar); the parser walks the token stream for the rest,
//! so that a broken statement can be skipped without losing its neighbours.
//!
//! Only triples whose predicate is a Wikidata direct property (`wdt:P...`)
//! are kept; everything else is read and dropped.

use std::ops::Range;

use nom::Offset;
use oxiri::Iri;
use oxrdf::NamedNode;
use tracing::{debug, trace};

use crate::cardinality::{Cardinality, CardinalityMarker};
use crate::constraint::{RequiresSource, classify};
use crate::document::{DocumentBuilder, ParsedDocument, PropertyConstraint, Scope};
use crate::error::ShExParseError;
use crate::grammar::{self, GrammarError, PResult};
use crate::lexer::{Lexer, Spanned, Token};
use crate::prefixes::{
    PrefixTable, WIKIDATA_DIRECT_PROPERTY, direct_property_id, is_wikidata_predicate,
};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

type ParseResult<T> = Result<T, ShExParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Skip whatever cannot be read and keep going.
    Graceful,
    /// Stop at the first problem.
    Strict,
}

/// A triple constraint as found in the text, before classification.
struct RawDeclaration<'a> {
    /// Token indices of the constraint expression.
    expression: Range<usize>,
    constraint: &'a str,
    marker: CardinalityMarker,
    marker_span: Range<usize>,
    comment: Option<&'a str>,
}

pub(crate) struct Parser<'a, 'c> {
    source: &'a str,
    tokens: Vec<Spanned<'a>>,
    pos: usize,
    mode: Mode,
    prefixes: PrefixTable,
    base: Option<Iri<String>>,
    builder: DocumentBuilder,
    requires_source: &'c RequiresSource,
}

impl<'a, 'c> Parser<'a, 'c> {
    pub fn new(source: &'a str, mode: Mode, requires_source: &'c RequiresSource) -> Self {
        Self {
            source,
            tokens: Lexer::new(source).collect(),
            pos: 0,
            mode,
            prefixes: PrefixTable::new(),
            base: None,
            builder: DocumentBuilder::default(),
            requires_source,
        }
    }

    pub fn parse(mut self) -> ParseResult<ParsedDocument> {
        while self.peek().is_some() {
            let checkpoint = self.pos;
            if let Err(err) = self.top_level_item() {
                self.handle(err, checkpoint)?;
            }
        }

        Ok(self.builder.finish(self.prefixes.into_declared()))
    }

    fn handle(&mut self, err: ShExParseError, checkpoint: usize) -> ParseResult<()> {
        match self.mode {
            Mode::Strict => Err(err),
            Mode::Graceful => {
                debug!(%err, "skipping unreadable statement");
                self.recover(checkpoint);
                Ok(())
            }
        }
    }

    /// Skips to the end of the broken statement: past the next `;`, or up to a
    /// closing `}` or a line that starts a new statement.
    fn recover(&mut self, checkpoint: usize) {
        if self.pos == checkpoint {
            self.pos += 1;
        }

        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            match t.token {
                Token::Punct('{' | '(' | '[') => depth += 1,
                Token::Punct('}' | ')' | ']') if depth > 0 => depth -= 1,
                Token::Punct('}') => return,
                Token::Punct(';' | '|') if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                _ if depth == 0
                    && self.starts_line(self.pos)
                    && (self.starts_statement(self.pos)
                        || self.shape_body_at(self.pos + 1).is_some()) =>
                {
                    return;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    // ── token helpers ───────────────────────────────────────────────

    fn peek(&self) -> Option<&Spanned<'a>> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Spanned<'a>> {
        let t = self.tokens.get(self.pos).copied();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_next(&mut self, what: &str) -> ParseResult<Spanned<'a>> {
        self.bump().ok_or_else(|| {
            ShExParseError::at_end(format!("expected {what}, found end of input"), self.source)
        })
    }

    fn error(&self, t: &Spanned<'_>, message: impl Into<String>) -> ShExParseError {
        ShExParseError::new(message, self.source, t.span())
    }

    fn unexpected(&self, t: &Spanned<'_>) -> ShExParseError {
        match t.token {
            Token::Invalid(message) => self.error(t, message),
            _ => self.error(t, format!("unexpected '{}'", &self.source[t.span()])),
        }
    }

    /// Moves to the first token at or after byte offset `end`.
    fn seek(&mut self, end: usize) {
        self.pos = self.tokens.partition_point(|t| t.start < end);
    }

    fn span_of(&self, text: &str) -> Range<usize> {
        let start = self.source.offset(text);
        start..start + text.len()
    }

    /// Runs a grammar production from the current token and moves past what it read.
    fn statement<O>(
        &mut self,
        mut production: impl FnMut(&'a str) -> PResult<'a, O>,
    ) -> ParseResult<O> {
        let source = self.source;
        let from = self.peek().map_or(source.len(), |t| t.start);
        match production(&source[from..]) {
            Ok((rest, output)) => {
                self.seek(source.len() - rest.len());
                Ok(output)
            }
            Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(self.grammar_error(err)),
            Err(nom::Err::Incomplete(_)) => Err(ShExParseError::at_end(
                "unexpected end of input",
                self.source,
            )),
        }
    }

    fn grammar_error(&self, err: GrammarError<'a>) -> ShExParseError {
        let at = self.source.offset(err.input);
        let found = self
            .tokens
            .get(self.tokens.partition_point(|t| t.start < at))
            .filter(|t| !matches!(t.token, Token::Comment(_)));
        match (err.expected, found) {
            (Some(what), Some(t)) => self.error(
                t,
                format!("expected {what}, found '{}'", &self.source[t.span()]),
            ),
            (Some(what), None) => ShExParseError::at_end(
                format!("expected {what}, found end of input"),
                self.source,
            ),
            (None, Some(t)) => self.unexpected(t),
            (None, None) => ShExParseError::at_end("unexpected end of input", self.source),
        }
    }

    fn starts_line(&self, idx: usize) -> bool {
        idx == 0 || self.tokens[idx - 1].line < self.tokens[idx].line
    }

    /// Whether the token at `idx` can only begin a new statement.
    fn starts_statement(&self, idx: usize) -> bool {
        let t = &self.tokens[idx];
        match t.token {
            Token::Name(_) => ["PREFIX", "BASE", "IMPORT", "start"]
                .iter()
                .any(|kw| t.is_keyword(kw)),
            Token::IriRef(_) => true,
            Token::PrefixedName { .. } => self
                .resolve_predicate(t)
                .ok()
                .flatten()
                .is_some_and(|iri| direct_property_id(&iri).is_some()),
            _ => false,
        }
    }

    /// Whether the token at `idx` could be the predicate of a triple constraint.
    fn starts_predicate(&self, idx: usize) -> bool {
        let t = &self.tokens[idx];
        matches!(t.token, Token::PrefixedName { .. } | Token::IriRef(_)) || t.is_keyword("a")
    }

    fn starts_cardinality(&self, idx: usize) -> bool {
        matches!(self.tokens[idx].token, Token::Punct('?' | '*' | '+'))
            || self.is_cardinality_brace(idx)
    }

    fn is_cardinality_brace(&self, idx: usize) -> bool {
        self.tokens[idx].is_punct('{')
            && matches!(self.tokens.get(idx + 1), Some(t) if matches!(t.token, Token::Integer(_)))
    }

    fn absolute_iri(&self, iri: &str) -> ParseResult<Iri<String>> {
        let parsed = match &self.base {
            Some(base) => base.resolve(iri),
            None => Iri::parse(iri.to_string()),
        };
        parsed.map_err(|e| {
            ShExParseError::new(format!("invalid IRI <{iri}>: {e}"), self.source, self.span_of(iri))
        })
    }

    /// The IRI a predicate token stands for; `Ok(None)` if the token is not a predicate at all.
    fn resolve_predicate(&self, t: &Spanned<'_>) -> ParseResult<Option<String>> {
        Ok(match t.token {
            Token::PrefixedName { prefix, local } => match self.prefixes.expand(prefix, local) {
                Some(iri) => Some(iri),
                None => return Err(self.error(t, format!("undeclared prefix '{prefix}:'"))),
            },
            Token::IriRef(iri) => Some(match &self.base {
                Some(base) => base
                    .resolve(iri)
                    .map(Iri::into_inner)
                    .unwrap_or_else(|_| iri.to_string()),
                None => iri.to_string(),
            }),
            Token::Name(_) if t.is_keyword("a") => Some(RDF_TYPE.to_string()),
            _ => None,
        })
    }

    fn label(&self, t: &Spanned<'_>) -> String {
        match t.token {
            Token::IriRef(iri) => iri.to_string(),
            _ => self.source[t.span()].to_string(),
        }
    }

    // ── top level ───────────────────────────────────────────────────

    fn top_level_item(&mut self) -> ParseResult<()> {
        let Some(t) = self.peek().copied() else {
            return Ok(());
        };

        match t.token {
            Token::Comment(_) | Token::Punct(';' | '|') => {
                self.pos += 1;
                Ok(())
            }
            Token::Name(_) if t.is_keyword("PREFIX") => self.prefix_decl(),
            Token::Name(_) if t.is_keyword("BASE") => self.base_decl(),
            Token::Name(_) if t.is_keyword("IMPORT") => {
                let iri = self.statement(grammar::import_decl)?;
                trace!(iri, "import ignored");
                Ok(())
            }
            Token::Name(_) if t.is_keyword("start") => self.start_decl(),
            Token::Name(_) if t.is_keyword("a") => self.triple_constraint(Some(&Scope::Document)),
            Token::Punct('^') => {
                self.pos += 1;
                self.triple_constraint(None)
            }
            Token::IriRef(_) | Token::PrefixedName { .. } => {
                if self.declares_triple(self.pos) {
                    self.triple_constraint(Some(&Scope::Document))
                } else {
                    self.shape_decl()
                }
            }
            _ => Err(self.unexpected(&t)),
        }
    }

    fn prefix_decl(&mut self) -> ParseResult<()> {
        let (prefix, iri) = self.statement(grammar::prefix_decl)?;
        let iri = self.absolute_iri(iri)?;
        self.prefixes.declare(prefix, iri.as_str()).map_err(|_| {
            ShExParseError::new(
                format!("the prefix '{prefix}' is reserved"),
                self.source,
                self.span_of(prefix),
            )
        })?;
        trace!(prefix, iri = iri.as_str(), "prefix declared");
        Ok(())
    }

    fn base_decl(&mut self) -> ParseResult<()> {
        let iri = self.statement(grammar::base_decl)?;
        let base = self.absolute_iri(iri)?;
        self.builder.set_base(base.as_str().to_string());
        self.base = Some(base);
        Ok(())
    }

    fn start_decl(&mut self) -> ParseResult<()> {
        let label = self.statement(grammar::start_decl)?;
        self.builder.set_start(label.to_string());
        Ok(())
    }

    /// Decides between `label { ... }` and `predicate expression ;` at the top level.
    fn declares_triple(&self, idx: usize) -> bool {
        let t = &self.tokens[idx];
        if self
            .resolve_predicate(t)
            .ok()
            .flatten()
            .is_some_and(|iri| is_wikidata_predicate(&iri))
        {
            return true;
        }

        if self.shape_body_at(idx + 1).is_some() {
            return false;
        }

        matches!(t.token, Token::PrefixedName { .. })
    }

    /// Finds the `{` opening a shape body, looking past `EXTRA`, `CLOSED` and similar.
    fn shape_body_at(&self, from: usize) -> Option<usize> {
        let mut idx = from;
        while let Some(t) = self.tokens.get(idx) {
            if t.is_punct('{') {
                return (!self.is_cardinality_brace(idx)).then_some(idx);
            }

            if matches!(t.token, Token::Comment(_)) {
                idx += 1;
                continue;
            }

            if self.starts_line(idx) {
                return None;
            }

            match t.token {
                Token::Name(_)
                | Token::PrefixedName { .. }
                | Token::IriRef(_)
                | Token::Punct('@' | '.') => idx += 1,
                _ => return None,
            }
        }
        None
    }

    fn shape_decl(&mut self) -> ParseResult<()> {
        let label_tok = self.expect_next("a shape label")?;
        let label = self.label(&label_tok);
        self.builder.open_shape(&label);

        match self.shape_body_at(self.pos) {
            Some(open) => {
                trace!(%label, "shape");
                self.pos = open + 1;
                self.shape_body(&label)
            }
            None => {
                // `<label> IRI` and the like: a shape without triple constraints
                while let Some(t) = self.peek() {
                    if self.starts_line(self.pos) || t.is_punct(';') {
                        break;
                    }
                    self.pos += 1;
                }
                Ok(())
            }
        }
    }

    fn shape_body(&mut self, label: &str) -> ParseResult<()> {
        let scope = Scope::Shape(label.to_string());
        loop {
            let Some(t) = self.peek() else {
                return Err(ShExParseError::at_end(
                    format!("missing '}}' to close shape '{label}'"),
                    self.source,
                ));
            };

            if t.is_punct('}') {
                self.pos += 1;
                return Ok(());
            }

            let checkpoint = self.pos;
            if let Err(err) = self.shape_item(&scope) {
                self.handle(err, checkpoint)?;
            }
        }
    }

    fn shape_item(&mut self, scope: &Scope) -> ParseResult<()> {
        let Some(t) = self.peek().copied() else {
            return Ok(());
        };

        match t.token {
            Token::Comment(_) | Token::Punct(';' | '|' | '(') => {
                self.pos += 1;
                Ok(())
            }
            Token::Punct(')') => {
                // a group's own cardinality does not change its members
                self.pos += 1;
                self.skip_marker()
            }
            Token::Punct('^') => {
                // inverse triples constrain the subject's neighbours, not the subject
                self.pos += 1;
                self.triple_constraint(None)
            }
            Token::Punct('&' | '$') => {
                self.pos += 1;
                let label = self.expect_next("a label")?;
                match label.token {
                    Token::IriRef(_) | Token::PrefixedName { .. } => Ok(()),
                    _ => Err(self.unexpected(&label)),
                }
            }
            Token::IriRef(_) | Token::PrefixedName { .. } => self.triple_constraint(Some(scope)),
            Token::Name(_) if t.is_keyword("a") => self.triple_constraint(Some(scope)),
            _ => Err(self.unexpected(&t)),
        }
    }

    fn skip_marker(&mut self) -> ParseResult<()> {
        if self.peek().is_some() && self.starts_cardinality(self.pos) {
            self.cardinality()?;
        }
        Ok(())
    }

    // ── triple constraints ─────────────────────────────────────────

    /// Reads one triple constraint; it is recorded only when `scope` is given
    /// and the predicate is a Wikidata direct property.
    fn triple_constraint(&mut self, scope: Option<&Scope>) -> ParseResult<()> {
        let predicate = self.expect_next("a predicate")?;
        let iri = match self.resolve_predicate(&predicate)? {
            Some(iri) => iri,
            None => return Err(self.unexpected(&predicate)),
        };

        let raw = self.declaration(&predicate)?;
        let cardinality = Cardinality::resolve(raw.marker).map_err(|e| {
            ShExParseError::new(e.to_string(), self.source, raw.marker_span.clone())
        })?;

        match (scope, direct_property_id(&iri)) {
            (Some(scope), Some(id)) => {
                let property = self.property(id, &raw, cardinality);
                trace!(id, ?scope, constraint = raw.constraint, "property");
                self.builder.add(scope, property);
            }
            _ => trace!(predicate = %iri, "not a Wikidata property, ignored"),
        }

        Ok(())
    }

    fn declaration(&mut self, predicate: &Spanned<'a>) -> ParseResult<RawDeclaration<'a>> {
        let start = self.pos;
        let mut end = self.pos;
        let mut marker: Option<(CardinalityMarker, Range<usize>)> = None;
        let mut comment = None;
        let mut last_line = predicate.line;

        while let Some(t) = self.peek().copied() {
            let fresh_line = t.line > last_line;
            match t.token {
                Token::Comment(text) => {
                    if !fresh_line && comment.is_none() {
                        comment = Some(text);
                    }
                    self.pos += 1;
                    continue;
                }
                Token::Punct(';' | '|') => {
                    self.pos += 1;
                    if comment.is_none() {
                        if let Some(Token::Comment(text)) = self
                            .peek()
                            .filter(|next| next.line == t.line)
                            .map(|next| next.token)
                        {
                            comment = Some(text);
                            self.pos += 1;
                        }
                    }
                    break;
                }
                Token::Punct('}' | ')') => break,
                _ if fresh_line
                    && (end > start || marker.is_some())
                    && !self.ends_with_connective(start..end)
                    && (self.starts_predicate(self.pos) || self.starts_statement(self.pos)) =>
                {
                    // no ';' before the next declaration
                    break;
                }
                _ if self.starts_cardinality(self.pos) => {
                    if marker.is_some() {
                        return Err(self.unexpected(&t));
                    }
                    marker = Some(self.cardinality()?);
                }
                Token::Punct('{' | '[' | '(') => {
                    self.skip_balanced()?;
                    if marker.is_none() {
                        end = self.pos;
                    }
                }
                Token::Punct(']') => return Err(self.unexpected(&t)),
                Token::Invalid(_) if self.mode == Mode::Strict => {
                    return Err(self.unexpected(&t));
                }
                _ => {
                    self.pos += 1;
                    if marker.is_none() {
                        end = self.pos;
                    }
                }
            }
            last_line = self.tokens[self.pos - 1].line;
        }

        let constraint = if end > start {
            &self.source[self.tokens[start].start..self.tokens[end - 1].end]
        } else {
            ""
        };

        let (marker, marker_span) = marker.unwrap_or_else(|| {
            let at = self.tokens.get(end.max(1) - 1).map_or(0, |t| t.end);
            (CardinalityMarker::None, at..at)
        });

        Ok(RawDeclaration {
            expression: start..end,
            constraint,
            marker,
            marker_span,
            comment,
        })
    }

    fn ends_with_connective(&self, expression: Range<usize>) -> bool {
        expression.end > expression.start
            && ["OR", "AND", "NOT"]
                .iter()
                .any(|kw| self.tokens[expression.end - 1].is_keyword(kw))
    }

    /// `?`, `*`, `+`, `{m}`, `{m,}`, `{m,*}` or `{m,n}`.
    fn cardinality(&mut self) -> ParseResult<(CardinalityMarker, Range<usize>)> {
        let open = self.tokens[self.pos];
        if let Ok((rest, marker)) = grammar::cardinality(&self.source[open.start..]) {
            let end = self.source.len() - rest.len();
            self.seek(end);
            return Ok((marker, open.start..end));
        }

        // report everything up to the first token that cannot be part of it
        self.pos += 1;
        loop {
            let t = self.expect_next("'}' to close the cardinality")?;
            if !matches!(t.token, Token::Integer(_) | Token::Punct(',' | '*')) {
                return Err(ShExParseError::new(
                    format!("invalid cardinality `{}`", &self.source[open.start..t.end]),
                    self.source,
                    open.start..t.end,
                ));
            }
        }
    }

    /// Skips a bracketed group (inline shape, value set, parenthesised expression).
    fn skip_balanced(&mut self) -> ParseResult<()> {
        let open = self.tokens[self.pos];
        let mut depth = 0usize;
        while let Some(t) = self.bump() {
            match t.token {
                Token::Punct('{' | '[' | '(') => depth += 1,
                Token::Punct('}' | ']' | ')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Invalid(_) if self.mode == Mode::Strict => {
                    return Err(self.unexpected(&t));
                }
                _ => {}
            }
        }

        Err(self.error(
            &open,
            format!("'{}' is never closed", &self.source[open.span()]),
        ))
    }

    fn property(
        &self,
        id: &str,
        raw: &RawDeclaration<'a>,
        cardinality: Cardinality,
    ) -> PropertyConstraint {
        let schema_comment = raw
            .comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        PropertyConstraint {
            id: id.to_string(),
            predicate: NamedNode::new_unchecked(format!("{WIKIDATA_DIRECT_PROPERTY}{id}")),
            constraint: raw.constraint.to_string(),
            value_constraints: classify(
                &self.tokens[raw.expression.clone()],
                self.source,
                &self.prefixes,
            ),
            cardinality,
            requires_source: self.requires_source.check(id, schema_comment.as_deref()),
            schema_comment,
        }
    }
}
