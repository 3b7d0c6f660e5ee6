use std::ops::Range;

use miette::SourceSpan;

/// A located failure, only produced by strict parsing.
///
/// `Display` renders as `<message> at line <L>, column <C>`; as a
/// [`miette::Diagnostic`] it points at the offending token in `source`.
#[derive(derive_more::Error, derive_more::Display, miette::Diagnostic, Debug, Clone, PartialEq, Eq)]
#[display("{message} at line {line}, column {column}")]
#[diagnostic(code(wdshex::parse))]
pub struct ShExParseError {
    pub message: String,
    /// 1-based.
    pub line: usize,
    /// 1-based, in characters.
    pub column: usize,
    /// The complete schema text that was being parsed.
    #[error(not(source))]
    #[source_code]
    pub source: String,
    #[label("here")]
    span: SourceSpan,
}

impl ShExParseError {
    pub(crate) fn new(message: impl Into<String>, source: &str, span: Range<usize>) -> Self {
        let start = span.start.min(source.len());
        let before = &source[..start];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = source[line_start..start].chars().count() + 1;

        Self {
            message: message.into(),
            line,
            column,
            source: source.to_string(),
            span: (start, span.end.saturating_sub(start)).into(),
        }
    }

    /// An error located at the end of the input.
    pub(crate) fn at_end(message: impl Into<String>, source: &str) -> Self {
        Self::new(message, source, source.len()..source.len())
    }

    /// Byte offset of the failure within [`Self::source`].
    pub fn offset(&self) -> usize {
        self.span.offset()
    }

    /// The source line the error points at, without its line terminator.
    pub fn snippet(&self) -> &str {
        self.source
            .lines()
            .nth(self.line - 1)
            .unwrap_or_default()
    }
}
