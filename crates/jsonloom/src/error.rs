use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{binder::CastError, scanner::TokenKind, security::AutoTypeError};

/// A fatal failure to decode the input.
///
/// Every error carries the byte offset it was raised at, the 1-based line and
/// column of that offset (columns count characters), the token the scanner was
/// positioned on and, when the parser was inside an object, the key whose
/// value was being decoded.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}, offset {offset}, line {line}, column {column}{}", Detail(.token, .field))]
pub struct ParserError {
    pub(crate) kind: ErrorKind,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub(crate) token: Option<TokenKind>,
    pub(crate) field: Option<Arc<str>>,
}

/// The class of a [`ParserError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("autoType rejected: {0}")]
    AutoType(#[from] AutoTypeError),
    #[error("{0}")]
    Cast(#[from] CastError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),
    #[error("expected {expected}, found '{found}'")]
    UnexpectedCharacter { expected: &'static str, found: char },
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
    },
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("invalid comment")]
    InvalidComment,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("invalid number literal")]
    InvalidNumber,
    #[error("number does not fit in {0}")]
    NumberOutOfRange(&'static str),
    #[error("number literal longer than {0} characters")]
    NumberTooLong(usize),
    #[error("string literal larger than {0} bytes")]
    ScratchOverflow(usize),
    #[error("invalid hex literal")]
    InvalidHexBlob,
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("unexpected {0} after the root value")]
    TrailingCharacters(TokenKind),
    #[error("illegal $ref, expected a string, found {0}")]
    IllegalReference(TokenKind),
    #[error("non-string keys are not enabled")]
    NonStringKey,
}

impl ParserError {
    /// Builds an error at `offset` into `input`, computing line and column by
    /// rescanning the input from its start.
    pub(crate) fn at(input: &str, offset: usize, kind: impl Into<ErrorKind>) -> Self {
        let (line, column) = line_and_column(input.as_bytes(), offset);
        Self {
            kind: kind.into(),
            offset,
            line,
            column,
            token: None,
            field: None,
        }
    }

    #[must_use]
    pub(crate) fn with_token(mut self, token: TokenKind) -> Self {
        self.token = Some(token);
        self
    }

    #[must_use]
    pub(crate) fn with_field(mut self, field: &Arc<str>) -> Self {
        if self.field.is_none() {
            self.field = Some(field.clone());
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The token the scanner was positioned on, if known.
    #[must_use]
    pub fn token(&self) -> Option<TokenKind> {
        self.token
    }

    /// The key whose value was being decoded, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ErrorKind::Syntax(_))
    }

    /// Returns `true` for auto-type security rejections.
    #[must_use]
    pub fn is_security(&self) -> bool {
        matches!(self.kind, ErrorKind::AutoType(_))
    }
}

fn line_and_column(input: &[u8], offset: usize) -> (usize, usize) {
    let prefix = &input[..offset.min(input.len())];
    let line = 1 + prefix.iter().filter(|b| **b == b'\n').count();
    let line_start = prefix
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);
    // Count characters, not bytes: skip UTF-8 continuation bytes.
    let column = 1 + prefix[line_start..]
        .iter()
        .filter(|b| (**b & 0xC0) != 0x80)
        .count();
    (line, column)
}

struct Detail<'a>(&'a Option<TokenKind>, &'a Option<Arc<str>>);

impl fmt::Display for Detail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(token) = self.0 {
            write!(f, ", token {token}")?;
        }
        if let Some(field) = self.1 {
            write!(f, ", field {field}")?;
        }
        Ok(())
    }
}
