//! Scanner: random-access tokenizer over one complete input string.
//!
//! What it does
//! - Keeps a byte cursor (`bp`) and the byte under it (`ch`). Reading past
//!   the end yields [`EOI`]; end of input is decided by position, never by
//!   that sentinel, so a literal `0x1A` in the input is not mistaken for it.
//! - Produces one classified token at a time via [`Scanner::next_token`].
//!   Strings without escapes are returned as borrowed slices of the input;
//!   escapes switch the payload to the scratch buffer.
//! - Offers a cursor mode used by the parser for object keys and by the typed
//!   decoder's field matchers: callers inspect [`Scanner::current`], move
//!   with [`Scanner::advance`], and backtrack with [`Scanner::mark`] and
//!   [`Scanner::reset`].
//!
//! Invariants
//! - The cursor only ever rests on a UTF-8 character boundary between calls.
//! - A [`Mark`] captures the full cursor state; restoring it undoes any
//!   amount of speculative scanning.
use std::{borrow::Cow, fmt, sync::Arc};

use bstr::ByteSlice;
use chrono::{DateTime, FixedOffset};

use crate::{
    error::{ErrorKind, ParserError, SyntaxError},
    options::ParserOptions,
    symbols::SymbolTable,
};

pub(crate) mod date;
mod escape;
mod fields;
mod number;
#[cfg(test)]
mod tests;

pub use fields::FieldMatch;

/// Value of [`Scanner::current`] past the end of input.
pub const EOI: u8 = 0x1A;
/// Longest number literal accepted, in characters.
pub const MAX_NUMBER_LENGTH: usize = 65_535;
/// Largest decoded string accepted, in bytes.
pub const MAX_SCRATCH_LEN: usize = 128 << 20;

/// Classification of the token under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    LiteralString,
    LiteralInt,
    LiteralFloat,
    True,
    False,
    Null,
    /// A bare word that is not a keyword.
    Identifier,
    Eof,
    /// The scanner hit an illegal character.
    Error,
    /// A string literal whose whole content is a recognized date.
    LiteralIsoDate,
    /// A `x'..'` hex literal.
    HexBlob,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::LiteralString => "string",
            Self::LiteralInt => "int",
            Self::LiteralFloat => "float",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::Identifier => "ident",
            Self::Eof => "EOF",
            Self::Error => "error",
            Self::LiteralIsoDate => "iso8601",
            Self::HexBlob => "hex",
        })
    }
}

/// A saved cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    bp: usize,
    ch: u8,
    token: TokenKind,
    pos: usize,
    np: usize,
    sp: usize,
    has_special: bool,
}

/// Decoded string storage, grown by doubling up to [`MAX_SCRATCH_LEN`].
#[derive(Debug, Default)]
struct Scratch {
    buf: String,
}

impl Scratch {
    fn clear(&mut self) {
        self.buf.clear();
    }

    fn reserve(&mut self, additional: usize) -> Result<(), SyntaxError> {
        let needed = self.buf.len() + additional;
        if needed > MAX_SCRATCH_LEN {
            return Err(SyntaxError::ScratchOverflow(MAX_SCRATCH_LEN));
        }
        if needed > self.buf.capacity() {
            let target = (self.buf.capacity() * 2).clamp(needed.max(64), MAX_SCRATCH_LEN);
            self.buf.reserve_exact(target - self.buf.len());
        }
        Ok(())
    }

    fn push_str(&mut self, s: &str) -> Result<(), SyntaxError> {
        self.reserve(s.len())?;
        self.buf.push_str(s);
        Ok(())
    }

    fn push(&mut self, c: char) -> Result<(), SyntaxError> {
        self.reserve(c.len_utf8())?;
        self.buf.push(c);
        Ok(())
    }
}

pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0C | 0x08)
}

pub(crate) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'_' | b'$') || b >= 0x80
}

pub(crate) fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Tokenizer over a complete input.
pub struct Scanner<'a> {
    text: &'a str,
    /// Cursor.
    bp: usize,
    /// Byte under the cursor, or [`EOI`].
    ch: u8,
    token: TokenKind,
    /// Start of the current token.
    pos: usize,
    /// Start and length of the current token's payload in `text`.
    np: usize,
    sp: usize,
    /// Whether the current string payload lives in `scratch`.
    has_special: bool,
    scratch: Scratch,
    date: Option<DateTime<FixedOffset>>,
    options: ParserOptions,
    symbols: &'a SymbolTable,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(text: &'a str, options: ParserOptions, symbols: &'a SymbolTable) -> Self {
        let mut scanner = Self {
            text,
            bp: 0,
            ch: EOI,
            token: TokenKind::Error,
            pos: 0,
            np: 0,
            sp: 0,
            has_special: false,
            scratch: Scratch::default(),
            date: None,
            options,
            symbols,
        };
        scanner.seek(0);
        scanner
    }

    /// The byte at `index`, or [`EOI`] past the end.
    #[must_use]
    pub fn char_at(&self, index: usize) -> u8 {
        self.text.as_bytes().get(index).copied().unwrap_or(EOI)
    }

    #[must_use]
    pub fn current(&self) -> u8 {
        self.ch
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.bp
    }

    #[must_use]
    pub fn token(&self) -> TokenKind {
        self.token
    }

    /// Offset where the current token starts.
    #[must_use]
    pub fn token_pos(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.bp >= self.text.len()
    }

    /// Whether the whole input is whitespace.
    #[must_use]
    pub fn is_blank_input(&self) -> bool {
        self.text.bytes().all(is_whitespace)
    }

    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Moves the cursor one byte.
    pub fn advance(&mut self) {
        self.seek(self.bp + 1);
    }

    fn seek(&mut self, index: usize) {
        self.bp = index.min(self.text.len());
        self.ch = self.char_at(self.bp);
    }

    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark {
            bp: self.bp,
            ch: self.ch,
            token: self.token,
            pos: self.pos,
            np: self.np,
            sp: self.sp,
            has_special: self.has_special,
        }
    }

    pub fn reset(&mut self, mark: Mark) {
        self.bp = mark.bp;
        self.ch = mark.ch;
        self.token = mark.token;
        self.pos = mark.pos;
        self.np = mark.np;
        self.sp = mark.sp;
        self.has_special = mark.has_special;
    }

    /// An error at the cursor.
    pub(crate) fn error(&self, kind: impl Into<ErrorKind>) -> ParserError {
        ParserError::at(self.text, self.bp, kind).with_token(self.token)
    }

    /// An error at the start of the current token.
    pub(crate) fn token_error(&self, kind: impl Into<ErrorKind>) -> ParserError {
        ParserError::at(self.text, self.pos, kind).with_token(self.token)
    }

    /// An error at `offset`, reported against `token`.
    pub(crate) fn error_at(&self, offset: usize, token: TokenKind, kind: impl Into<ErrorKind>) -> ParserError {
        ParserError::at(self.text, offset, kind).with_token(token)
    }

    /// The character under the cursor, for diagnostics.
    pub(crate) fn current_char(&self) -> char {
        self.text
            .get(self.bp..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or(char::from(EOI))
    }

    /// Skips whitespace and, when enabled, comments.
    ///
    /// # Errors
    ///
    /// Fails on a malformed or unterminated comment.
    pub fn skip_whitespace(&mut self) -> Result<(), ParserError> {
        loop {
            if self.is_eof() {
                return Ok(());
            }
            match self.ch {
                b if is_whitespace(b) => self.advance(),
                b'/' if self.options.allow_comments => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_plain_whitespace(&mut self) {
        while !self.is_eof() && is_whitespace(self.ch) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParserError> {
        self.advance();
        match self.ch {
            b'/' => {
                while !self.is_eof() && self.ch != b'\n' {
                    self.advance();
                }
                self.advance();
                Ok(())
            }
            b'*' => {
                self.advance();
                let rest = &self.text.as_bytes()[self.bp..];
                match rest.find("*/") {
                    Some(end) => {
                        self.seek(self.bp + end + 2);
                        Ok(())
                    }
                    None => {
                        self.seek(self.text.len());
                        Err(self.error(SyntaxError::UnterminatedComment))
                    }
                }
            }
            _ => Err(self.error(SyntaxError::InvalidComment)),
        }
    }

    /// Skips whitespace and classifies the next token.
    ///
    /// # Errors
    ///
    /// Fails on an illegal character (leaving [`TokenKind::Error`] as the
    /// current token) or a malformed literal.
    pub fn next_token(&mut self) -> Result<TokenKind, ParserError> {
        self.sp = 0;
        self.skip_whitespace()?;
        self.pos = self.bp;
        if self.is_eof() {
            self.token = TokenKind::Eof;
            return Ok(TokenKind::Eof);
        }
        let single = match self.ch {
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b'"' => return self.scan_string(b'"'),
            b'\'' if self.options.allow_single_quotes => return self.scan_string(b'\''),
            b'-' | b'0'..=b'9' => return self.scan_number(),
            b'x' if self.char_at(self.bp + 1) == b'\'' => return self.scan_hex(),
            b if is_ident_start(b) => return Ok(self.scan_ident()),
            _ => {
                self.token = TokenKind::Error;
                return Err(self.error(SyntaxError::InvalidCharacter(self.current_char())));
            }
        };
        self.advance();
        self.token = single;
        Ok(single)
    }

    /// Like [`Scanner::next_token`], but consumes the token directly when the
    /// byte under the cursor already is the single character for `expected`.
    ///
    /// # Errors
    ///
    /// As [`Scanner::next_token`].
    pub fn next_token_expect(&mut self, expected: TokenKind) -> Result<TokenKind, ParserError> {
        if !self.is_eof() {
            let single = match expected {
                TokenKind::LBrace => b'{',
                TokenKind::RBrace => b'}',
                TokenKind::LBracket => b'[',
                TokenKind::RBracket => b']',
                TokenKind::Colon => b':',
                TokenKind::Comma => b',',
                TokenKind::LiteralString if self.ch == b'"' => {
                    self.sp = 0;
                    return self.scan_string(b'"');
                }
                TokenKind::LiteralInt if self.ch.is_ascii_digit() => {
                    self.sp = 0;
                    return self.scan_number();
                }
                _ => 0,
            };
            if single != 0 && self.ch == single {
                self.pos = self.bp;
                self.sp = 0;
                self.advance();
                self.token = expected;
                return Ok(expected);
            }
        }
        self.next_token()
    }

    /// Scans a quoted literal starting at its opening quote, leaving the
    /// payload as a span of the input or in the scratch buffer.
    fn scan_literal(&mut self, quote: u8) -> Result<(), ParserError> {
        self.pos = self.bp;
        self.advance();
        let start = self.bp;
        self.np = start;
        self.has_special = false;
        let mut segment = start;
        loop {
            let rest = &self.text.as_bytes()[self.bp..];
            let Some(offset) = rest.find_byteset([quote, b'\\']) else {
                self.seek(self.text.len());
                return Err(self.error(SyntaxError::UnterminatedString));
            };
            self.seek(self.bp + offset);
            if self.ch == quote {
                break;
            }
            if !self.has_special {
                self.has_special = true;
                self.scratch.clear();
            }
            self.push_span(segment, self.bp)?;
            self.advance();
            self.scan_escape()?;
            segment = self.bp;
        }
        if self.has_special {
            self.push_span(segment, self.bp)?;
        }
        self.sp = self.bp - start;
        self.advance();
        Ok(())
    }

    fn push_span(&mut self, from: usize, to: usize) -> Result<(), ParserError> {
        let text = self.text;
        self.scratch
            .push_str(&text[from..to])
            .map_err(|e| self.error(e))
    }

    pub(crate) fn push_char(&mut self, c: char) -> Result<(), ParserError> {
        self.scratch.push(c).map_err(|e| self.error(e))
    }

    fn scan_string(&mut self, quote: u8) -> Result<TokenKind, ParserError> {
        self.scan_literal(quote)?;
        self.token = TokenKind::LiteralString;
        if self.options.allow_iso8601_date_format {
            if let Some(date) = date::parse_text(&self.string_val()) {
                self.date = Some(date);
                self.token = TokenKind::LiteralIsoDate;
            }
        }
        Ok(self.token)
    }

    fn scan_ident(&mut self) -> TokenKind {
        self.np = self.bp;
        self.has_special = false;
        while !self.is_eof() && is_ident_part(self.ch) {
            self.advance();
        }
        self.sp = self.bp - self.np;
        self.token = match &self.text[self.np..self.bp] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Identifier,
        };
        self.token
    }

    fn scan_hex(&mut self) -> Result<TokenKind, ParserError> {
        self.seek(self.bp + 2);
        let start = self.bp;
        while self.ch.is_ascii_hexdigit() && !self.is_eof() {
            self.advance();
        }
        if self.ch != b'\'' || self.is_eof() || (self.bp - start) % 2 != 0 {
            return Err(self.error(SyntaxError::InvalidHexBlob));
        }
        self.np = start;
        self.sp = self.bp - start;
        self.has_special = false;
        self.advance();
        self.token = TokenKind::HexBlob;
        Ok(self.token)
    }

    /// The payload of the current string or identifier token.
    #[must_use]
    pub fn string_val(&self) -> Cow<'a, str> {
        if self.has_special {
            Cow::Owned(self.scratch.buf.clone())
        } else {
            Cow::Borrowed(&self.text[self.np..self.np + self.sp])
        }
    }

    /// The decoded bytes of the current hex token.
    #[must_use]
    pub fn bytes_value(&self) -> Vec<u8> {
        self.text.as_bytes()[self.np..self.np + self.sp]
            .chunks_exact(2)
            .map(|pair| {
                let hi = escape::hex_digit(pair[0]).unwrap_or(0);
                let lo = escape::hex_digit(pair[1]).unwrap_or(0);
                (hi << 4) | lo
            })
            .collect()
    }

    /// The date carried by the last [`TokenKind::LiteralIsoDate`] token or
    /// recognized by [`Scanner::scan_iso8601_like_date`].
    #[must_use]
    pub fn date_value(&self) -> Option<DateTime<FixedOffset>> {
        self.date
    }

    /// Scans a quoted key starting at its opening quote and interns it. The
    /// cursor ends after the closing quote; the current token is unchanged.
    ///
    /// # Errors
    ///
    /// Fails on an unterminated string or invalid escape.
    pub fn scan_symbol(&mut self, quote: u8) -> Result<Arc<str>, ParserError> {
        self.scan_literal(quote)?;
        let text = self.string_val();
        Ok(self.symbols.add_symbol(&text, SymbolTable::hash(&text)))
    }

    /// Scans a bare identifier key and interns it.
    pub fn scan_symbol_unquoted(&mut self) -> Arc<str> {
        let start = self.bp;
        while !self.is_eof() && is_ident_part(self.ch) {
            self.advance();
        }
        let text = &self.text[start..self.bp];
        self.symbols.add_symbol(text, SymbolTable::hash(text))
    }

    /// Interns arbitrary text, for keys built from non-string tokens.
    pub(crate) fn intern(&self, text: &str) -> Arc<str> {
        self.symbols.intern(text)
    }

    /// Tries to recognize a date at the cursor. On success the cursor moves
    /// past it and [`Scanner::date_value`] returns it; otherwise nothing
    /// changes. With `strict`, the date must extend to the end of input.
    pub fn scan_iso8601_like_date(&mut self, strict: bool) -> bool {
        let rest = &self.text.as_bytes()[self.bp..];
        match date::recognize(rest, strict) {
            Some((date, len)) => {
                self.date = Some(date);
                self.seek(self.bp + len);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("bp", &self.bp)
            .field("token", &self.token)
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}
