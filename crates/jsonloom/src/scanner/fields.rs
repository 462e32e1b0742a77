//! Field matchers: speculative `"name":value` recognition for typed decoding.
//!
//! Each matcher checks for the exact bytes `"name":` at the cursor (leading
//! whitespace allowed), then decodes one value of a fixed shape, then the
//! `,` or `}` that follows it. Any deviation restores the cursor to where it
//! was, so the caller can fall back to the general path for the same key.
use chrono::{DateTime, FixedOffset};

use super::{Scanner, TokenKind, date, is_ident_part, number::parse_bounded};
use crate::value::Decimal;

/// Outcome of a field matcher.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMatch<T> {
    /// Matched; the `,` after the value was consumed.
    Value(T),
    /// Matched; the enclosing `}` was consumed, and the token after it is
    /// current.
    End(T),
    /// The next key is not this field. The cursor is unchanged.
    NameMismatch,
    /// The key matched but the value has another shape. The cursor is
    /// unchanged.
    ValueMismatch,
}

impl<T> FieldMatch<T> {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Value(_) | Self::End(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldMatch<U> {
        match self {
            Self::Value(v) => FieldMatch::Value(f(v)),
            Self::End(v) => FieldMatch::End(f(v)),
            Self::NameMismatch => FieldMatch::NameMismatch,
            Self::ValueMismatch => FieldMatch::ValueMismatch,
        }
    }
}

impl Scanner<'_> {
    fn scan_field<T>(&mut self, name: &str, value: impl FnOnce(&mut Self) -> Option<T>) -> FieldMatch<T> {
        let mark = self.mark();
        if !self.match_field_name(name) {
            self.reset(mark);
            return FieldMatch::NameMismatch;
        }
        let matched = value(self).and_then(|v| self.finish_field().map(|end| (v, end)));
        match matched {
            Some((v, false)) => FieldMatch::Value(v),
            Some((v, true)) => FieldMatch::End(v),
            None => {
                self.reset(mark);
                FieldMatch::ValueMismatch
            }
        }
    }

    fn match_field_name(&mut self, name: &str) -> bool {
        self.skip_plain_whitespace();
        let bytes = self.text.as_bytes();
        let at = self.bp;
        let n = name.len();
        let matched = bytes.get(at) == Some(&b'"')
            && bytes.get(at + 1..at + 1 + n) == Some(name.as_bytes())
            && bytes.get(at + 1 + n) == Some(&b'"')
            && bytes.get(at + 2 + n) == Some(&b':');
        if matched {
            self.seek(at + n + 3);
            self.skip_plain_whitespace();
        }
        matched
    }

    /// Consumes the `,` or `}` after a field value. Returns whether the
    /// object ended.
    fn finish_field(&mut self) -> Option<bool> {
        self.skip_plain_whitespace();
        if self.is_eof() {
            return None;
        }
        match self.ch {
            b',' => {
                self.pos = self.bp;
                self.advance();
                self.token = TokenKind::Comma;
                Some(false)
            }
            b'}' => {
                self.advance();
                self.skip_plain_whitespace();
                self.pos = self.bp;
                self.sp = 0;
                self.token = if self.is_eof() {
                    TokenKind::Eof
                } else {
                    let token = match self.ch {
                        b',' => TokenKind::Comma,
                        b']' => TokenKind::RBracket,
                        b'}' => TokenKind::RBrace,
                        _ => return None,
                    };
                    self.advance();
                    token
                };
                Some(true)
            }
            _ => None,
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        let end = self.bp + word.len();
        let hit = self.text.as_bytes()[self.bp..].starts_with(word.as_bytes()) && !is_ident_part(self.char_at(end));
        if hit {
            self.seek(end);
        }
        hit
    }

    fn field_integer(&mut self, min: i64, max: i64) -> Option<i64> {
        let quoted = self.ch == b'"';
        if quoted {
            self.advance();
        }
        let start = self.bp;
        if self.ch == b'-' {
            self.advance();
        }
        while !self.is_eof() && self.ch.is_ascii_digit() {
            self.advance();
        }
        if matches!(self.ch, b'.' | b'e' | b'E') {
            return None;
        }
        let value = parse_bounded(&self.text.as_bytes()[start..self.bp], min, max)?;
        if quoted && !self.eat_quote() {
            return None;
        }
        Some(value)
    }

    fn eat_quote(&mut self) -> bool {
        let hit = !self.is_eof() && self.ch == b'"';
        if hit {
            self.advance();
        }
        hit
    }

    /// Scans a number token in place, optionally quoted.
    fn field_number(&mut self) -> Option<()> {
        let quoted = self.ch == b'"';
        if quoted {
            self.advance();
        }
        if !(self.ch == b'-' || self.ch.is_ascii_digit()) || self.is_eof() {
            return None;
        }
        self.scan_number().ok()?;
        if quoted && !self.eat_quote() {
            return None;
        }
        Some(())
    }

    /// Matches `"name":` followed by an `i32`.
    pub fn scan_field_int(&mut self, name: &str) -> FieldMatch<i32> {
        self.scan_field(name, |s| {
            s.field_integer(i32::MIN.into(), i32::MAX.into())
                .and_then(|n| i32::try_from(n).ok())
        })
    }

    /// Matches `"name":` followed by an `i64`.
    pub fn scan_field_long(&mut self, name: &str) -> FieldMatch<i64> {
        self.scan_field(name, |s| s.field_integer(i64::MIN, i64::MAX))
    }

    /// Matches `"name":` followed by a string or `null`.
    pub fn scan_field_string(&mut self, name: &str) -> FieldMatch<Option<String>> {
        self.scan_field(name, |s| {
            if s.eat_keyword("null") {
                return Some(None);
            }
            if s.ch != b'"' {
                return None;
            }
            s.scan_literal(b'"').ok()?;
            Some(Some(s.string_val().into_owned()))
        })
    }

    /// Matches `"name":` followed by `true`, `false`, their quoted forms, `1`
    /// or `0`.
    pub fn scan_field_bool(&mut self, name: &str) -> FieldMatch<bool> {
        self.scan_field(name, |s| {
            for (word, value) in [
                ("true", true),
                ("false", false),
                ("\"true\"", true),
                ("\"false\"", false),
            ] {
                if s.eat_keyword(word) {
                    return Some(value);
                }
            }
            match s.ch {
                b @ (b'0' | b'1') if !s.char_at(s.bp + 1).is_ascii_digit() => {
                    s.advance();
                    Some(b == b'1')
                }
                _ => None,
            }
        })
    }

    /// Matches `"name":` followed by any number, as `f64`.
    pub fn scan_field_double(&mut self, name: &str) -> FieldMatch<f64> {
        self.scan_field(name, |s| {
            s.field_number()?;
            s.double_value().ok()
        })
    }

    /// Matches `"name":` followed by any number, as an exact decimal.
    pub fn scan_field_decimal(&mut self, name: &str) -> FieldMatch<Decimal> {
        self.scan_field(name, |s| {
            s.field_number()?;
            Some(s.decimal_value())
        })
    }

    /// Matches `"name":` followed by a date string or epoch milliseconds.
    pub fn scan_field_date(&mut self, name: &str) -> FieldMatch<DateTime<FixedOffset>> {
        self.scan_field(name, |s| {
            if s.ch == b'"' {
                s.scan_literal(b'"').ok()?;
                return date::parse_text(&s.string_val());
            }
            let millis = s.field_integer(i64::MIN, i64::MAX)?;
            DateTime::from_timestamp_millis(millis).map(|d| d.fixed_offset())
        })
    }
}
