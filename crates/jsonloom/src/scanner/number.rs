//! Number literals: scanning and conversion of the current token.
use num_bigint::BigInt;

use super::{MAX_NUMBER_LENGTH, Scanner, TokenKind};
use crate::{
    error::{ParserError, SyntaxError},
    value::{Decimal, Value},
};

/// Parses optionally signed decimal digits into `min..=max`.
///
/// Accumulates negatively so that the most negative bound never overflows.
pub(crate) fn parse_bounded(text: &[u8], min: i64, max: i64) -> Option<i64> {
    let (negative, digits) = match text.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }
    let limit = if negative { min } else { -max };
    let multmin = limit / 10;
    let mut result = 0i64;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        let digit = i64::from(b - b'0');
        if result < multmin {
            return None;
        }
        result *= 10;
        if result < limit + digit {
            return None;
        }
        result -= digit;
    }
    Some(if negative { result } else { -result })
}

impl<'a> Scanner<'a> {
    /// Scans `-? digits (. digits)? ([eE] [+-]? digits)?` plus an optional
    /// type suffix: `L`, `S` or `B` after an integer, `F` or `D` after any
    /// number (which makes it a float).
    pub(super) fn scan_number(&mut self) -> Result<TokenKind, ParserError> {
        self.pos = self.bp;
        self.np = self.bp;
        self.has_special = false;
        let mut is_float = false;
        if self.ch == b'-' {
            self.advance();
        }
        self.scan_digits()?;
        if self.ch == b'.' {
            self.advance();
            self.scan_digits()?;
            is_float = true;
        }
        if matches!(self.ch, b'e' | b'E') {
            self.advance();
            if matches!(self.ch, b'+' | b'-') {
                self.advance();
            }
            self.scan_digits()?;
            is_float = true;
        }
        if !self.is_eof() {
            match self.ch {
                b'L' | b'S' | b'B' if !is_float => self.advance(),
                b'F' | b'D' => {
                    self.advance();
                    is_float = true;
                }
                _ => {}
            }
        }
        self.sp = self.bp - self.np;
        if self.sp > MAX_NUMBER_LENGTH {
            return Err(self.token_error(SyntaxError::NumberTooLong(MAX_NUMBER_LENGTH)));
        }
        self.token = if is_float {
            TokenKind::LiteralFloat
        } else {
            TokenKind::LiteralInt
        };
        Ok(self.token)
    }

    fn scan_digits(&mut self) -> Result<(), ParserError> {
        let start = self.bp;
        while !self.is_eof() && self.ch.is_ascii_digit() {
            self.advance();
        }
        if self.bp == start {
            return Err(self.error(SyntaxError::InvalidNumber));
        }
        Ok(())
    }

    /// The full text of the current number token, suffix included.
    #[must_use]
    pub fn number_text(&self) -> &'a str {
        &self.text[self.np..self.np + self.sp]
    }

    /// The current number token without its type suffix.
    fn number_digits(&self) -> &'a str {
        self.number_text()
            .trim_end_matches(['L', 'S', 'B', 'F', 'D'])
    }

    fn has_float_suffix(&self) -> bool {
        self.number_text().ends_with(['F', 'D'])
    }

    /// The current integer token as `i32`.
    ///
    /// # Errors
    ///
    /// Fails when the literal does not fit.
    #[allow(clippy::cast_possible_truncation)]
    pub fn int_value(&self) -> Result<i32, ParserError> {
        parse_bounded(self.number_digits().as_bytes(), i32::MIN.into(), i32::MAX.into())
            .map(|n| n as i32)
            .ok_or_else(|| self.token_error(SyntaxError::NumberOutOfRange("int")))
    }

    /// The current integer token as `i64`.
    ///
    /// # Errors
    ///
    /// Fails when the literal does not fit.
    pub fn long_value(&self) -> Result<i64, ParserError> {
        parse_bounded(self.number_digits().as_bytes(), i64::MIN, i64::MAX)
            .ok_or_else(|| self.token_error(SyntaxError::NumberOutOfRange("long")))
    }

    /// The current integer token as [`Value::Int`], or [`Value::BigInt`] when
    /// it exceeds `i64`.
    ///
    /// # Errors
    ///
    /// Fails when the literal is not an integer.
    pub fn integer_value(&self) -> Result<Value, ParserError> {
        let digits = self.number_digits().as_bytes();
        if let Some(n) = parse_bounded(digits, i64::MIN, i64::MAX) {
            return Ok(Value::Int(n));
        }
        BigInt::parse_bytes(digits, 10)
            .map(Value::BigInt)
            .ok_or_else(|| self.token_error(SyntaxError::InvalidNumber))
    }

    /// The current number token as an exact decimal.
    #[must_use]
    pub fn decimal_value(&self) -> Decimal {
        Decimal::from_scanned(self.number_digits())
    }

    /// The current number token as the nearest `f64`.
    ///
    /// # Errors
    ///
    /// Fails when the literal is not a number.
    pub fn double_value(&self) -> Result<f64, ParserError> {
        self.number_digits()
            .parse()
            .map_err(|_| self.token_error(SyntaxError::InvalidNumber))
    }

    /// The current float token: an exact decimal when `use_big_decimal` is
    /// set and the literal has no `F`/`D` suffix, otherwise an `f64`.
    ///
    /// # Errors
    ///
    /// Fails when the literal is not a number.
    pub fn float_value(&self, use_big_decimal: bool) -> Result<Value, ParserError> {
        if use_big_decimal && !self.has_float_suffix() {
            Ok(Value::Decimal(self.decimal_value()))
        } else {
            self.double_value().map(Value::Float)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0", Some(0))]
    #[case("-0", Some(0))]
    #[case("9223372036854775807", Some(i64::MAX))]
    #[case("-9223372036854775808", Some(i64::MIN))]
    #[case("9223372036854775808", None)]
    #[case("-9223372036854775809", None)]
    #[case("12a", None)]
    #[case("-", None)]
    fn bounded_parsing_covers_extremes(#[case] text: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_bounded(text.as_bytes(), i64::MIN, i64::MAX), expected);
    }

    #[test]
    fn int_bounds_are_exact() {
        let (min, max) = (i32::MIN.into(), i32::MAX.into());
        assert_eq!(parse_bounded(b"2147483647", min, max), Some(2_147_483_647));
        assert_eq!(parse_bounded(b"-2147483648", min, max), Some(-2_147_483_648));
        assert_eq!(parse_bounded(b"2147483648", min, max), None);
    }
}
