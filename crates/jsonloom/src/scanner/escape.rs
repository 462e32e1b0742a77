//! Decoding of backslash escapes inside string literals.
//!
//! Besides the JSON escapes this accepts `\v`, `\F`, octal-style `\0`..`\7`,
//! two-digit `\xHH` and four-digit `\uHHHH`. A `\u` high surrogate followed
//! by a `\u` low surrogate decodes as one character; any other surrogate
//! decodes as U+FFFD.
use crate::error::{ParserError, SyntaxError};

use super::Scanner;

pub(super) fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decodes exactly `N` hex digits from the start of `digits`.
fn hex_digits<const N: usize>(digits: &[u8]) -> Option<u32> {
    let digits = digits.get(..N)?;
    digits
        .iter()
        .try_fold(0u32, |acc, &b| Some((acc << 4) | u32::from(hex_digit(b)?)))
}

fn is_high_surrogate(unit: u32) -> bool {
    (0xD800..0xDC00).contains(&unit)
}

fn is_low_surrogate(unit: u32) -> bool {
    (0xDC00..0xE000).contains(&unit)
}

fn combine_surrogates(high: u32, low: u32) -> char {
    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

impl Scanner<'_> {
    /// Decodes the escape whose introducing backslash was just consumed and
    /// appends it to the scratch buffer.
    pub(super) fn scan_escape(&mut self) -> Result<(), ParserError> {
        if self.is_eof() {
            return Err(self.error(SyntaxError::UnterminatedString));
        }
        let decoded = match self.ch {
            c @ b'0'..=b'7' => char::from(c - b'0'),
            b'b' => '\u{8}',
            b'f' | b'F' => '\u{C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'v' => '\u{B}',
            c @ (b'"' | b'\'' | b'/' | b'\\') => char::from(c),
            b'x' => {
                let rest = &self.text.as_bytes()[self.bp + 1..];
                let Some(code) = hex_digits::<2>(rest) else {
                    return Err(self.error(SyntaxError::InvalidEscape('x')));
                };
                self.seek(self.bp + 3);
                // Two hex digits always name a Latin-1 character.
                return self.push_char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            b'u' => return self.scan_unicode_escape(),
            _ => return Err(self.error(SyntaxError::InvalidEscape(self.current_char()))),
        };
        self.advance();
        self.push_char(decoded)
    }

    fn scan_unicode_escape(&mut self) -> Result<(), ParserError> {
        let text = self.text;
        let bytes = text.as_bytes();
        let Some(unit) = hex_digits::<4>(&bytes[self.bp + 1..]) else {
            return Err(self.error(SyntaxError::InvalidEscape('u')));
        };
        self.seek(self.bp + 5);
        let decoded = if is_high_surrogate(unit) {
            let next = &bytes[self.bp..];
            match next.strip_prefix(b"\\u").and_then(hex_digits::<4>) {
                Some(low) if is_low_surrogate(low) => {
                    self.seek(self.bp + 6);
                    combine_surrogates(unit, low)
                }
                _ => char::REPLACEMENT_CHARACTER,
            }
        } else {
            char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER)
        };
        self.push_char(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_digits_decode_mixed_case() {
        assert_eq!(hex_digits::<4>(b"0041"), Some(0x41));
        assert_eq!(hex_digits::<4>(b"AbCd"), Some(0xABCD));
        assert_eq!(hex_digits::<2>(b"fF"), Some(0xFF));
    }

    #[test]
    fn hex_digits_reject_short_or_invalid_input() {
        assert_eq!(hex_digits::<4>(b"00G1"), None);
        assert_eq!(hex_digits::<4>(b"004"), None);
        assert_eq!(hex_digits::<2>(b""), None);
    }

    #[test]
    fn surrogates_combine() {
        assert_eq!(combine_surrogates(0xD83D, 0xDE00), '\u{1F600}');
        assert!(is_high_surrogate(0xD800));
        assert!(!is_high_surrogate(0xDC00));
        assert!(is_low_surrogate(0xDFFF));
    }
}
