use std::borrow::Cow;

use rstest::rstest;

use super::*;
use crate::error::ErrorKind;

fn scan(text: &str, options: ParserOptions, table: &SymbolTable, f: impl FnOnce(&mut Scanner<'_>)) {
    let mut s = Scanner::new(text, options, table);
    f(&mut s);
}

fn tokens(text: &str, options: ParserOptions) -> Vec<TokenKind> {
    let table = SymbolTable::new(16);
    let mut s = Scanner::new(text, options, &table);
    let mut out = Vec::new();
    loop {
        let token = s.next_token().unwrap();
        out.push(token);
        if token == TokenKind::Eof {
            return out;
        }
    }
}

#[test]
fn classifies_punctuation_and_keywords() {
    use TokenKind::*;
    assert_eq!(
        tokens(r#"{ "a" : [ 1 , 2.5 , true , false , null , x'0A' ] } undefined"#, ParserOptions::default()),
        vec![
            LBrace, LiteralString, Colon, LBracket, LiteralInt, Comma, LiteralFloat, Comma, True, Comma, False,
            Comma, Null, Comma, HexBlob, RBracket, RBrace, Identifier, Eof
        ]
    );
}

#[test]
fn keywords_need_a_delimiter() {
    assert_eq!(
        tokens("truex nullable", ParserOptions::default()),
        vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
    );
}

#[test]
fn plain_strings_are_borrowed() {
    let table = SymbolTable::new(16);
    scan(r#""plain text""#, ParserOptions::default(), &table, |s| {
        s.next_token().unwrap();
        assert!(matches!(s.string_val(), Cow::Borrowed("plain text")));
    });
}

#[rstest]
#[case(r#""a\nb""#, "a\nb")]
#[case(r#""\"\\\/""#, "\"\\/")]
#[case(r#""\u0041\u00e9""#, "A\u{e9}")]
#[case(r#""\ud83d\ude00""#, "\u{1F600}")]
#[case(r#""\ud83dx""#, "\u{FFFD}x")]
#[case(r#""\ude00""#, "\u{FFFD}")]
#[case(r#""\x41\xe9""#, "A\u{e9}")]
#[case(r#""\v\F\0\7""#, "\u{B}\u{C}\u{0}\u{7}")]
#[case(r#""pre\tpost""#, "pre\tpost")]
fn escapes_decode_into_owned_strings(#[case] text: &str, #[case] expected: &str) {
    let table = SymbolTable::new(16);
    scan(text, ParserOptions::default(), &table, |s| {
        assert_eq!(s.next_token().unwrap(), TokenKind::LiteralString);
        let value = s.string_val();
        assert!(matches!(value, Cow::Owned(_)));
        assert_eq!(value, expected);
    });
}

#[rstest]
#[case(r#""\q""#)]
#[case(r#""\x4""#)]
#[case(r#""\u12G4""#)]
#[case(r#""open"#)]
#[case(r#""trailing\"#)]
fn malformed_strings_fail(#[case] text: &str) {
    let table = SymbolTable::new(16);
    scan(text, ParserOptions::default(), &table, |s| {
        let err = s.next_token().unwrap_err();
        assert!(err.is_syntax(), "{err}");
    });
}

#[test]
fn single_quotes_are_gated() {
    let table = SymbolTable::new(16);
    scan("'it'", ParserOptions::default(), &table, |s| {
        assert!(s.next_token().is_err());
        assert_eq!(s.token(), TokenKind::Error);
    });
    let options = ParserOptions {
        allow_single_quotes: true,
        ..Default::default()
    };
    scan(r"'it\'s'", options, &table, |s| {
        assert_eq!(s.next_token().unwrap(), TokenKind::LiteralString);
        assert_eq!(s.string_val(), "it's");
    });
}

#[test]
fn comments_are_gated_and_checked() {
    let with_comments = ParserOptions {
        allow_comments: true,
        ..Default::default()
    };
    assert_eq!(
        tokens("// line\n1 /* block */ 2", with_comments),
        vec![TokenKind::LiteralInt, TokenKind::LiteralInt, TokenKind::Eof]
    );
    let table = SymbolTable::new(16);
    scan("/* open", with_comments, &table, |s| {
        let err = s.next_token().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Syntax(SyntaxError::UnterminatedComment));
    });
    scan("/x", with_comments, &table, |s| {
        let err = s.next_token().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Syntax(SyntaxError::InvalidComment));
    });
    scan("// x\n1", ParserOptions::default(), &table, |s| {
        assert!(s.next_token().is_err());
    });
}

#[rstest]
#[case("0", TokenKind::LiteralInt)]
#[case("-12", TokenKind::LiteralInt)]
#[case("12L", TokenKind::LiteralInt)]
#[case("7S", TokenKind::LiteralInt)]
#[case("1.5", TokenKind::LiteralFloat)]
#[case("1e10", TokenKind::LiteralFloat)]
#[case("-1.5E-3", TokenKind::LiteralFloat)]
#[case("3F", TokenKind::LiteralFloat)]
#[case("2.5D", TokenKind::LiteralFloat)]
fn numbers_are_classified(#[case] text: &str, #[case] expected: TokenKind) {
    let table = SymbolTable::new(16);
    scan(text, ParserOptions::default(), &table, |s| {
        assert_eq!(s.next_token().unwrap(), expected);
        assert_eq!(s.number_text(), text);
        assert!(s.is_eof());
    });
}

#[rstest]
#[case("-")]
#[case("1.")]
#[case("1.e5")]
#[case("1e")]
#[case("1e+")]
fn malformed_numbers_fail(#[case] text: &str) {
    let table = SymbolTable::new(16);
    scan(text, ParserOptions::default(), &table, |s| {
        assert_eq!(
            s.next_token().unwrap_err().kind(),
            &ErrorKind::Syntax(SyntaxError::InvalidNumber)
        );
    });
}

#[test]
fn number_length_is_capped() {
    let table = SymbolTable::new(16);
    let at_cap = "1".repeat(MAX_NUMBER_LENGTH);
    scan(&at_cap, ParserOptions::default(), &table, |s| {
        assert_eq!(s.next_token().unwrap(), TokenKind::LiteralInt);
    });
    let over = "1".repeat(MAX_NUMBER_LENGTH + 1);
    scan(&over, ParserOptions::default(), &table, |s| {
        assert_eq!(
            s.next_token().unwrap_err().kind(),
            &ErrorKind::Syntax(SyntaxError::NumberTooLong(MAX_NUMBER_LENGTH))
        );
    });
}

#[test]
fn integer_values_widen_to_big_int() {
    let table = SymbolTable::new(16);
    scan("9223372036854775807", ParserOptions::default(), &table, |s| {
        s.next_token().unwrap();
        assert_eq!(s.integer_value().unwrap(), crate::Value::Int(i64::MAX));
        assert!(s.int_value().is_err());
    });
    scan("-92233720368547758090", ParserOptions::default(), &table, |s| {
        s.next_token().unwrap();
        let value = s.integer_value().unwrap();
        assert_eq!(value.to_string(), "-92233720368547758090");
        assert!(matches!(value, crate::Value::BigInt(_)));
        assert!(s.long_value().is_err());
    });
}

#[test]
fn float_values_respect_decimal_mode() {
    let table = SymbolTable::new(16);
    scan("0.1000", ParserOptions::default(), &table, |s| {
        s.next_token().unwrap();
        assert_eq!(s.float_value(true).unwrap().to_string(), "0.1000");
        assert_eq!(s.float_value(false).unwrap(), crate::Value::Float(0.1));
    });
    scan("0.5F", ParserOptions::default(), &table, |s| {
        s.next_token().unwrap();
        assert_eq!(s.float_value(true).unwrap(), crate::Value::Float(0.5));
    });
}

#[test]
fn next_token_expect_matches_next_token() {
    let table = SymbolTable::new(16);
    for (text, expected) in [
        ("{", TokenKind::LBrace),
        ("  {", TokenKind::LBrace),
        (":", TokenKind::Colon),
        ("\"s\"", TokenKind::LiteralString),
        ("42", TokenKind::LiteralInt),
        ("]", TokenKind::LBrace),
    ] {
        let mut fast = Scanner::new(text, ParserOptions::default(), &table);
        let mut slow = Scanner::new(text, ParserOptions::default(), &table);
        assert_eq!(fast.next_token_expect(expected).unwrap(), slow.next_token().unwrap());
        assert_eq!(fast.position(), slow.position());
    }
}

#[test]
fn illegal_character_reports_position() {
    let table = SymbolTable::new(16);
    scan("[1,\n  #]", ParserOptions::default(), &table, |s| {
        for _ in 0..3 {
            s.next_token().unwrap();
        }
        let err = s.next_token().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Syntax(SyntaxError::InvalidCharacter('#')));
        assert_eq!((err.offset, err.line, err.column), (6, 2, 3));
        assert_eq!(s.token(), TokenKind::Error);
    });
}

#[test]
fn symbols_are_interned() {
    let table = SymbolTable::new(16);
    let mut s = Scanner::new(r#""key" "key" key"#, ParserOptions::default(), &table);
    let a = s.scan_symbol(b'"').unwrap();
    s.skip_whitespace().unwrap();
    let b = s.scan_symbol(b'"').unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    s.skip_whitespace().unwrap();
    assert_eq!(&*s.scan_symbol_unquoted(), "key");
}

#[test]
fn mark_and_reset_restore_everything() {
    let table = SymbolTable::new(16);
    let mut s = Scanner::new("[1, 2]", ParserOptions::default(), &table);
    s.next_token().unwrap();
    let mark = s.mark();
    s.next_token().unwrap();
    s.next_token().unwrap();
    s.reset(mark);
    assert_eq!(s.token(), TokenKind::LBracket);
    assert_eq!(s.position(), 1);
    assert_eq!(s.current(), b'1');
}

#[test]
fn end_of_input_yields_sentinel() {
    let table = SymbolTable::new(16);
    let mut s = Scanner::new("1", ParserOptions::default(), &table);
    assert_eq!(s.char_at(5), EOI);
    s.next_token().unwrap();
    assert!(s.is_eof());
    assert_eq!(s.current(), EOI);
    assert_eq!(s.next_token().unwrap(), TokenKind::Eof);
    assert_eq!(s.next_token().unwrap(), TokenKind::Eof);
}

#[test]
fn embedded_sentinel_byte_is_not_end_of_input() {
    let table = SymbolTable::new(16);
    let mut s = Scanner::new("\"a\u{1A}b\"", ParserOptions::default(), &table);
    assert_eq!(s.next_token().unwrap(), TokenKind::LiteralString);
    assert_eq!(s.string_val(), "a\u{1A}b");
}

#[test]
fn iso_dates_in_strings_are_recognized_when_enabled() {
    let table = SymbolTable::new(16);
    let options = ParserOptions {
        allow_iso8601_date_format: true,
        ..Default::default()
    };
    scan(r#""2021-06-01T10:00:00Z" "2021-06-01 later""#, options, &table, |s| {
        assert_eq!(s.next_token().unwrap(), TokenKind::LiteralIsoDate);
        assert!(s.date_value().is_some());
        assert_eq!(s.next_token().unwrap(), TokenKind::LiteralString);
    });
    scan(r#""2021-06-01""#, ParserOptions::default(), &table, |s| {
        assert_eq!(s.next_token().unwrap(), TokenKind::LiteralString);
    });
}

#[test]
fn scan_date_at_cursor_leaves_cursor_on_failure() {
    let table = SymbolTable::new(16);
    let mut s = Scanner::new("not a date", ParserOptions::default(), &table);
    assert!(!s.scan_iso8601_like_date(false));
    assert_eq!(s.position(), 0);
    let mut s = Scanner::new("2021-06-01,", ParserOptions::default(), &table);
    assert!(s.scan_iso8601_like_date(false));
    assert_eq!(s.current(), b',');
    let mut s = Scanner::new("2021-06-01,", ParserOptions::default(), &table);
    assert!(!s.scan_iso8601_like_date(true));
}

#[test]
fn hex_blobs_decode() {
    let table = SymbolTable::new(16);
    scan("x'00ff10'", ParserOptions::default(), &table, |s| {
        assert_eq!(s.next_token().unwrap(), TokenKind::HexBlob);
        assert_eq!(s.bytes_value(), vec![0x00, 0xFF, 0x10]);
    });
    scan("x'abc'", ParserOptions::default(), &table, |s| {
        assert!(s.next_token().is_err());
    });
}

mod field_matchers {
    use super::*;
    use crate::value::Decimal;

    fn at_key<'a>(text: &'a str, table: &'a SymbolTable) -> Scanner<'a> {
        let mut s = Scanner::new(text, ParserOptions::default(), table);
        s.next_token().unwrap();
        s
    }

    #[test]
    fn matches_value_followed_by_comma() {
        let table = SymbolTable::new(16);
        let mut s = at_key(r#"{"id":42,"name":"x"}"#, &table);
        assert_eq!(s.scan_field_int("id"), FieldMatch::Value(42));
        assert_eq!(s.token(), TokenKind::Comma);
        assert_eq!(s.scan_field_string("name"), FieldMatch::End(Some("x".to_owned())));
        assert_eq!(s.token(), TokenKind::Eof);
    }

    #[test]
    fn end_classifies_the_following_token() {
        let table = SymbolTable::new(16);
        let mut s = at_key(r#"{"a":1} ]"#, &table);
        assert_eq!(s.scan_field_long("a"), FieldMatch::End(1));
        assert_eq!(s.token(), TokenKind::RBracket);
    }

    #[test]
    fn name_mismatch_leaves_cursor() {
        let table = SymbolTable::new(16);
        let mut s = at_key(r#"{"other":1}"#, &table);
        let before = s.mark();
        assert_eq!(s.scan_field_int("id"), FieldMatch::NameMismatch);
        assert_eq!(s.mark(), before);
        assert_eq!(s.scan_field_int("oth"), FieldMatch::NameMismatch);
        assert_eq!(s.mark(), before);
    }

    #[test]
    fn value_mismatch_leaves_cursor() {
        let table = SymbolTable::new(16);
        for text in [
            r#"{"id":1.5}"#,
            r#"{"id":"x"}"#,
            r#"{"id":99999999999}"#,
            r#"{"id":1 2}"#,
            r#"{"id":1L}"#,
        ] {
            let mut s = at_key(text, &table);
            let before = s.mark();
            assert_eq!(s.scan_field_int("id"), FieldMatch::ValueMismatch, "{text}");
            assert_eq!(s.mark(), before, "{text}");
        }
    }

    #[test]
    fn repeated_mismatch_is_stable() {
        let table = SymbolTable::new(16);
        let mut s = at_key(r#"{"flag":"maybe"}"#, &table);
        assert_eq!(s.scan_field_bool("flag"), FieldMatch::ValueMismatch);
        assert_eq!(s.scan_field_bool("flag"), FieldMatch::ValueMismatch);
        assert_eq!(s.scan_field_string("flag"), FieldMatch::End(Some("maybe".to_owned())));
    }

    #[rstest]
    #[case(r#"{"f":true}"#, true)]
    #[case(r#"{"f":"false"}"#, false)]
    #[case(r#"{"f":1}"#, true)]
    #[case(r#"{"f":0}"#, false)]
    fn bool_forms(#[case] text: &str, #[case] expected: bool) {
        let table = SymbolTable::new(16);
        let mut s = at_key(text, &table);
        assert_eq!(s.scan_field_bool("f"), FieldMatch::End(expected));
    }

    #[test]
    fn string_accepts_null_and_escapes() {
        let table = SymbolTable::new(16);
        let mut s = at_key(r#"{"a":null,"b":"x\ty"}"#, &table);
        assert_eq!(s.scan_field_string("a"), FieldMatch::Value(None));
        assert_eq!(s.scan_field_string("b"), FieldMatch::End(Some("x\ty".to_owned())));
    }

    #[test]
    fn numeric_matchers() {
        let table = SymbolTable::new(16);
        let mut s = at_key(r#"{"d":2.5,"q":"7","m":1.10}"#, &table);
        assert_eq!(s.scan_field_double("d"), FieldMatch::Value(2.5));
        assert_eq!(s.scan_field_long("q"), FieldMatch::Value(7));
        assert_eq!(
            s.scan_field_decimal("m"),
            FieldMatch::End("1.10".parse::<Decimal>().unwrap())
        );
    }

    #[test]
    fn date_matcher_accepts_text_and_millis() {
        let table = SymbolTable::new(16);
        let mut s = at_key(r#"{"a":"1970-01-01T00:00:01Z","b":1000}"#, &table);
        let FieldMatch::Value(a) = s.scan_field_date("a") else {
            panic!("text date not matched");
        };
        let FieldMatch::End(b) = s.scan_field_date("b") else {
            panic!("millis date not matched");
        };
        assert_eq!(a, b);
    }

    #[test]
    fn whitespace_before_name_is_allowed() {
        let table = SymbolTable::new(16);
        let mut s = at_key("{\n  \"id\": 3\n}", &table);
        assert_eq!(s.scan_field_int("id"), FieldMatch::End(3));
    }
}
