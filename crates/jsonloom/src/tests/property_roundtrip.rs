use quickcheck::{QuickCheck, TestResult};

use super::arbitrary::{Leniency, Tree};
use crate::{JsonParser, ParserConfig, ParserOptions};

/// Property: rendering a tree and parsing the text back yields an equal
/// tree, under any leniency.
#[test]
fn display_roundtrip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(tree: Tree, leniency: Leniency) -> bool {
        let config = ParserConfig::new();
        let text = tree.0.to_string();
        let options = ParserOptions {
            ordered_field: true,
            disable_special_key_detect: true,
            ..leniency.0
        };
        match JsonParser::with_config(&text, options, &config).parse() {
            Ok(parsed) => parsed == tree.0,
            Err(_) => false,
        }
    }

    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;

    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(Tree, Leniency) -> bool);
}

/// Property: arbitrary text never panics the parser; it either parses or
/// fails with an error carrying an in-bounds offset.
#[test]
fn arbitrary_text_never_panics_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(text: String, leniency: Leniency) -> TestResult {
        let config = ParserConfig::new();
        match JsonParser::with_config(&text, leniency.0, &config).parse() {
            Ok(_) => TestResult::passed(),
            Err(e) => TestResult::from_bool(e.offset <= text.len() && e.line >= 1 && e.column >= 1),
        }
    }

    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;

    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(String, Leniency) -> TestResult);
}
