//! A lenient single-pass JSON parser with reference resolution and gated
//! typed decoding.
//!
//! The [`Scanner`] tokenizes one complete input; the [`JsonParser`] builds a
//! [`Value`] tree from it. On top of standard JSON the parser understands:
//!
//! - leniencies selected through [`ParserOptions`]: comments, unquoted and
//!   single-quoted keys, stray commas, non-string keys, `undefined`;
//! - `$ref` objects (`@`, `..`, `$` and JSONPath back-references), which
//!   become shared or cyclic links between containers;
//! - the type key (`@type` by default), which turns an object into a
//!   [`Bean`] after the auto-type gate in [`ParserConfig`] approves the name;
//! - typed decoding into [`TypeDescriptor`]s, with speculative field
//!   matchers on the fast path.
//!
//! ```rust
//! use jsonloom::{ParserOptions, Value};
//!
//! let value = jsonloom::parse_with("{a: [1, 2.50], b: 'x'}", ParserOptions::lenient()).unwrap();
//! assert_eq!(value.get("b"), Some(Value::from("x")));
//! assert_eq!(value.to_string(), r#"{"a":[1,2.50],"b":"x"}"#);
//!
//! let cyclic = jsonloom::parse(r#"{"name":"root","self":{"$ref":"@"}}"#).unwrap();
//! assert!(cyclic.get("self").unwrap().same_container(&cyclic));
//! ```
#![allow(missing_docs)]

mod binder;
mod config;
mod error;
mod options;
mod parser;
mod path;
pub mod scanner;
mod security;
mod symbols;
mod types;
mod value;

#[cfg(test)]
mod tests;

pub use binder::{CastError, DescriptorBinder, FieldBinder, cast};
pub use config::{AutoTypeSettings, DEFAULT_TYPE_KEY, ParserConfig};
pub use error::{ErrorKind, ParserError, SyntaxError};
pub use options::ParserOptions;
pub use parser::{JsonParser, MAX_NESTING_DEPTH, REF_KEY};
pub use path::{JsonPath, PathError, Segment};
pub use scanner::{FieldMatch, Scanner, TokenKind};
pub use security::{AutoTypeError, MAX_NAME_LEN, MIN_NAME_LEN};
pub use symbols::SymbolTable;
pub use types::{
    ARRAY_TYPE, Capability, DeclaredType, FieldDescriptor, OBJECT_TYPE, TypeBuilder, TypeDescriptor, TypeKind,
    TypeLoader, TypeRef, TypeRegistry,
};
pub use value::{Array, ArrayKind, Bean, Decimal, Map, Object, ParseDecimalError, TypedObject, Value};

/// Parses standard JSON with the global configuration.
///
/// # Errors
///
/// See [`JsonParser::parse`].
pub fn parse(text: &str) -> Result<Value, ParserError> {
    parse_with(text, ParserOptions::default())
}

/// Parses `text` under `options` with the global configuration.
///
/// # Errors
///
/// See [`JsonParser::parse`].
pub fn parse_with(text: &str, options: ParserOptions) -> Result<Value, ParserError> {
    JsonParser::new(text, options).parse()
}

/// Parses standard JSON as an instance of `ty`.
///
/// # Errors
///
/// See [`JsonParser::parse_typed`].
pub fn parse_typed(text: &str, ty: &TypeRef) -> Result<Value, ParserError> {
    parse_typed_with(text, ty, ParserOptions::default())
}

/// Parses `text` under `options` as an instance of `ty`.
///
/// # Errors
///
/// See [`JsonParser::parse_typed`].
pub fn parse_typed_with(text: &str, ty: &TypeRef, options: ParserOptions) -> Result<Value, ParserError> {
    JsonParser::new(text, options).parse_typed(ty)
}

/// Parses `text` under `options` as a value of `declared`.
///
/// ```rust
/// use jsonloom::{DeclaredType, ParserOptions};
///
/// let ints = DeclaredType::list_of(DeclaredType::Long);
/// let value = jsonloom::parse_as("[1, \"2\", 3.0]", &ints, ParserOptions::default()).unwrap();
/// assert_eq!(value.to_string(), "[1,2,3]");
/// ```
///
/// # Errors
///
/// See [`JsonParser::parse_as`].
pub fn parse_as(text: &str, declared: &DeclaredType, options: ParserOptions) -> Result<Value, ParserError> {
    JsonParser::new(text, options).parse_as(declared)
}

/// Runs the global configuration's auto-type gate for `name`.
///
/// # Errors
///
/// See [`ParserConfig::check_auto_type`].
pub fn check_auto_type(
    name: &str,
    expected: Option<&TypeRef>,
    options: &ParserOptions,
) -> Result<TypeRef, AutoTypeError> {
    ParserConfig::global().check_auto_type(name, expected, options)
}
