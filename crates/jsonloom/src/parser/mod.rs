//! Recursive-descent parser over the [`Scanner`].
//!
//! Overview
//! - [`JsonParser`] turns one complete input into a [`Value`]. Generic
//!   parsing builds objects and arrays; typed parsing (see `typed`) builds
//!   [`Bean`]s from [`TypeDescriptor`](crate::TypeDescriptor) fields.
//! - Token convention: every `parse_*` routine is entered with the first
//!   token of its value current and returns with the token after the value
//!   current. Object keys are read in cursor mode, straight from the
//!   characters after `{` or `,`.
//! - Nesting is bounded by [`MAX_NESTING_DEPTH`] through an explicit counter,
//!   independent of every option.
//!
//! Special keys
//! - The type key (`@type` unless configured otherwise) is passed to the
//!   auto-type gate. An approved object type turns the object into a bean;
//!   map types keep it generic.
//! - `$ref` as the first key of an object replaces the object with the
//!   value it names. `@` is the enclosing container, `..` its parent, `$`
//!   the root; other back-reference paths are recorded as resolve tasks and
//!   patched in after the root value is complete.
//!
//! Contexts
//! - Unless `disable_circular_reference_detect` is set, every container is
//!   registered in a [`ContextStack`] when its first ordinary key is read (or
//!   when it closes empty). Contexts feed `$ref` resolution.
use std::{fmt, sync::Arc};

use tracing::{debug, warn};

use crate::{
    binder::{CastError, DescriptorBinder, FieldBinder},
    config::ParserConfig,
    error::{ParserError, SyntaxError},
    options::ParserOptions,
    path::{FieldName, JsonPath},
    scanner::{Scanner, TokenKind, is_ident_start},
    types::{DeclaredType, TypeKind, TypeRef},
    value::{Array, ArrayKind, Bean, Object, TypedObject, Value},
};

mod context;
mod typed;

use context::{ContextId, ContextStack};

/// Deepest accepted nesting of objects and arrays.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Key that introduces a reference.
pub const REF_KEY: &str = "$ref";

static DEFAULT_BINDER: DescriptorBinder = DescriptorBinder;

/// What a deferred reference points at.
#[derive(Debug)]
enum Reference {
    /// `..` seen inside the given context.
    Parent(ContextId),
    /// A back-reference path from the root.
    Path(JsonPath),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent(_) => f.write_str(".."),
            Self::Path(path) => f.write_str(path.as_str()),
        }
    }
}

/// Where a resolved reference is written.
#[derive(Debug)]
enum Slot {
    Unbound,
    Element(Array, usize),
    Entry(Object, Arc<str>),
    Field(Bean, Arc<str>),
}

impl Slot {
    fn fill(self, value: Value) -> bool {
        match self {
            Self::Unbound => false,
            Self::Element(array, index) => array.set(index, value),
            Self::Entry(object, key) => {
                object.insert(key, value);
                true
            }
            Self::Field(bean, name) => {
                bean.borrow_mut().set(name, value);
                true
            }
        }
    }
}

#[derive(Debug)]
struct ResolveTask {
    reference: Reference,
    slot: Slot,
}

/// Per-container bookkeeping: the field it sits under and whether its
/// context was pushed.
#[derive(Debug)]
struct Frame {
    field: FieldName,
    saved: Option<ContextId>,
    pushed: bool,
}

/// Outcome of a special key.
enum Special {
    /// Not special: read the value after the `:`.
    No,
    /// The current token starts the entry's value.
    Value,
    /// The entry was consumed; the current token follows it.
    Skipped,
    /// The container was replaced and fully consumed.
    Done(Value),
}

enum RefOutcome {
    Resolved(Value),
    Plain(String),
}

/// A parser for one input.
///
/// # Examples
///
/// ```rust
/// use jsonloom::{JsonParser, ParserConfig, ParserOptions};
///
/// let config = ParserConfig::new();
/// let mut parser = JsonParser::with_config("[1, {\"$ref\": \"@\"}]", ParserOptions::default(), &config);
/// let value = parser.parse().unwrap();
/// let array = value.as_array().unwrap();
/// assert!(array.get(1).unwrap().same_container(&value));
/// ```
pub struct JsonParser<'a> {
    lexer: Scanner<'a>,
    options: ParserOptions,
    config: &'a ParserConfig,
    binder: &'a dyn FieldBinder,
    depth: usize,
    track: bool,
    contexts: ContextStack,
    resolve_tasks: Vec<ResolveTask>,
    needs_resolve: bool,
}

impl<'a> JsonParser<'a> {
    /// A parser using the [global](ParserConfig::global) configuration.
    #[must_use]
    pub fn new(text: &'a str, options: ParserOptions) -> Self {
        Self::with_config(text, options, ParserConfig::global())
    }

    #[must_use]
    pub fn with_config(text: &'a str, options: ParserOptions, config: &'a ParserConfig) -> Self {
        Self {
            lexer: Scanner::new(text, options, config.symbols()),
            options,
            config,
            binder: &DEFAULT_BINDER,
            depth: 0,
            track: options.tracks_contexts(),
            contexts: ContextStack::default(),
            resolve_tasks: Vec::new(),
            needs_resolve: false,
        }
    }

    /// Replaces the [`DescriptorBinder`] used for typed objects.
    #[must_use]
    pub fn with_binder(mut self, binder: &'a dyn FieldBinder) -> Self {
        self.binder = binder;
        self
    }

    #[must_use]
    pub fn lexer(&self) -> &Scanner<'a> {
        &self.lexer
    }

    /// Parses the input as one generic value.
    ///
    /// # Errors
    ///
    /// Fails on malformed input, on nesting deeper than
    /// [`MAX_NESTING_DEPTH`], on a rejected type key and on trailing tokens.
    pub fn parse(&mut self) -> Result<Value, ParserError> {
        self.lexer.next_token()?;
        let value = self.parse_any(FieldName::Root)?;
        self.finish(value)
    }

    fn finish(&mut self, value: Value) -> Result<Value, ParserError> {
        let token = self.lexer.token();
        if token != TokenKind::Eof {
            return Err(self.lexer.token_error(SyntaxError::TrailingCharacters(token)));
        }
        self.handle_resolve_tasks(&value);
        Ok(value)
    }

    fn handle_resolve_tasks(&mut self, root: &Value) {
        if self.resolve_tasks.is_empty() {
            return;
        }
        debug!(tasks = self.resolve_tasks.len(), "resolving deferred references");
        let index = self.contexts.path_index();
        for task in std::mem::take(&mut self.resolve_tasks) {
            let target = match &task.reference {
                Reference::Parent(id) => self.contexts.parent(*id).map(|p| self.contexts.object(p)),
                Reference::Path(path) => index
                    .lookup(path)
                    .map(|id| self.contexts.object(id))
                    .or_else(|| path.evaluate(root)),
            };
            let value = target.unwrap_or_else(|| {
                warn!(reference = %task.reference, "reference left unresolved");
                Value::Null
            });
            if !task.slot.fill(value) {
                warn!(reference = %task.reference, "reference has no slot to fill");
            }
        }
    }

    /// An error for the current token when `expected` was wanted.
    fn unexpected(&self, expected: &'static str) -> ParserError {
        match self.lexer.token() {
            TokenKind::Eof => self.lexer.token_error(SyntaxError::UnexpectedEndOfInput),
            found => self.lexer.token_error(SyntaxError::UnexpectedToken { expected, found }),
        }
    }

    fn enter(&mut self, field: FieldName) -> Result<Frame, ParserError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.lexer.token_error(SyntaxError::NestingTooDeep(MAX_NESTING_DEPTH)));
        }
        Ok(Frame {
            field,
            saved: self.contexts.current(),
            pushed: false,
        })
    }

    fn leave(&mut self, frame: Frame) {
        if frame.pushed {
            self.contexts.restore(frame.saved);
        }
        self.depth -= 1;
    }

    fn ensure_context(&mut self, frame: &mut Frame, object: &Value) {
        if self.track && !frame.pushed {
            self.contexts.push(object.clone(), frame.field.clone());
            frame.pushed = true;
        }
    }

    /// Points the current context at `object` after its container was
    /// replaced.
    fn replace_context(&mut self, frame: &Frame, object: Value) {
        if frame.pushed {
            if let Some(id) = self.contexts.current() {
                self.contexts.replace_object(id, object);
            }
        }
    }

    /// Gives the most recent deferred reference its slot.
    fn bind_pending(&mut self, slot: impl FnOnce() -> Slot) {
        if self.needs_resolve {
            if let Some(task) = self.resolve_tasks.last_mut() {
                task.slot = slot();
            }
            self.needs_resolve = false;
        }
    }

    fn defer(&mut self, reference: Reference) {
        debug!(%reference, "reference deferred");
        self.resolve_tasks.push(ResolveTask {
            reference,
            slot: Slot::Unbound,
        });
        self.needs_resolve = true;
    }

    /// Parses any value starting at the current token.
    pub(crate) fn parse_any(&mut self, field: FieldName) -> Result<Value, ParserError> {
        let value = match self.lexer.token() {
            TokenKind::LBrace => return self.parse_object(field),
            TokenKind::LBracket => return self.parse_array(field, None),
            TokenKind::LiteralString => Value::String(self.lexer.string_val().into_owned()),
            TokenKind::LiteralIsoDate => match self.lexer.date_value() {
                Some(date) => Value::Date(date),
                None => Value::String(self.lexer.string_val().into_owned()),
            },
            TokenKind::LiteralInt => self.lexer.integer_value()?,
            TokenKind::LiteralFloat => self.lexer.float_value(self.options.use_big_decimal)?,
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Null => Value::Null,
            TokenKind::HexBlob => Value::Bytes(self.lexer.bytes_value()),
            TokenKind::Identifier if self.lexer.string_val() == "undefined" => Value::Null,
            TokenKind::Eof if self.lexer.is_blank_input() => return Ok(Value::Null),
            _ => return Err(self.unexpected("value")),
        };
        self.lexer.next_token()?;
        Ok(value)
    }

    /// Reads an object key in cursor mode, through its `:`. Returns `None`
    /// once the closing `}` is the current token.
    fn read_key(&mut self, mut after_comma: bool) -> Result<Option<Arc<str>>, ParserError> {
        let key = loop {
            self.lexer.skip_whitespace()?;
            if self.lexer.is_eof() {
                return Err(self.lexer.error(SyntaxError::UnexpectedEndOfInput));
            }
            match self.lexer.current() {
                b'"' => break self.lexer.scan_symbol(b'"')?,
                b'\'' if self.options.allow_single_quotes => break self.lexer.scan_symbol(b'\'')?,
                b'}' => {
                    if after_comma && !self.options.allow_arbitrary_commas {
                        return Err(self.lexer.error(SyntaxError::UnexpectedCharacter {
                            expected: "field name",
                            found: '}',
                        }));
                    }
                    self.lexer.next_token()?;
                    return Ok(None);
                }
                b',' if self.options.allow_arbitrary_commas => {
                    self.lexer.advance();
                    after_comma = true;
                }
                b'-' | b'0'..=b'9' | b'{' | b'[' => {
                    if !self.options.non_string_key_as_string {
                        return Err(self.lexer.error(SyntaxError::NonStringKey));
                    }
                    let (key, colon) = self.non_string_key()?;
                    if colon {
                        return Ok(Some(key));
                    }
                    break key;
                }
                b if is_ident_start(b) && self.options.allow_unquoted_field_names => {
                    break self.lexer.scan_symbol_unquoted();
                }
                _ => {
                    return Err(self.lexer.error(SyntaxError::UnexpectedCharacter {
                        expected: "field name",
                        found: self.lexer.current_char(),
                    }));
                }
            }
        };
        self.expect_colon()?;
        Ok(Some(key))
    }

    fn expect_colon(&mut self) -> Result<(), ParserError> {
        self.lexer.skip_whitespace()?;
        if self.lexer.is_eof() {
            return Err(self.lexer.error(SyntaxError::UnexpectedEndOfInput));
        }
        if self.lexer.current() != b':' {
            return Err(self.lexer.error(SyntaxError::UnexpectedCharacter {
                expected: "':'",
                found: self.lexer.current_char(),
            }));
        }
        self.lexer.advance();
        Ok(())
    }

    /// Reads a number or structure used as a key and returns its text.
    /// The flag tells whether the `:` after it was already consumed.
    fn non_string_key(&mut self) -> Result<(Arc<str>, bool), ParserError> {
        match self.lexer.next_token()? {
            TokenKind::LiteralInt | TokenKind::LiteralFloat => {
                let text = self.lexer.number_text();
                Ok((self.lexer.intern(text), false))
            }
            _ => {
                let track = std::mem::replace(&mut self.track, false);
                let key = self.parse_any(FieldName::Root);
                self.track = track;
                let key = key?.to_string();
                if self.lexer.token() != TokenKind::Colon {
                    return Err(self.unexpected("':'"));
                }
                Ok((self.lexer.intern(&key), true))
            }
        }
    }

    /// Checks the token after an entry. Returns `true` on `,`.
    fn entry_separator(&self, key: &Arc<str>) -> Result<bool, ParserError> {
        match self.lexer.token() {
            TokenKind::Comma => Ok(true),
            TokenKind::RBrace => Ok(false),
            _ => Err(self.unexpected("',' or '}'").with_field(key)),
        }
    }

    fn parse_object(&mut self, field: FieldName) -> Result<Value, ParserError> {
        let mut frame = self.enter(field)?;
        let object = Object::new();
        let mut after_comma = false;
        loop {
            let Some(key) = self.read_key(after_comma)? else {
                self.ensure_context(&mut frame, &Value::Object(object.clone()));
                break;
            };
            let special = if self.options.detects_special_keys() {
                self.object_special_key(&object, &key, &mut frame)?
            } else {
                Special::No
            };
            match special {
                Special::Done(value) => {
                    self.leave(frame);
                    return Ok(value);
                }
                Special::Skipped => {}
                Special::No | Special::Value => {
                    self.ensure_context(&mut frame, &Value::Object(object.clone()));
                    if matches!(special, Special::No) {
                        self.lexer.next_token()?;
                    }
                    let value = self.parse_any(FieldName::Key(key.clone()))?;
                    object.insert(key.clone(), value);
                    self.bind_pending(|| Slot::Entry(object.clone(), key.clone()));
                }
            }
            if !self.entry_separator(&key)? {
                break;
            }
            after_comma = true;
        }
        if !self.options.ordered_field {
            object.sort_keys();
        }
        self.lexer.next_token()?;
        self.leave(frame);
        Ok(Value::Object(object))
    }

    fn object_special_key(&mut self, object: &Object, key: &Arc<str>, frame: &mut Frame) -> Result<Special, ParserError> {
        if **key == *self.config.type_key() {
            return self.generic_type_key(object, key, frame);
        }
        if &**key == REF_KEY && object.is_empty() && self.can_reference() {
            return Ok(match self.parse_reference(key)? {
                RefOutcome::Resolved(value) => Special::Done(value),
                RefOutcome::Plain(text) => {
                    object.insert(key.clone(), Value::String(text));
                    Special::Skipped
                }
            });
        }
        Ok(Special::No)
    }

    /// The type key inside a generic object.
    fn generic_type_key(&mut self, object: &Object, key: &Arc<str>, frame: &mut Frame) -> Result<Special, ParserError> {
        self.lexer.next_token()?;
        if self.lexer.token() != TokenKind::LiteralString {
            return Ok(Special::Value);
        }
        let name = self.lexer.string_val();
        if self.options.ignore_auto_type {
            self.lexer.next_token()?;
            return Ok(Special::Skipped);
        }
        if name.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Special::Value);
        }
        let ty = self.check_type(&name, None, key)?;
        match ty.kind() {
            TypeKind::Map => {
                self.lexer.next_token()?;
                Ok(Special::Skipped)
            }
            TypeKind::List => Err(self
                .lexer
                .token_error(CastError::new(
                    &DeclaredType::Named(ty.name().into()),
                    &Value::Object(object.clone()),
                ))
                .with_field(key)),
            TypeKind::Bean => {
                self.lexer.next_token()?;
                let bean = if object.is_empty() {
                    Bean::new(TypedObject::new(ty))
                } else {
                    self.object_to_bean(object, &ty).map_err(|e| self.lexer.token_error(e).with_field(key))?
                };
                self.replace_context(frame, Value::Bean(bean.clone()));
                match self.lexer.token() {
                    TokenKind::RBrace => {
                        self.lexer.next_token()?;
                        Ok(Special::Done(Value::Bean(bean)))
                    }
                    TokenKind::Comma => self.bean_fields(bean, frame, true).map(Special::Done),
                    _ => Err(self.unexpected("',' or '}'").with_field(key)),
                }
            }
        }
    }

    /// Runs the gate, mapping a rejection to an error at the type name.
    fn check_type(&self, name: &str, expected: Option<&TypeRef>, key: &Arc<str>) -> Result<TypeRef, ParserError> {
        self.config
            .check_auto_type(name, expected, &self.options)
            .map_err(|e| self.lexer.token_error(e).with_field(key))
    }

    fn can_reference(&self) -> bool {
        self.track && self.contexts.current().is_some()
    }

    /// Reads the value of a `$ref` entry and what it refers to. A `$ref`
    /// followed by more entries is plain data, left for the caller to store.
    fn parse_reference(&mut self, key: &Arc<str>) -> Result<RefOutcome, ParserError> {
        let token = self.lexer.next_token()?;
        if !matches!(token, TokenKind::LiteralString | TokenKind::LiteralIsoDate) {
            return Err(self
                .lexer
                .token_error(SyntaxError::IllegalReference(token))
                .with_field(key));
        }
        let text = self.lexer.string_val().into_owned();
        match self.lexer.next_token()? {
            TokenKind::Comma => return Ok(RefOutcome::Plain(text)),
            TokenKind::RBrace => {}
            _ => return Err(self.unexpected("'}'").with_field(key)),
        }
        let Some(current) = self.contexts.current() else {
            return Err(self.lexer.token_error(SyntaxError::IllegalReference(token)).with_field(key));
        };
        let value = match text.as_str() {
            "@" => self.contexts.object(current),
            ".." => match self.contexts.parent(current) {
                Some(parent) => self.contexts.object(parent),
                None => {
                    self.defer(Reference::Parent(current));
                    Value::Null
                }
            },
            "$" => self.contexts.object(self.contexts.root_of(current)),
            _ => match JsonPath::compile(&text) {
                Ok(path) if path.is_back_reference() => {
                    self.defer(Reference::Path(path));
                    Value::Null
                }
                _ => Value::Object(Object::from_iter([(REF_KEY, Value::String(text))])),
            },
        };
        self.lexer.next_token()?;
        Ok(RefOutcome::Resolved(value))
    }

    fn parse_array(&mut self, field: FieldName, element: Option<&DeclaredType>) -> Result<Value, ParserError> {
        let mut frame = self.enter(field)?;
        let kind = if self.options.use_object_array {
            ArrayKind::ObjectArray
        } else {
            ArrayKind::List
        };
        let array = Array::with_kind(kind);
        self.ensure_context(&mut frame, &Value::Array(array.clone()));
        let mut token = self.lexer.next_token()?;
        let mut index = 0;
        loop {
            match token {
                TokenKind::RBracket => break,
                TokenKind::Comma if self.options.allow_arbitrary_commas => {
                    token = self.lexer.next_token()?;
                    continue;
                }
                _ => {}
            }
            let value = match element {
                Some(declared) => self.parse_field_value(declared, FieldName::Index(index))?,
                None => self.parse_any(FieldName::Index(index))?,
            };
            array.push(value);
            self.bind_pending(|| Slot::Element(array.clone(), index));
            index += 1;
            match self.lexer.token() {
                TokenKind::Comma => {
                    token = self.lexer.next_token()?;
                    if token == TokenKind::RBracket && !self.options.allow_arbitrary_commas {
                        return Err(self.unexpected("value"));
                    }
                }
                TokenKind::RBracket => break,
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
        self.lexer.next_token()?;
        self.leave(frame);
        Ok(Value::Array(array))
    }
}

impl fmt::Debug for JsonParser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonParser")
            .field("lexer", &self.lexer)
            .field("options", &self.options)
            .field("depth", &self.depth)
            .field("contexts", &self.contexts.len())
            .field("resolve_tasks", &self.resolve_tasks.len())
            .finish_non_exhaustive()
    }
}
