//! Typed decoding: objects bound to [`TypeDescriptor`](crate::TypeDescriptor)
//! fields through the parser's [`FieldBinder`](crate::FieldBinder).
//!
//! A typed object first runs the scanner's field matchers over its scalar
//! fields in declaration order. The first miss hands the rest of the object
//! to the general key loop, which binds known keys, parses and drops unknown
//! ones, and honors the type key and `$ref`.
use std::sync::Arc;

use super::{Frame, JsonParser, REF_KEY, RefOutcome, Slot};
use crate::{
    binder::{CastError, cast},
    error::ParserError,
    path::FieldName,
    scanner::{FieldMatch, TokenKind},
    types::{DeclaredType, FieldDescriptor, TypeKind, TypeRef},
    value::{Array, Bean, Map, Object, TypedObject, Value},
};

/// The token a value of `declared` most likely starts with.
fn expected_token(declared: &DeclaredType) -> Option<TokenKind> {
    match declared {
        DeclaredType::Int | DeclaredType::Long => Some(TokenKind::LiteralInt),
        DeclaredType::String => Some(TokenKind::LiteralString),
        DeclaredType::List(_) => Some(TokenKind::LBracket),
        DeclaredType::Map(_) | DeclaredType::Named(_) => Some(TokenKind::LBrace),
        _ => None,
    }
}

impl JsonParser<'_> {
    /// Parses the input as an instance of `ty`.
    ///
    /// # Errors
    ///
    /// As [`JsonParser::parse`], plus cast failures for values that do not
    /// fit their fields.
    pub fn parse_typed(&mut self, ty: &TypeRef) -> Result<Value, ParserError> {
        self.lexer.next_token_expect(TokenKind::LBrace)?;
        let value = if ty.kind() == TypeKind::Bean && self.lexer.token() == TokenKind::LBrace {
            self.parse_bean(ty, FieldName::Root)?
        } else {
            let start = (self.lexer.token_pos(), self.lexer.token());
            let value = self.parse_any(FieldName::Root)?;
            self.convert_at(value, &DeclaredType::Named(ty.name().into()), start, None)?
        };
        self.finish(value)
    }

    /// Parses the input as a value of `declared`.
    ///
    /// # Errors
    ///
    /// As [`JsonParser::parse_typed`].
    pub fn parse_as(&mut self, declared: &DeclaredType) -> Result<Value, ParserError> {
        self.next_value_token(declared)?;
        let value = self.parse_field_value(declared, FieldName::Root)?;
        self.finish(value)
    }

    fn next_value_token(&mut self, declared: &DeclaredType) -> Result<TokenKind, ParserError> {
        match expected_token(declared) {
            Some(expected) => self.lexer.next_token_expect(expected),
            None => self.lexer.next_token(),
        }
    }

    /// Parses a value of `declared` starting at the current token.
    pub(super) fn parse_field_value(&mut self, declared: &DeclaredType, field: FieldName) -> Result<Value, ParserError> {
        let token = self.lexer.token();
        match declared {
            DeclaredType::Named(name) => {
                if let Some(ty) = self.config.resolve_declared(name) {
                    match (ty.kind(), token) {
                        (TypeKind::Bean, TokenKind::LBrace) => return self.parse_bean(&ty, field),
                        (TypeKind::List, TokenKind::LBracket) => return self.parse_array(field, None),
                        _ => {}
                    }
                }
            }
            DeclaredType::List(element) if token == TokenKind::LBracket => {
                return self.parse_array(field, Some(element));
            }
            _ => {}
        }
        let key = match &field {
            FieldName::Key(key) => Some(key.clone()),
            _ => None,
        };
        let start = (self.lexer.token_pos(), token);
        let mut value = self.parse_any(field)?;
        if self.options.trim_string_field_value && *declared == DeclaredType::String {
            if let Value::String(s) = &mut value {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *s = trimmed.to_owned();
                }
            }
        }
        self.convert_at(value, declared, start, key.as_ref())
    }

    /// Converts a value parsed from the token at `start`, reporting failures
    /// there.
    fn convert_at(
        &self,
        value: Value,
        declared: &DeclaredType,
        start: (usize, TokenKind),
        key: Option<&Arc<str>>,
    ) -> Result<Value, ParserError> {
        self.convert(value, declared, &mut Vec::new()).map_err(|e| {
            let error = self.lexer.error_at(start.0, start.1, e);
            match key {
                Some(key) => error.with_field(key),
                None => error,
            }
        })
    }

    /// Parses an object into a new instance of `ty`. The current token is
    /// its `{`.
    pub(super) fn parse_bean(&mut self, ty: &TypeRef, field: FieldName) -> Result<Value, ParserError> {
        let mut frame = self.enter(field)?;
        let bean = Bean::new(TypedObject::new(ty.clone()));
        let mut matched = false;
        for fd in ty.fields() {
            let Some(outcome) = self.match_field(fd) else {
                break;
            };
            let (value, end) = match outcome {
                FieldMatch::Value(value) => (value, false),
                FieldMatch::End(value) => (value, true),
                FieldMatch::NameMismatch | FieldMatch::ValueMismatch => break,
            };
            self.ensure_context(&mut frame, &Value::Bean(bean.clone()));
            self.set_field(&bean, fd, value)?;
            matched = true;
            if end {
                self.leave(frame);
                return Ok(Value::Bean(bean));
            }
        }
        let value = self.bean_fields(bean, &mut frame, matched)?;
        self.leave(frame);
        Ok(value)
    }

    /// Tries the field matcher for `fd`'s declared type, if it has one.
    fn match_field(&mut self, fd: &FieldDescriptor) -> Option<FieldMatch<Value>> {
        let name = fd.name();
        let trim = self.options.trim_string_field_value;
        let outcome = match fd.declared() {
            DeclaredType::Bool => self.lexer.scan_field_bool(name).map(Value::Bool),
            DeclaredType::Int => self.lexer.scan_field_int(name).map(Value::from),
            DeclaredType::Long => self.lexer.scan_field_long(name).map(Value::Int),
            DeclaredType::Double => self.lexer.scan_field_double(name).map(Value::Float),
            DeclaredType::Decimal => self.lexer.scan_field_decimal(name).map(Value::Decimal),
            DeclaredType::Date => self.lexer.scan_field_date(name).map(Value::Date),
            DeclaredType::String => self.lexer.scan_field_string(name).map(|s| match s {
                Some(s) if trim => Value::String(s.trim().to_owned()),
                Some(s) => Value::String(s),
                None => Value::Null,
            }),
            _ => return None,
        };
        Some(outcome)
    }

    fn set_field(&self, bean: &Bean, fd: &FieldDescriptor, value: Value) -> Result<(), ParserError> {
        self.binder
            .set_field(&mut bean.borrow_mut(), fd, value)
            .map_err(|e| self.lexer.token_error(e).with_field(fd.name()))
    }

    /// The general key loop of a typed object, entered after `{` or `,`.
    /// Consumes the closing `}`.
    pub(super) fn bean_fields(&mut self, mut bean: Bean, frame: &mut Frame, mut after_comma: bool) -> Result<Value, ParserError> {
        loop {
            let Some(key) = self.read_key(after_comma)? else {
                self.ensure_context(frame, &Value::Bean(bean.clone()));
                break;
            };
            if self.options.detects_special_keys() {
                if *key == *self.config.type_key() {
                    bean = self.bean_type_key(bean, &key, frame)?;
                    if !self.entry_separator(&key)? {
                        break;
                    }
                    after_comma = true;
                    continue;
                }
                if &*key == REF_KEY && bean.is_empty() && self.can_reference() {
                    match self.parse_reference(&key)? {
                        RefOutcome::Resolved(value) => return Ok(value),
                        RefOutcome::Plain(_) => {
                            after_comma = true;
                            continue;
                        }
                    }
                }
            }
            self.ensure_context(frame, &Value::Bean(bean.clone()));
            let ty = bean.type_descriptor();
            if let Some(fd) = self.binder.resolve_field(&ty, &key) {
                self.next_value_token(fd.declared())?;
                let value = self.parse_field_value(fd.declared(), FieldName::Key(fd.name().clone()))?;
                self.set_field(&bean, fd, value)?;
                self.bind_pending(|| Slot::Field(bean.clone(), fd.name().clone()));
            } else {
                self.lexer.next_token()?;
                self.parse_any(FieldName::Key(key.clone()))?;
                self.needs_resolve = false;
            }
            if !self.entry_separator(&key)? {
                break;
            }
            after_comma = true;
        }
        self.lexer.next_token()?;
        Ok(Value::Bean(bean))
    }

    /// The type key inside a typed object: selects a subtype of the bean's
    /// current type.
    fn bean_type_key(&mut self, bean: Bean, key: &Arc<str>, frame: &Frame) -> Result<Bean, ParserError> {
        if self.lexer.next_token()? != TokenKind::LiteralString || self.options.ignore_auto_type {
            self.parse_any(FieldName::Key(key.clone()))?;
            self.needs_resolve = false;
            return Ok(bean);
        }
        let name = self.lexer.string_val();
        let current = bean.type_descriptor();
        if name == current.name() {
            self.lexer.next_token()?;
            return Ok(bean);
        }
        let sub = self.check_type(&name, Some(&current), key)?;
        self.lexer.next_token()?;
        if sub.kind() != TypeKind::Bean {
            return Ok(bean);
        }
        let bean = if bean.is_empty() {
            Bean::new(TypedObject::new(sub))
        } else {
            self.map_to_bean(bean.borrow().fields(), &sub, &mut Vec::new())
                .map_err(|e| self.lexer.token_error(e).with_field(key))?
        };
        self.replace_context(frame, Value::Bean(bean.clone()));
        Ok(bean)
    }

    /// Converts a generic object's entries into an instance of `ty`.
    pub(super) fn object_to_bean(&self, object: &Object, ty: &TypeRef) -> Result<Bean, CastError> {
        self.map_to_bean(&object.borrow(), ty, &mut Vec::new())
    }

    fn map_to_bean(&self, entries: &Map, ty: &TypeRef, seen: &mut Vec<*const ()>) -> Result<Bean, CastError> {
        let mut typed = TypedObject::new(ty.clone());
        for (key, value) in entries {
            if let Some(fd) = self.binder.resolve_field(ty, key) {
                let value = self.convert(value.clone(), fd.declared(), seen)?;
                self.binder.set_field(&mut typed, fd, value)?;
            }
        }
        Ok(Bean::new(typed))
    }

    /// Casts `value` to `declared`, turning nested objects into instances
    /// of their declared types. Containers already being converted further
    /// up are cast as they are.
    fn convert(&self, value: Value, declared: &DeclaredType, seen: &mut Vec<*const ()>) -> Result<Value, CastError> {
        let Some(id) = value.identity() else {
            return cast(value, declared);
        };
        if seen.contains(&id) {
            return cast(value, declared);
        }
        seen.push(id);
        let converted = match (declared, &value) {
            (DeclaredType::Named(name), Value::Object(object)) => match self.config.resolve_declared(name) {
                Some(ty) if ty.kind() == TypeKind::Bean => Value::Bean(self.map_to_bean(&object.borrow(), &ty, seen)?),
                _ => cast(value.clone(), declared)?,
            },
            (DeclaredType::List(element), Value::Array(array)) => {
                let items = array
                    .borrow()
                    .iter()
                    .map(|item| self.convert(item.clone(), element, seen))
                    .collect::<Result<Vec<_>, _>>()?;
                let converted = Array::with_kind(array.kind());
                converted.borrow_mut().extend(items);
                Value::Array(converted)
            }
            (DeclaredType::Map(inner), Value::Object(object)) => {
                let entries = object
                    .borrow()
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.convert(v.clone(), inner, seen)?)))
                    .collect::<Result<Map, CastError>>()?;
                Value::Object(Object::from(entries))
            }
            _ => cast(value.clone(), declared)?,
        };
        seen.pop();
        Ok(converted)
    }
}
