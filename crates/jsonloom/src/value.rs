//! The decoded document model.
//!
//! Containers ([`Object`], [`Array`], [`Bean`]) are shared handles: cloning a
//! handle clones the pointer, not the contents. This is what lets a `$ref`
//! point back at an enclosing container, so a decoded document may be a
//! cyclic graph rather than a tree. [`Display`](core::fmt::Display) output
//! writes such back-edges as `{"$ref":...}` objects that decode to the same
//! shape.
//!
//! Because containers are reference counted, cyclic graphs are never freed.
use core::{
    cell::{Cell, Ref, RefCell, RefMut},
    fmt::{self, Write as _},
    str::FromStr,
};
use std::{collections::HashSet, rc::Rc, sync::Arc};

use chrono::{DateTime, FixedOffset, SecondsFormat};
use indexmap::IndexMap;
use num_bigint::BigInt;
use tracing::trace;

use crate::{config::DEFAULT_TYPE_KEY, path::FieldName, types::TypeRef};

/// Key-to-value storage of an [`Object`] or [`TypedObject`].
pub type Map = IndexMap<Arc<str>, Value>;

/// A decoded value.
///
/// # Examples
///
/// ```
/// use jsonloom::Value;
///
/// let v = jsonloom::parse(r#"{"key":[1,2.5,"x"]}"#).unwrap();
/// assert_eq!(v.get("key").unwrap().index(1), Some(Value::Float(2.5)));
/// assert_eq!(v.to_string(), r#"{"key":[1,2.5,"x"]}"#);
/// ```
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// An integer that fits in `i64`.
    Int(i64),
    /// An integer literal too large for `i64`.
    BigInt(BigInt),
    Float(f64),
    /// An exact decimal, kept as its literal text.
    Decimal(Decimal),
    String(String),
    Date(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Array(Array),
    Object(Object),
    /// An object decoded into a registered type.
    Bean(Bean),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as `i64` if it is an integer in range.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::BigInt(n) => i64::try_from(n).ok(),
            _ => None,
        }
    }

    /// Returns any numeric value widened to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::BigInt(n) => n.to_string().parse().ok(),
            Self::Float(n) => Some(*n),
            Self::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bean(&self) -> Option<&Bean> {
        match self {
            Self::Bean(b) => Some(b),
            _ => None,
        }
    }

    /// Looks up `key` in an object or bean.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Self::Object(o) => o.get(key),
            Self::Bean(b) => b.get(key),
            _ => None,
        }
    }

    /// Returns the array element at `index`.
    #[must_use]
    pub fn index(&self, index: usize) -> Option<Value> {
        match self {
            Self::Array(a) => a.get(index),
            _ => None,
        }
    }

    /// Returns `true` if both values are the same container.
    #[must_use]
    pub fn same_container(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => core::ptr::eq(a, b),
            _ => false,
        }
    }

    /// A short name for the variant, used in cast diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Bean(_) => "bean",
        }
    }

    pub(crate) fn identity(&self) -> Option<*const ()> {
        match self {
            Self::Array(a) => Some(a.identity()),
            Self::Object(o) => Some(o.identity()),
            Self::Bean(b) => Some(b.identity()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Equality::default().values(self, other)
    }
}

/// Structural comparison of two graphs that may contain cycles.
///
/// A pair of containers already under comparison is assumed equal, so a
/// cycle on both sides closes instead of recursing. The first difference
/// anywhere ends the comparison.
#[derive(Default)]
struct Equality {
    assumed: HashSet<(*const (), *const ())>,
}

impl Equality {
    /// Whether `(a, b)` still needs comparing.
    fn enter(&mut self, a: *const (), b: *const ()) -> bool {
        a != b && self.assumed.insert((a, b))
    }

    fn maps(&mut self, a: &Map, b: &Map) -> bool {
        a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| self.values(v, w)))
    }

    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Array(x), Value::Array(y)) => {
                if !self.enter(x.identity(), y.identity()) {
                    return true;
                }
                let (xs, ys) = (x.0.items.borrow(), y.0.items.borrow());
                xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(v, w)| self.values(v, w))
            }
            (Value::Object(x), Value::Object(y)) => {
                !self.enter(x.identity(), y.identity()) || self.maps(&x.0.borrow(), &y.0.borrow())
            }
            (Value::Bean(x), Value::Bean(y)) => {
                if !self.enter(x.identity(), y.identity()) {
                    return true;
                }
                let (xs, ys) = (x.0.borrow(), y.0.borrow());
                xs.ty.name() == ys.ty.name() && self.maps(&xs.fields, &ys.fields)
            }
            _ => a.scalar_eq(b),
        }
    }
}

impl Value {
    fn scalar_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Self::BigInt(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::Date(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(Array::from(v))
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Self::Object(Object::from(v))
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Self::Object(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Self::Array(v)
    }
}

impl From<Bean> for Value {
    fn from(v: Bean) -> Self {
        Self::Bean(v)
    }
}

/// An exact decimal number stored as its validated literal text.
///
/// Equality is textual, so `1.0` and `1.00` differ.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decimal(Box<str>);

/// The text is not a decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal: {0:?}")]
pub struct ParseDecimalError(String);

impl Decimal {
    /// Wraps text the scanner already validated as a number literal.
    pub(crate) fn from_scanned(text: &str) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The nearest `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.0.parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let mut i = usize::from(bytes.first() == Some(&b'-'));
        let digits = |i: &mut usize| {
            let start = *i;
            while bytes.get(*i).is_some_and(u8::is_ascii_digit) {
                *i += 1;
            }
            *i > start
        };
        let mut ok = digits(&mut i);
        if ok && bytes.get(i) == Some(&b'.') {
            i += 1;
            ok = digits(&mut i);
        }
        if ok && matches!(bytes.get(i), Some(b'e' | b'E')) {
            i += 1;
            if matches!(bytes.get(i), Some(b'+' | b'-')) {
                i += 1;
            }
            ok = digits(&mut i);
        }
        if ok && i == bytes.len() {
            Ok(Self(s.into()))
        } else {
            Err(ParseDecimalError(s.to_owned()))
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shared, mutable object handle.
///
/// Equality compares identity first and falls back to comparing entries,
/// ignoring key order.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<Map>>);

impl Object {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Map> {
        self.0.borrow()
    }

    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, Map> {
        self.0.borrow_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Returns a clone of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Inserts or replaces `key`, keeping the original position on replace.
    pub fn insert(&self, key: impl Into<Arc<str>>, value: Value) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn sort_keys(&self) {
        self.0.borrow_mut().sort_unstable_keys();
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }
}

impl From<Map> for Object {
    fn from(map: Map) -> Self {
        Self(Rc::new(RefCell::new(map)))
    }
}

impl<K: Into<Arc<str>>> FromIterator<(K, Value)> for Object {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect::<Map>(),
        )
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Equality::default().values(&Value::Object(self.clone()), &Value::Object(other.clone()))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", Value::Object(self.clone()))
    }
}

/// How an array was requested to be materialized.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayKind {
    /// A growable list.
    #[default]
    List,
    /// A fixed object array.
    ObjectArray,
}

#[derive(Default)]
struct ArrayCell {
    items: RefCell<Vec<Value>>,
    kind: Cell<ArrayKind>,
}

/// A shared, mutable array handle.
#[derive(Clone, Default)]
pub struct Array(Rc<ArrayCell>);

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_kind(kind: ArrayKind) -> Self {
        let array = Self::default();
        array.0.kind.set(kind);
        array
    }

    #[must_use]
    pub fn kind(&self) -> ArrayKind {
        self.0.kind.get()
    }

    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.items.borrow()
    }

    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.items.borrow_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.borrow().get(index).cloned()
    }

    pub fn push(&self, value: Value) {
        let mut items = self.0.items.borrow_mut();
        trace!(index = items.len(), kind = value.type_name(), "array push");
        items.push(value);
    }

    /// Replaces the element at `index`; returns `false` when out of bounds.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let mut items = self.0.items.borrow_mut();
        match items.get_mut(index) {
            Some(slot) => {
                trace!(index, kind = value.type_name(), "array set");
                *slot = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self(Rc::new(ArrayCell {
            items: RefCell::new(items),
            kind: Cell::new(ArrayKind::List),
        }))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        Equality::default().values(&Value::Array(self.clone()), &Value::Array(other.clone()))
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array({})", Value::Array(self.clone()))
    }
}

/// The fields of an object decoded into a registered type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedObject {
    ty: TypeRef,
    fields: Map,
}

impl TypedObject {
    /// A zero-argument instance: no fields set.
    #[must_use]
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn type_descriptor(&self) -> &TypeRef {
        &self.ty
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: Arc<str>, value: Value) {
        trace!(type_name = %self.ty.name(), field = %name, "set field");
        self.fields.insert(name, value);
    }

    #[must_use]
    pub fn fields(&self) -> &Map {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A shared, mutable handle to a [`TypedObject`].
#[derive(Clone)]
pub struct Bean(Rc<RefCell<TypedObject>>);

impl Bean {
    #[must_use]
    pub fn new(object: TypedObject) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    #[must_use]
    pub fn borrow(&self) -> Ref<'_, TypedObject> {
        self.0.borrow()
    }

    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, TypedObject> {
        self.0.borrow_mut()
    }

    #[must_use]
    pub fn type_descriptor(&self) -> TypeRef {
        self.0.borrow().ty.clone()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().fields.get(name).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().fields.is_empty()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }
}

impl PartialEq for Bean {
    fn eq(&self, other: &Self) -> bool {
        Equality::default().values(&Value::Bean(self.clone()), &Value::Bean(other.clone()))
    }
}

impl fmt::Debug for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bean({})", Value::Bean(self.clone()))
    }
}

/// Escapes a string for inclusion in a JSON string literal.
///
/// Quotes, backslashes, control characters and Unicode line separators are
/// written as escape sequences.
pub(crate) fn write_escaped_string<W: fmt::Write>(src: &str, f: &mut W) -> fmt::Result {
    for c in src.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\u{2028}' | '\u{2029}' => write!(f, "\\u{:04X}", c as u32)?,
            c if c.is_ascii_control() || c.is_control() && c as u32 <= 0xFFFF => {
                write!(f, "\\u{:04X}", c as u32)?;
            }
            _ => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_quoted<W: fmt::Write>(src: &str, f: &mut W) -> fmt::Result {
    f.write_char('"')?;
    write_escaped_string(src, f)?;
    f.write_char('"')
}

fn write_float<W: fmt::Write>(n: f64, f: &mut W) -> fmt::Result {
    if !n.is_finite() {
        return f.write_str("null");
    }
    let text = n.to_string();
    f.write_str(&text)?;
    if !text.contains(['.', 'e', 'E']) {
        f.write_str(".0")?;
    }
    Ok(())
}

/// Writes values while tracking the chain of open containers, so that a
/// container reached again is written as a reference instead of recursing.
struct Renderer<'a, 'f> {
    out: &'a mut fmt::Formatter<'f>,
    open: Vec<(*const (), FieldName)>,
    type_key: &'a str,
}

impl Renderer<'_, '_> {
    fn value(&mut self, value: &Value, field: FieldName) -> fmt::Result {
        match value {
            Value::Null => self.out.write_str("null"),
            Value::Bool(b) => self.out.write_str(if *b { "true" } else { "false" }),
            Value::Int(n) => write!(self.out, "{n}"),
            Value::BigInt(n) => write!(self.out, "{n}"),
            Value::Float(n) => write_float(*n, self.out),
            Value::Decimal(d) => self.out.write_str(d.as_str()),
            Value::String(s) => write_quoted(s, self.out),
            Value::Date(d) => write_quoted(&d.to_rfc3339_opts(SecondsFormat::AutoSi, true), self.out),
            Value::Bytes(bytes) => {
                self.out.write_str("x'")?;
                for b in bytes {
                    write!(self.out, "{b:02X}")?;
                }
                self.out.write_char('\'')
            }
            Value::Array(array) => {
                if !self.enter(array.identity(), field)? {
                    return Ok(());
                }
                self.out.write_char('[')?;
                for (i, item) in array.borrow().iter().enumerate() {
                    if i > 0 {
                        self.out.write_char(',')?;
                    }
                    self.value(item, FieldName::Index(i))?;
                }
                self.leave(']')
            }
            Value::Object(object) => {
                if !self.enter(object.identity(), field)? {
                    return Ok(());
                }
                self.out.write_char('{')?;
                self.entries(object.borrow().iter(), false)?;
                self.leave('}')
            }
            Value::Bean(bean) => {
                if !self.enter(bean.identity(), field)? {
                    return Ok(());
                }
                let bean = bean.borrow();
                self.out.write_char('{')?;
                write_quoted(self.type_key, self.out)?;
                self.out.write_char(':')?;
                write_quoted(bean.ty.name(), self.out)?;
                self.entries(bean.fields.iter(), true)?;
                self.leave('}')
            }
        }
    }

    fn entries<'v>(
        &mut self,
        entries: impl Iterator<Item = (&'v Arc<str>, &'v Value)>,
        mut comma: bool,
    ) -> fmt::Result {
        for (key, value) in entries {
            if comma {
                self.out.write_char(',')?;
            }
            comma = true;
            write_quoted(key, self.out)?;
            self.out.write_char(':')?;
            self.value(value, FieldName::Key(key.clone()))?;
        }
        Ok(())
    }

    /// Returns `false` after writing a reference when `id` is already open.
    fn enter(&mut self, id: *const (), field: FieldName) -> Result<bool, fmt::Error> {
        let Some(pos) = self.open.iter().position(|(open, _)| core::ptr::eq(*open, id)) else {
            self.open.push((id, field));
            return Ok(true);
        };
        let depth = self.open.len();
        let path = if pos + 1 == depth {
            String::from("@")
        } else if pos + 2 == depth {
            String::from("..")
        } else if pos == 0 {
            String::from("$")
        } else {
            let mut path = String::from("$");
            for (_, segment) in &self.open[1..=pos] {
                segment.write_to(&mut path)?;
            }
            path
        };
        self.out.write_str("{\"$ref\":")?;
        write_quoted(&path, self.out)?;
        self.out.write_char('}')?;
        Ok(false)
    }

    fn leave(&mut self, close: char) -> fmt::Result {
        self.open.pop();
        self.out.write_char(close)
    }
}

/// Beans are written under [`DEFAULT_TYPE_KEY`]; see [`Value::display_with_type_key`].
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display_with_type_key(DEFAULT_TYPE_KEY), f)
    }
}

/// A [`Value`] rendered with a chosen type key.
struct TypeKeyed<'a> {
    value: &'a Value,
    type_key: &'a str,
}

impl fmt::Display for TypeKeyed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Renderer {
            out: f,
            open: Vec::new(),
            type_key: self.type_key,
        }
        .value(self.value, FieldName::Root)
    }
}

impl Value {
    /// Renders like [`Display`](fmt::Display), writing each bean's type name
    /// under `type_key`. Pass [`ParserConfig::type_key`](crate::ParserConfig::type_key) to get text that
    /// decodes back to beans under that configuration.
    ///
    /// ```
    /// use jsonloom::{DeclaredType, JsonParser, ParserConfig, ParserOptions, TypeDescriptor};
    ///
    /// let config = ParserConfig::new().with_type_key("kind");
    /// config.register(TypeDescriptor::builder("demo.P").field("x", DeclaredType::Int).build());
    /// config.add_accept("demo.");
    /// let value = JsonParser::with_config(r#"{"kind":"demo.P","x":1}"#, ParserOptions::default(), &config)
    ///     .parse()
    ///     .unwrap();
    /// assert_eq!(value.display_with_type_key(config.type_key()).to_string(), r#"{"kind":"demo.P","x":1}"#);
    /// ```
    #[must_use]
    pub fn display_with_type_key<'a>(&'a self, type_key: &'a str) -> impl fmt::Display + 'a {
        TypeKeyed { value: self, type_key }
    }
}
