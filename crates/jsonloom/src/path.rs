//! The JSONPath subset used by `$ref`.
//!
//! A path is a back-reference when it names a single location from the root:
//! `$`, `.name`, `['name']` and `[n]` segments only. Wildcards, deep scans,
//! filters and function calls compile, and [`JsonPath::evaluate`] handles the
//! first two, but a `$ref` carrying them is kept as data.
use core::fmt::{self, Write as _};
use std::sync::Arc;

use thiserror::Error;

use crate::value::{Array, Value};

/// One step from a container to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum FieldName {
    Root,
    Key(Arc<str>),
    Index(usize),
}

impl FieldName {
    /// Appends this step in path syntax (`.key`, `['key']` or `[n]`).
    pub(crate) fn write_to(&self, out: &mut String) -> fmt::Result {
        match self {
            Self::Root => Ok(()),
            Self::Index(i) => write!(out, "[{i}]"),
            Self::Key(key) if is_plain_name(key) => write!(out, ".{key}"),
            Self::Key(key) => {
                out.push_str("['");
                for c in key.chars() {
                    if matches!(c, '\'' | '\\') {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push_str("']");
                Ok(())
            }
        }
    }
}

fn is_plain_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '@' | '-'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Property(Arc<str>),
    /// Array position; negative counts from the end.
    Index(i64),
    Wildcard,
    DeepScan(Arc<str>),
    Filter(String),
    Function(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path at {offset}: {message}")]
pub struct PathError {
    pub offset: usize,
    pub message: &'static str,
}

/// A compiled path expression.
///
/// # Examples
///
/// ```
/// use jsonloom::JsonPath;
///
/// let path = JsonPath::compile("$.items[0]['name']").unwrap();
/// assert!(path.is_back_reference());
/// assert!(!JsonPath::compile("$..name").unwrap().is_back_reference());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    text: Arc<str>,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Compiles `text`, which must start with `$`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] for text outside the supported grammar.
    pub fn compile(text: &str) -> Result<Self, PathError> {
        let bytes = text.as_bytes();
        if bytes.first() != Some(&b'$') {
            return Err(PathError {
                offset: 0,
                message: "path must start with '$'",
            });
        }
        let mut segments = Vec::new();
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'.' if bytes.get(i + 1) == Some(&b'.') => {
                    let (name, next) = read_name(text, i + 2)?;
                    segments.push(Segment::DeepScan(name));
                    i = next;
                }
                b'.' if bytes.get(i + 1) == Some(&b'*') => {
                    segments.push(Segment::Wildcard);
                    i += 2;
                }
                b'.' => {
                    let (name, next) = read_name(text, i + 1)?;
                    segments.push(if name.ends_with("()") {
                        Segment::Function(name.to_string())
                    } else {
                        Segment::Property(name)
                    });
                    i = next;
                }
                b'[' => {
                    let (segment, next) = read_bracket(text, i + 1)?;
                    segments.push(segment);
                    i = next;
                }
                _ => {
                    return Err(PathError {
                        offset: i,
                        message: "expected '.' or '['",
                    });
                }
            }
        }
        Ok(Self {
            text: text.into(),
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the path addresses exactly one location by name and index.
    #[must_use]
    pub fn is_back_reference(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Property(_) | Segment::Index(_)))
    }

    /// Evaluates the path against `root`.
    ///
    /// Back-reference paths yield the addressed value. Wildcards and deep
    /// scans yield an array of every match. Filters and functions yield
    /// `None`.
    #[must_use]
    pub fn evaluate(&self, root: &Value) -> Option<Value> {
        let mut current = vec![root.clone()];
        for segment in &self.segments {
            let mut next = Vec::new();
            match segment {
                Segment::Property(name) => {
                    next.extend(current.iter().filter_map(|v| v.get(name)));
                }
                Segment::Index(index) => {
                    next.extend(current.iter().filter_map(|v| element(v, *index)));
                }
                Segment::Wildcard => {
                    for v in &current {
                        children(v, &mut next);
                    }
                }
                Segment::DeepScan(name) => {
                    let mut seen = Vec::new();
                    for v in &current {
                        deep_scan(v, name, &mut next, &mut seen);
                    }
                }
                Segment::Filter(_) | Segment::Function(_) => return None,
            }
            current = next;
        }
        if self.is_back_reference() {
            current.into_iter().next()
        } else {
            Some(Value::Array(Array::from(current)))
        }
    }
}

fn read_name(text: &str, start: usize) -> Result<(Arc<str>, usize), PathError> {
    let end = text[start..]
        .find(['.', '['])
        .map_or(text.len(), |i| start + i);
    if end == start {
        return Err(PathError {
            offset: start,
            message: "expected a property name",
        });
    }
    Ok((text[start..end].into(), end))
}

fn read_bracket(text: &str, start: usize) -> Result<(Segment, usize), PathError> {
    let bytes = text.as_bytes();
    let close = |at: usize, segment: Segment| {
        if bytes.get(at) == Some(&b']') {
            Ok((segment, at + 1))
        } else {
            Err(PathError {
                offset: at,
                message: "expected ']'",
            })
        }
    };
    match bytes.get(start) {
        Some(&quote @ (b'\'' | b'"')) => {
            let mut name = String::new();
            let mut chars = text[start + 1..].char_indices();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            name.push(escaped);
                        }
                    }
                    c if c as u32 == u32::from(quote) => {
                        return close(start + 1 + i + 1, Segment::Property(name.into()));
                    }
                    c => name.push(c),
                }
            }
            Err(PathError {
                offset: text.len(),
                message: "unterminated quoted name",
            })
        }
        Some(b'*') => close(start + 1, Segment::Wildcard),
        Some(b'?') => {
            let mut depth = 1usize;
            for (i, b) in bytes[start..].iter().enumerate() {
                match b {
                    b'[' => depth += 1,
                    b']' => {
                        depth -= 1;
                        if depth == 0 {
                            let filter = text[start..start + i].to_owned();
                            return Ok((Segment::Filter(filter), start + i + 1));
                        }
                    }
                    _ => {}
                }
            }
            Err(PathError {
                offset: text.len(),
                message: "unterminated filter",
            })
        }
        Some(b'-' | b'0'..=b'9') => {
            let end = bytes[start + 1..]
                .iter()
                .position(|b| !b.is_ascii_digit())
                .map_or(bytes.len(), |i| start + 1 + i);
            let index = text[start..end].parse().map_err(|_| PathError {
                offset: start,
                message: "invalid index",
            })?;
            close(end, Segment::Index(index))
        }
        _ => Err(PathError {
            offset: start,
            message: "unsupported bracket expression",
        }),
    }
}

fn element(value: &Value, index: i64) -> Option<Value> {
    let array = value.as_array()?;
    let len = i64::try_from(array.len()).ok()?;
    let index = if index < 0 { len + index } else { index };
    array.get(usize::try_from(index).ok()?)
}

fn children(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(a) => out.extend(a.borrow().iter().cloned()),
        Value::Object(o) => out.extend(o.borrow().values().cloned()),
        Value::Bean(b) => out.extend(b.borrow().fields().values().cloned()),
        _ => {}
    }
}

fn deep_scan(value: &Value, name: &str, out: &mut Vec<Value>, seen: &mut Vec<*const ()>) {
    let Some(id) = value.identity() else {
        return;
    };
    if seen.contains(&id) {
        return;
    }
    seen.push(id);
    if name == "*" {
        children(value, out);
    } else if let Some(found) = value.get(name) {
        out.push(found);
    }
    let mut nested = Vec::new();
    children(value, &mut nested);
    for child in &nested {
        deep_scan(child, name, out, seen);
    }
}
