//! Binding decoded values to typed fields.
use chrono::DateTime;
use thiserror::Error;

use crate::{
    scanner::date,
    types::{DeclaredType, FieldDescriptor, TypeDescriptor},
    value::{Decimal, TypedObject, Value},
};

/// A value could not be converted to a field's declared type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("can not cast {found} to {target}, value : {value}")]
pub struct CastError {
    pub target: String,
    pub found: &'static str,
    pub value: String,
}

impl CastError {
    pub(crate) fn new(target: &DeclaredType, value: &Value) -> Self {
        Self {
            target: target.to_string(),
            found: value.type_name(),
            value: value.to_string(),
        }
    }
}

/// Abstraction over how keys map to fields and how values are stored.
pub trait FieldBinder {
    /// Finds the field `key` names on `owner`, if any. Unknown keys are
    /// skipped by the parser.
    fn resolve_field<'t>(&self, owner: &'t TypeDescriptor, key: &str) -> Option<&'t FieldDescriptor>;

    /// Converts `value` to the field's declared type and stores it.
    ///
    /// # Errors
    ///
    /// Returns [`CastError`] when the value does not convert.
    fn set_field(&self, target: &mut TypedObject, field: &FieldDescriptor, value: Value) -> Result<(), CastError>;
}

/// Binder driven by [`TypeDescriptor`] fields.
///
/// Keys resolve by exact name first, then by a smart match that ignores
/// ASCII case, `_` and `-`, so `user_name` and `UserName` both bind `userName`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DescriptorBinder;

impl FieldBinder for DescriptorBinder {
    fn resolve_field<'t>(&self, owner: &'t TypeDescriptor, key: &str) -> Option<&'t FieldDescriptor> {
        owner
            .field(key)
            .or_else(|| owner.fields().iter().find(|f| smart_eq(f.name(), key)))
    }

    fn set_field(&self, target: &mut TypedObject, field: &FieldDescriptor, value: Value) -> Result<(), CastError> {
        let value = cast(value, field.declared())?;
        target.set(field.name().clone(), value);
        Ok(())
    }
}

fn smart_eq(a: &str, b: &str) -> bool {
    let fold = |s: &str| {
        s.chars()
            .filter(|c| !matches!(c, '_' | '-'))
            .map(|c| c.to_ascii_lowercase())
            .collect::<Vec<_>>()
    };
    fold(a) == fold(b)
}

/// Converts a scalar to `declared`, or checks the container shape of a
/// composite value.
///
/// `null` converts to every type. Blank strings convert to `null` for every
/// non-string type.
///
/// # Errors
///
/// Returns [`CastError`] when no conversion applies.
pub fn cast(value: Value, declared: &DeclaredType) -> Result<Value, CastError> {
    if value.is_null() {
        return Ok(value);
    }
    if let Value::String(s) = &value {
        if s.trim().is_empty() && !matches!(declared, DeclaredType::String | DeclaredType::Any) {
            return Ok(Value::Null);
        }
    }
    let converted = match declared {
        DeclaredType::Any => Some(value.clone()),
        DeclaredType::Bool => to_bool(&value).map(Value::Bool),
        DeclaredType::Int => to_integer(&value, i32::MIN.into(), i32::MAX.into()).map(Value::Int),
        DeclaredType::Long => to_integer(&value, i64::MIN, i64::MAX).map(Value::Int),
        DeclaredType::Double => to_double(&value).map(Value::Float),
        DeclaredType::Decimal => to_decimal(&value).map(Value::Decimal),
        DeclaredType::String => to_string(&value).map(Value::String),
        DeclaredType::Date => to_date(&value),
        DeclaredType::Bytes => to_bytes(&value).map(Value::Bytes),
        DeclaredType::List(_) => matches!(value, Value::Array(_)).then(|| value.clone()),
        DeclaredType::Map(_) => matches!(value, Value::Object(_)).then(|| value.clone()),
        DeclaredType::Named(_) => {
            matches!(value, Value::Object(_) | Value::Bean(_) | Value::Array(_)).then(|| value.clone())
        }
    };
    converted.ok_or_else(|| CastError::new(declared, &value))
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(n) => Some(*n != 0),
        Value::String(s) => match s.trim() {
            t if t.eq_ignore_ascii_case("true") || t == "1" => Some(true),
            t if t.eq_ignore_ascii_case("false") || t == "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn to_integer(value: &Value, min: i64, max: i64) -> Option<i64> {
    let in_range = |n: i64| (min..=max).contains(&n).then_some(n);
    let from_float = |f: f64| {
        let t = f.trunc();
        (t.is_finite() && t >= min as f64 && t <= max as f64).then(|| t as i64)
    };
    match value {
        Value::Int(n) => in_range(*n),
        Value::BigInt(n) => i64::try_from(n).ok().and_then(in_range),
        Value::Float(f) => from_float(*f),
        Value::Decimal(d) => from_float(d.to_f64()),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(n) => in_range(n),
                Err(_) => s.parse::<f64>().ok().and_then(from_float),
            }
        }
        _ => None,
    }
}

fn to_double(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Decimal(d) => Some(d.clone()),
        Value::Int(n) => Some(Decimal::from_scanned(&n.to_string())),
        Value::BigInt(n) => Some(Decimal::from_scanned(&n.to_string())),
        Value::Float(f) if f.is_finite() => f.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Int(_) | Value::BigInt(_) | Value::Float(_) | Value::Decimal(_) => {
            Some(value.to_string())
        }
        Value::Date(d) => Some(d.to_rfc3339()),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<Value> {
    match value {
        Value::Date(_) => Some(value.clone()),
        Value::Int(ms) => DateTime::from_timestamp_millis(*ms).map(|d| Value::Date(d.fixed_offset())),
        Value::String(s) => date::parse_text(s.trim()).map(Value::Date),
        _ => None,
    }
}

fn to_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(b) => Some(b.clone()),
        Value::Array(items) => items
            .borrow()
            .iter()
            .map(|v| v.as_i64().and_then(|n| u8::try_from(n).ok()))
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Value::from("42"), DeclaredType::Int, Value::Int(42))]
    #[case(Value::Float(3.9), DeclaredType::Int, Value::Int(3))]
    #[case(Value::Int(1), DeclaredType::Bool, Value::Bool(true))]
    #[case(Value::from("FALSE"), DeclaredType::Bool, Value::Bool(false))]
    #[case(Value::Int(7), DeclaredType::Double, Value::Float(7.0))]
    #[case(Value::Int(7), DeclaredType::String, Value::from("7"))]
    #[case(Value::from("  "), DeclaredType::Long, Value::Null)]
    #[case(Value::Null, DeclaredType::Int, Value::Null)]
    fn casts_scalars(#[case] value: Value, #[case] declared: DeclaredType, #[case] expected: Value) {
        assert_eq!(cast(value, &declared), Ok(expected));
    }

    #[test]
    fn int_range_is_enforced() {
        let err = cast(Value::Int(i64::from(i32::MAX) + 1), &DeclaredType::Int).unwrap_err();
        assert_eq!(err.target, "int");
        assert_eq!(err.found, "int");
        assert!(cast(Value::Int(i64::from(i32::MAX) + 1), &DeclaredType::Long).is_ok());
    }

    #[test]
    fn composite_shapes_are_checked() {
        assert!(cast(Value::from(vec![]), &DeclaredType::list_of(DeclaredType::Int)).is_ok());
        assert!(cast(Value::Int(1), &DeclaredType::list_of(DeclaredType::Int)).is_err());
        assert!(cast(Value::from("x"), &DeclaredType::named("demo.Point")).is_err());
    }

    #[test]
    fn dates_cast_from_millis_and_text() {
        let from_millis = cast(Value::Int(0), &DeclaredType::Date).unwrap();
        let from_text = cast(Value::from("1970-01-01T00:00:00Z"), &DeclaredType::Date).unwrap();
        assert_eq!(from_millis, from_text);
    }

    #[test]
    fn smart_match_ignores_case_and_separators() {
        let ty = TypeDescriptor::builder("demo.User")
            .field("userName", DeclaredType::String)
            .build();
        let binder = DescriptorBinder;
        assert!(binder.resolve_field(&ty, "userName").is_some());
        assert!(binder.resolve_field(&ty, "user_name").is_some());
        assert!(binder.resolve_field(&ty, "USER-NAME").is_some());
        assert!(binder.resolve_field(&ty, "name").is_none());
    }

    #[test]
    fn set_field_casts_before_storing() {
        let ty = TypeDescriptor::builder("demo.Counter")
            .field("count", DeclaredType::Long)
            .build();
        let mut target = TypedObject::new(ty.clone());
        let field = &ty.fields()[0];
        DescriptorBinder.set_field(&mut target, field, Value::from("12")).unwrap();
        assert_eq!(target.get("count"), Some(&Value::Int(12)));
        assert!(DescriptorBinder.set_field(&mut target, field, Value::from("x")).is_err());
    }
}
