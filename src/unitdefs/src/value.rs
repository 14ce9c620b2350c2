//! Typed field values and the coercion rules from raw export JSON
//!
//! The export tooling writes most numbers as strings, booleans as `0`/`1`,
//! and Lua tables as either arrays or integer-keyed objects. Every accepted
//! raw shape is listed here; anything else is rejected.

use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;

/// Canonical type of a normalized field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Float,
    Boolean,
    Text,
    References,
}

impl FieldType {
    /// Value used for a missing optional field, if this type has one
    pub fn zero(self) -> Option<FieldValue> {
        match self {
            FieldType::Integer => Some(FieldValue::Integer(0)),
            FieldType::Float => Some(FieldValue::Float(0.0)),
            FieldType::Boolean => Some(FieldValue::Boolean(false)),
            FieldType::References => Some(FieldValue::References(Vec::new())),
            FieldType::Text => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Text => write!(f, "string"),
            FieldType::References => write!(f, "reference list"),
        }
    }
}

/// Pointer to another unit in the same collection
///
/// Raw build lists name their targets either by unit name or by the numeric
/// engine id. After resolution only `Name` remains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum UnitReference {
    Name(String),
    EngineId(i64),
}

impl UnitReference {
    pub fn name(name: impl Into<String>) -> Self {
        UnitReference::Name(name.into())
    }
}

impl fmt::Display for UnitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitReference::Name(name) => write!(f, "{}", name),
            UnitReference::EngineId(id) => write!(f, "#{}", id),
        }
    }
}

/// A normalized, typed field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    References(Vec<UnitReference>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::References(_) => FieldType::References,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_references(&self) -> Option<&[UnitReference]> {
        match self {
            FieldValue::References(v) => Some(v),
            _ => None,
        }
    }
}

/// Coerce a raw JSON value to the given canonical type
///
/// The error is a human-readable reason suitable for a malformed-record report.
pub fn coerce(field_type: FieldType, raw: &Value) -> Result<FieldValue, String> {
    match field_type {
        FieldType::Integer => coerce_integer(raw).map(FieldValue::Integer),
        FieldType::Float => coerce_float(raw).map(FieldValue::Float),
        FieldType::Boolean => coerce_bool(raw).map(FieldValue::Boolean),
        FieldType::Text => match raw {
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            other => Err(mismatch(field_type, other)),
        },
        FieldType::References => coerce_references(raw).map(FieldValue::References),
    }
}

/// Infer a value for a field that has no rule
///
/// Only scalars have an unambiguous type. Arrays, objects and nulls return `None`.
pub fn infer(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Bool(b) => Some(FieldValue::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldValue::Integer(i)),
            None => n.as_f64().map(FieldValue::Float),
        },
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn coerce_integer(raw: &Value) -> Result<i64, String> {
    let parsed = match raw {
        Value::Number(n) => number_to_integer(n),
        Value::String(s) => parse_integer(s.trim()),
        other => return Err(mismatch(FieldType::Integer, other)),
    };
    parsed.ok_or_else(|| mismatch(FieldType::Integer, raw))
}

fn number_to_integer(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().and_then(integral))
}

fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(integral))
}

/// Accept a float only when it is a whole number inside the i64 range
fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn coerce_float(raw: &Value) -> Result<f64, String> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => return Err(mismatch(FieldType::Float, other)),
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| mismatch(FieldType::Float, raw))
}

fn coerce_bool(raw: &Value) -> Result<bool, String> {
    let parsed = match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => Some(false),
            Some(f) if f == 1.0 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| mismatch(FieldType::Boolean, raw))
}

fn coerce_references(raw: &Value) -> Result<Vec<UnitReference>, String> {
    match raw {
        Value::String(_) => Ok(vec![reference_entry(raw, 0)?]),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| reference_entry(item, i))
            .collect(),
        // Lua tables come out of the exporter as {"1": .., "2": ..}
        Value::Object(map) => {
            let mut keyed = map
                .iter()
                .map(|(key, item)| {
                    key.trim()
                        .parse::<i64>()
                        .map(|pos| (pos, item))
                        .map_err(|_| format!("has non-positional key '{}' in reference table", key))
                })
                .collect::<Result<Vec<_>, _>>()?;
            keyed.sort_by_key(|(pos, _)| *pos);
            keyed
                .into_iter()
                .enumerate()
                .map(|(i, (_, item))| reference_entry(item, i))
                .collect()
        }
        other => Err(mismatch(FieldType::References, other)),
    }
}

fn reference_entry(item: &Value, position: usize) -> Result<UnitReference, String> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Ok(UnitReference::Name(s.trim().to_string())),
        Value::Number(n) => number_to_integer(n)
            .map(UnitReference::EngineId)
            .ok_or_else(|| format!("has non-integer engine id {} at position {}", n, position)),
        other => Err(format!(
            "has invalid reference {} at position {}",
            describe(other),
            position
        )),
    }
}

fn mismatch(expected: FieldType, raw: &Value) -> String {
    format!("expected {}, got {}", expected, describe(raw))
}

/// Short description of a raw value for error messages
pub(crate) fn describe(raw: &Value) -> String {
    const MAX: usize = 40;
    match raw {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) if s.chars().count() > MAX => {
            format!("string \"{}...\"", s.chars().take(MAX).collect::<String>())
        }
        Value::String(s) => format!("string \"{}\"", s),
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Object(map) => format!("object with {} keys", map.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_from_numeric_string() {
        assert_eq!(coerce(FieldType::Integer, &json!("2")), Ok(FieldValue::Integer(2)));
        assert_eq!(coerce(FieldType::Integer, &json!(" 3 ")), Ok(FieldValue::Integer(3)));
        assert_eq!(coerce(FieldType::Integer, &json!("4.0")), Ok(FieldValue::Integer(4)));
        assert_eq!(coerce(FieldType::Integer, &json!(5.0)), Ok(FieldValue::Integer(5)));
    }

    #[test]
    fn test_integer_rejects_fractions_and_text() {
        assert!(coerce(FieldType::Integer, &json!(1.5)).is_err());
        assert!(coerce(FieldType::Integer, &json!("1.5")).is_err());
        assert!(coerce(FieldType::Integer, &json!("two")).is_err());
        assert!(coerce(FieldType::Integer, &json!(true)).is_err());
        assert!(coerce(FieldType::Integer, &json!(u64::MAX)).is_err());
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(coerce(FieldType::Float, &json!(3)), Ok(FieldValue::Float(3.0)));
        assert_eq!(coerce(FieldType::Float, &json!("12.5")), Ok(FieldValue::Float(12.5)));
        assert!(coerce(FieldType::Float, &json!("inf")).is_err());
        assert!(coerce(FieldType::Float, &json!("NaN")).is_err());
        assert!(coerce(FieldType::Float, &json!([1])).is_err());
    }

    #[test]
    fn test_bool_variants() {
        for raw in [json!(true), json!(1), json!("1"), json!("TRUE"), json!("yes")] {
            assert_eq!(coerce(FieldType::Boolean, &raw), Ok(FieldValue::Boolean(true)), "{raw}");
        }
        for raw in [json!(false), json!(0), json!("0"), json!("false"), json!("No")] {
            assert_eq!(coerce(FieldType::Boolean, &raw), Ok(FieldValue::Boolean(false)), "{raw}");
        }
        assert!(coerce(FieldType::Boolean, &json!(2)).is_err());
        assert!(coerce(FieldType::Boolean, &json!("maybe")).is_err());
    }

    #[test]
    fn test_text_is_strict() {
        assert_eq!(
            coerce(FieldType::Text, &json!("Commander")),
            Ok(FieldValue::Text("Commander".to_string()))
        );
        let err = coerce(FieldType::Text, &json!(12)).unwrap_err();
        assert_eq!(err, "expected string, got number 12");
    }

    #[test]
    fn test_references_mixed_names_and_ids() {
        let value = coerce(FieldType::References, &json!(["armlab", 17])).unwrap();
        assert_eq!(
            value,
            FieldValue::References(vec![
                UnitReference::name("armlab"),
                UnitReference::EngineId(17)
            ])
        );
    }

    #[test]
    fn test_references_from_lua_table_object() {
        let raw = json!({"10": "armvp", "2": "armlab", "1": "armmex"});
        let value = coerce(FieldType::References, &raw).unwrap();
        let names: Vec<String> = value
            .as_references()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["armmex", "armlab", "armvp"]);
    }

    #[test]
    fn test_references_single_string() {
        let value = coerce(FieldType::References, &json!("armcom")).unwrap();
        assert_eq!(value, FieldValue::References(vec![UnitReference::name("armcom")]));
    }

    #[test]
    fn test_references_reject_bad_entries() {
        assert!(coerce(FieldType::References, &json!(["armlab", ""])).is_err());
        assert!(coerce(FieldType::References, &json!([null])).is_err());
        assert!(coerce(FieldType::References, &json!([1.5])).is_err());
        assert!(coerce(FieldType::References, &json!({"a": "armlab"})).is_err());
        assert!(coerce(FieldType::References, &json!(3)).is_err());
    }

    #[test]
    fn test_infer_scalars_only() {
        assert_eq!(infer(&json!(4)), Some(FieldValue::Integer(4)));
        assert_eq!(infer(&json!(4.5)), Some(FieldValue::Float(4.5)));
        assert_eq!(infer(&json!("x")), Some(FieldValue::Text("x".to_string())));
        assert_eq!(infer(&json!([1, 2])), None);
        assert_eq!(infer(&json!({})), None);
        assert_eq!(infer(&Value::Null), None);
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(FieldType::Float.zero(), Some(FieldValue::Float(0.0)));
        assert_eq!(FieldType::References.zero(), Some(FieldValue::References(vec![])));
        assert_eq!(FieldType::Text.zero(), None);
    }

    #[test]
    fn test_serialize_untagged() {
        let refs = FieldValue::References(vec![UnitReference::name("armlab")]);
        assert_eq!(serde_json::to_string(&refs).unwrap(), r#"["armlab"]"#);
        assert_eq!(serde_json::to_string(&FieldValue::Float(1.0)).unwrap(), "1.0");
        assert_eq!(serde_json::to_string(&FieldValue::Boolean(true)).unwrap(), "true");
    }
}
