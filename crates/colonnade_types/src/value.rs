//! Language-level and wire-level values.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Value
// ============================================================================

/// A dynamically typed value held by application code.
///
/// Values are loosely typed: a `Text("42")` may be bound to an `int` column.
/// [`crate::marshal`] decides whether the coercion is acceptable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    /// Stored with millisecond precision. `From<DateTime<Utc>>` truncates
    /// finer precision; a value built directly with sub-millisecond digits
    /// loses them on the way to the table.
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Blob(Vec<u8>),
    List(Vec<Value>),
    /// Ordered key/value pairs
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short description used in error messages, e.g. `text "abc"`.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Int(v) => format!("integer {}", v),
            Value::Float(v) => format!("float {}", v),
            Value::Text(v) => format!("text {:?}", v),
            Value::Boolean(v) => format!("boolean {}", v),
            Value::Timestamp(v) => format!("timestamp {}", v.to_rfc3339()),
            Value::Uuid(v) => format!("uuid {}", v),
            Value::Blob(v) => format!("blob of {} bytes", v.len()),
            Value::List(v) => format!("list of {} items", v.len()),
            Value::Map(v) => format!("map of {} entries", v.len()),
        }
    }

    /// Convert from a JSON value.
    ///
    /// Integral numbers become `Int`, other numbers `Float`, objects become
    /// `Map`s with text keys in document order.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (Value::Text(k.clone()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to a JSON value. Timestamps and UUIDs become strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::Text(v) => serde_json::Value::from(v.clone()),
            Value::Boolean(v) => serde_json::Value::from(*v),
            Value::Timestamp(v) => {
                serde_json::Value::from(v.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Uuid(v) => serde_json::Value::from(v.to_string()),
            Value::Blob(v) => serde_json::Value::from(v.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    let key = match k {
                        Value::Text(s) => s.clone(),
                        other => other.to_json().to_string(),
                    };
                    map.insert(key, v.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.trunc_subsecs(3))
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

// ============================================================================
// WireValue
// ============================================================================

/// A statement parameter typed for exactly one column kind.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Text(String),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Boolean(bool),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    Uuid(Uuid),
    Blob(Vec<u8>),
    List(Vec<WireValue>),
    Map(Vec<(WireValue, WireValue)>),
}

impl WireValue {
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }
}

/// Renders the value as a CQL literal (used for debug output only).
impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Null => f.write_str("null"),
            WireValue::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            WireValue::Int(v) => write!(f, "{}", v),
            WireValue::BigInt(v) => write!(f, "{}", v),
            WireValue::Double(v) => write!(f, "{}", v),
            WireValue::Boolean(v) => write!(f, "{}", v),
            WireValue::Timestamp(v) => write!(f, "{}", v),
            WireValue::Uuid(v) => write!(f, "{}", v),
            WireValue::Blob(v) => {
                f.write_str("0x")?;
                for byte in v {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            WireValue::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            WireValue::Map(entries) => {
                f.write_str("{")?;
                for (idx, (k, v)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_preserves_object_order() {
        let value = Value::from_json(&json!({"zeta": 1, "alpha": "a", "mid": [true, null]}));
        let Value::Map(entries) = value else {
            panic!("expected map");
        };
        let keys: Vec<&str> = entries.iter().filter_map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(entries[2].1, Value::List(vec![Value::Boolean(true), Value::Null]));
    }

    #[test]
    fn test_json_numbers() {
        assert_eq!(Value::from_json(&json!(7)), Value::Int(7));
        assert_eq!(Value::from_json(&json!(2.5)), Value::Float(2.5));
    }

    #[test]
    fn test_to_json_uuid_and_timestamp() {
        let id = Uuid::new_v4();
        assert_eq!(Value::Uuid(id).to_json(), json!(id.to_string()));

        let ts = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(Value::Timestamp(ts).to_json(), json!("2023-11-14T22:13:20.123Z"));
    }

    #[test]
    fn test_timestamp_conversion_truncates_to_millis() {
        let precise = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let Value::Timestamp(stored) = Value::from(precise) else {
            panic!("expected timestamp");
        };
        assert_eq!(stored.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(stored.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_wire_display_literals() {
        assert_eq!(WireValue::Text("it's".into()).to_string(), "'it''s'");
        assert_eq!(WireValue::Blob(vec![0xde, 0xad]).to_string(), "0xdead");
        let map = WireValue::Map(vec![(WireValue::Text("a".into()), WireValue::Int(1))]);
        assert_eq!(map.to_string(), "{'a': 1}");
    }

    #[test]
    fn test_option_into_value() {
        let none: Option<i64> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
