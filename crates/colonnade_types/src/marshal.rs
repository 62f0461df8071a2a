//! Conversion between [`Value`] and [`WireValue`] for a declared [`ColumnType`].

use crate::column_type::ColumnType;
use crate::error::TypeError;
use crate::value::{Value, WireValue};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Marshal an application value into a wire value for `column_type`.
///
/// `Null` is accepted for every type. Containers recurse one level.
pub fn marshal(value: &Value, column_type: &ColumnType) -> Result<WireValue, TypeError> {
    column_type.validate()?;

    if value.is_null() {
        return Ok(WireValue::Null);
    }

    match column_type {
        ColumnType::List { item } => match value {
            Value::List(items) => items
                .iter()
                .map(|v| marshal_scalar(v, item))
                .collect::<Result<Vec<_>, _>>()
                .map(WireValue::List),
            other => Err(TypeError::mismatch(column_type, other.describe())),
        },
        ColumnType::Map { key, value: value_type } => match value {
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| Ok((marshal_scalar(k, key)?, marshal_scalar(v, value_type)?)))
                .collect::<Result<Vec<_>, TypeError>>()
                .map(WireValue::Map),
            other => Err(TypeError::mismatch(column_type, other.describe())),
        },
        scalar => marshal_scalar(value, scalar),
    }
}

fn marshal_scalar(value: &Value, column_type: &ColumnType) -> Result<WireValue, TypeError> {
    let mismatch = || TypeError::mismatch(column_type, value.describe());

    if column_type.is_container() {
        return Err(TypeError::UnsupportedType(format!(
            "{} inside a container",
            column_type
        )));
    }

    match (column_type, value) {
        (_, Value::Null) => Ok(WireValue::Null),
        (_, Value::List(_)) | (_, Value::Map(_)) => Err(mismatch()),

        (ColumnType::Text, Value::Text(s)) => Ok(WireValue::Text(s.clone())),
        (ColumnType::Text, Value::Int(v)) => Ok(WireValue::Text(v.to_string())),
        (ColumnType::Text, Value::Float(v)) => Ok(WireValue::Text(v.to_string())),
        (ColumnType::Text, Value::Boolean(v)) => Ok(WireValue::Text(v.to_string())),
        (ColumnType::Text, Value::Uuid(v)) => Ok(WireValue::Text(v.to_string())),
        (ColumnType::Text, Value::Timestamp(v)) => Ok(WireValue::Text(v.to_rfc3339())),

        (ColumnType::Int, Value::Int(v)) => i32::try_from(*v).map(WireValue::Int).map_err(|_| mismatch()),
        (ColumnType::Int, Value::Float(v)) => integral_f64(*v)
            .and_then(|i| i32::try_from(i).ok())
            .map(WireValue::Int)
            .ok_or_else(mismatch),
        (ColumnType::Int, Value::Text(s)) => s.trim().parse::<i32>().map(WireValue::Int).map_err(|_| mismatch()),

        (ColumnType::BigInt, Value::Int(v)) => Ok(WireValue::BigInt(*v)),
        (ColumnType::BigInt, Value::Float(v)) => integral_f64(*v).map(WireValue::BigInt).ok_or_else(mismatch),
        (ColumnType::BigInt, Value::Text(s)) => s.trim().parse::<i64>().map(WireValue::BigInt).map_err(|_| mismatch()),

        (ColumnType::Double, Value::Float(v)) => Ok(WireValue::Double(*v)),
        (ColumnType::Double, Value::Int(v)) => Ok(WireValue::Double(*v as f64)),
        (ColumnType::Double, Value::Text(s)) => s.trim().parse::<f64>().map(WireValue::Double).map_err(|_| mismatch()),

        (ColumnType::Boolean, Value::Boolean(v)) => Ok(WireValue::Boolean(*v)),
        (ColumnType::Boolean, Value::Int(0)) => Ok(WireValue::Boolean(false)),
        (ColumnType::Boolean, Value::Int(1)) => Ok(WireValue::Boolean(true)),
        (ColumnType::Boolean, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(WireValue::Boolean(true)),
            "false" | "0" => Ok(WireValue::Boolean(false)),
            _ => Err(mismatch()),
        },

        (ColumnType::Timestamp, Value::Timestamp(v)) => Ok(WireValue::Timestamp(v.timestamp_millis())),
        (ColumnType::Timestamp, Value::Int(ms)) => DateTime::<Utc>::from_timestamp_millis(*ms)
            .map(|_| WireValue::Timestamp(*ms))
            .ok_or_else(mismatch),
        (ColumnType::Timestamp, Value::Text(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| WireValue::Timestamp(dt.timestamp_millis()))
            .map_err(|_| mismatch()),

        (ColumnType::Uuid, Value::Uuid(v)) => Ok(WireValue::Uuid(*v)),
        (ColumnType::Uuid, Value::Text(s)) => Uuid::parse_str(s.trim()).map(WireValue::Uuid).map_err(|_| mismatch()),

        (ColumnType::Blob, Value::Blob(v)) => Ok(WireValue::Blob(v.clone())),
        (ColumnType::Blob, Value::Text(s)) => Ok(WireValue::Blob(s.as_bytes().to_vec())),

        _ => Err(mismatch()),
    }
}

/// `Some(i)` when `v` is a whole number inside the i64 range.
fn integral_f64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Unmarshal a wire value read for `column_type` back into an application value.
pub fn unmarshal(wire: &WireValue, column_type: &ColumnType) -> Result<Value, TypeError> {
    column_type.validate()?;

    if wire.is_null() {
        return Ok(Value::Null);
    }

    match column_type {
        ColumnType::List { item } => match wire {
            WireValue::List(items) => items
                .iter()
                .map(|w| unmarshal_scalar(w, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            other => Err(TypeError::mismatch(column_type, format!("{:?}", other))),
        },
        ColumnType::Map { key, value } => match wire {
            WireValue::Map(entries) => entries
                .iter()
                .map(|(k, v)| Ok((unmarshal_scalar(k, key)?, unmarshal_scalar(v, value)?)))
                .collect::<Result<Vec<_>, TypeError>>()
                .map(Value::Map),
            other => Err(TypeError::mismatch(column_type, format!("{:?}", other))),
        },
        scalar => unmarshal_scalar(wire, scalar),
    }
}

fn unmarshal_scalar(wire: &WireValue, column_type: &ColumnType) -> Result<Value, TypeError> {
    let mismatch = || TypeError::mismatch(column_type, format!("{:?}", wire));

    match (column_type, wire) {
        (_, WireValue::Null) => Ok(Value::Null),
        (ColumnType::Text, WireValue::Text(s)) => Ok(Value::Text(s.clone())),
        (ColumnType::Int | ColumnType::BigInt, WireValue::Int(v)) => Ok(Value::Int(*v as i64)),
        (ColumnType::Int | ColumnType::BigInt, WireValue::BigInt(v)) => Ok(Value::Int(*v)),
        (ColumnType::Double, WireValue::Double(v)) => Ok(Value::Float(*v)),
        (ColumnType::Boolean, WireValue::Boolean(v)) => Ok(Value::Boolean(*v)),
        (ColumnType::Timestamp, WireValue::Timestamp(ms)) => DateTime::<Utc>::from_timestamp_millis(*ms)
            .map(Value::Timestamp)
            .ok_or_else(mismatch),
        (ColumnType::Uuid, WireValue::Uuid(v)) => Ok(Value::Uuid(*v)),
        (ColumnType::Blob, WireValue::Blob(v)) => Ok(Value::Blob(v.clone())),
        _ => Err(mismatch()),
    }
}
