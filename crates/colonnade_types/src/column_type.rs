//! Column types supported by schemas.

use crate::error::TypeError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A declared column type.
///
/// Containers (`List`, `Map`) nest exactly one level and hold scalar types
/// only. Anything deeper is representable (live metadata may contain it) but
/// rejected by [`ColumnType::validate`]. Use `Blob` for arbitrary structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// UTF-8 string
    Text,

    /// 32-bit signed integer
    Int,

    /// 64-bit signed integer
    BigInt,

    /// 64-bit floating point
    Double,

    Boolean,

    /// Millisecond-precision instant
    Timestamp,

    Uuid,

    /// Raw bytes
    Blob,

    /// Typed list
    List { item: Box<ColumnType> },

    /// Typed map
    Map {
        key: Box<ColumnType>,
        value: Box<ColumnType>,
    },
}

impl ColumnType {
    /// Build a `list<item>` type.
    pub fn list(item: ColumnType) -> Self {
        ColumnType::List {
            item: Box::new(item),
        }
    }

    /// Build a `map<key, value>` type.
    pub fn map(key: ColumnType, value: ColumnType) -> Self {
        ColumnType::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Returns all scalar column types.
    pub fn scalars() -> Vec<ColumnType> {
        vec![
            ColumnType::Text,
            ColumnType::Int,
            ColumnType::BigInt,
            ColumnType::Double,
            ColumnType::Boolean,
            ColumnType::Timestamp,
            ColumnType::Uuid,
            ColumnType::Blob,
        ]
    }

    /// Returns true for list and map types.
    pub fn is_container(&self) -> bool {
        matches!(self, ColumnType::List { .. } | ColumnType::Map { .. })
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_container()
    }

    /// Check that the type is supported: containers one level deep with
    /// scalar members.
    pub fn validate(&self) -> Result<(), TypeError> {
        match self {
            ColumnType::List { item } if item.is_container() => Err(
                TypeError::UnsupportedType(format!("{} (nested containers are not supported)", self)),
            ),
            ColumnType::Map { key, value } if key.is_container() || value.is_container() => Err(
                TypeError::UnsupportedType(format!("{} (nested containers are not supported)", self)),
            ),
            _ => Ok(()),
        }
    }

    /// The CQL spelling of this type.
    pub fn cql_name(&self) -> String {
        match self {
            ColumnType::Text => "text".to_string(),
            ColumnType::Int => "int".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::Double => "double".to_string(),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Timestamp => "timestamp".to_string(),
            ColumnType::Uuid => "uuid".to_string(),
            ColumnType::Blob => "blob".to_string(),
            ColumnType::List { item } => format!("list<{}>", item.cql_name()),
            ColumnType::Map { key, value } => {
                format!("map<{}, {}>", key.cql_name(), value.cql_name())
            }
        }
    }

    fn parse_scalar(name: &str) -> Option<Self> {
        match name {
            "text" | "varchar" | "string" => Some(ColumnType::Text),
            "int" | "integer" => Some(ColumnType::Int),
            "bigint" | "long" => Some(ColumnType::BigInt),
            "double" => Some(ColumnType::Double),
            "boolean" | "bool" => Some(ColumnType::Boolean),
            "timestamp" => Some(ColumnType::Timestamp),
            "uuid" => Some(ColumnType::Uuid),
            "blob" | "binary" => Some(ColumnType::Blob),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cql_name())
    }
}

impl FromStr for ColumnType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let invalid = || TypeError::InvalidTypeName(s.to_string());

        if let Some(inner) = strip_generic(&normalized, "list") {
            return Ok(ColumnType::list(inner.parse()?));
        }

        if let Some(inner) = strip_generic(&normalized, "map") {
            let (key, value) = split_top_level_comma(inner).ok_or_else(invalid)?;
            return Ok(ColumnType::map(key.parse()?, value.parse()?));
        }

        Self::parse_scalar(&normalized).ok_or_else(invalid)
    }
}

/// `list<text>` -> `Some("text")` for prefix `list`.
fn strip_generic<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.strip_prefix(prefix)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

fn split_top_level_comma(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, ch) in s.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&s[..idx], &s[idx + 1..])),
            _ => {}
        }
    }
    None
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.cql_name())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
