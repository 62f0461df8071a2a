//! Primary key shapes.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// The declared primary key of a schema.
///
/// JSON forms: `"a"`, `["a", "b"]`, `[["a", "b"], "c"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    /// One column is the whole key
    Single(String),

    /// Flat list: first column is the partition key, the rest cluster
    Composite(Vec<String>),

    /// Explicit partition group followed by clustering columns
    Partitioned {
        partition: Vec<String>,
        clustering: Vec<String>,
    },
}

impl PrimaryKey {
    pub fn single(name: impl Into<String>) -> Self {
        PrimaryKey::Single(name.into())
    }

    pub fn composite<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PrimaryKey::Composite(names.into_iter().map(Into::into).collect())
    }

    pub fn partitioned<P, C, S>(partition: P, clustering: C) -> Self
    where
        P: IntoIterator<Item = S>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PrimaryKey::Partitioned {
            partition: partition.into_iter().map(Into::into).collect(),
            clustering: clustering.into_iter().map(Into::into).collect(),
        }
    }

    /// True for the list-shaped declarations.
    pub fn is_list(&self) -> bool {
        !matches!(self, PrimaryKey::Single(_))
    }

    /// Every key column by name: partition columns first, then clustering.
    pub fn key_columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(name) => vec![name.as_str()],
            PrimaryKey::Composite(names) => names.iter().map(String::as_str).collect(),
            PrimaryKey::Partitioned {
                partition,
                clustering,
            } => partition
                .iter()
                .chain(clustering.iter())
                .map(String::as_str)
                .collect(),
        }
    }

    pub fn partition_columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(name) => vec![name.as_str()],
            PrimaryKey::Composite(names) => names.iter().take(1).map(String::as_str).collect(),
            PrimaryKey::Partitioned { partition, .. } => {
                partition.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn clustering_columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(_) => Vec::new(),
            PrimaryKey::Composite(names) => names.iter().skip(1).map(String::as_str).collect(),
            PrimaryKey::Partitioned { clustering, .. } => {
                clustering.iter().map(String::as_str).collect()
            }
        }
    }

    /// The lookup list used to key updates and deletes.
    ///
    /// For the partitioned shape this yields the positional index of each
    /// top-level entry (`"0"`, `"1"`, ...) rather than field names, so
    /// updates and deletes on such schemas fail with a missing key.
    pub fn flat_list(&self) -> Vec<String> {
        match self {
            PrimaryKey::Single(name) => vec![name.clone()],
            PrimaryKey::Composite(names) => names.clone(),
            PrimaryKey::Partitioned { clustering, .. } => {
                (0..=clustering.len()).map(|idx| idx.to_string()).collect()
            }
        }
    }

    /// `PRIMARY KEY (...)` clause for CREATE TABLE.
    pub fn cql_clause(&self) -> String {
        match self {
            PrimaryKey::Single(name) => format!("PRIMARY KEY ({})", name),
            PrimaryKey::Composite(names) => format!("PRIMARY KEY ({})", names.join(", ")),
            PrimaryKey::Partitioned {
                partition,
                clustering,
            } => {
                let mut parts = vec![format!("({})", partition.join(", "))];
                parts.extend(clustering.iter().cloned());
                format!("PRIMARY KEY ({})", parts.join(", "))
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PrimaryKeyRepr {
    Single(String),
    List(Vec<KeyPart>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyPart {
    Name(String),
    Group(Vec<String>),
}

impl<'de> Deserialize<'de> for PrimaryKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parts = match PrimaryKeyRepr::deserialize(deserializer)? {
            PrimaryKeyRepr::Single(name) => return Ok(PrimaryKey::Single(name)),
            PrimaryKeyRepr::List(parts) => parts,
        };

        let mut iter = parts.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| de::Error::custom("primary key list must not be empty"))?;

        let rest = iter
            .map(|part| match part {
                KeyPart::Name(name) => Ok(name),
                KeyPart::Group(_) => Err(de::Error::custom(
                    "only the first primary key entry may be a partition group",
                )),
            })
            .collect::<Result<Vec<_>, D::Error>>()?;

        match first {
            KeyPart::Group(partition) if partition.is_empty() => {
                Err(de::Error::custom("partition key group must not be empty"))
            }
            KeyPart::Group(partition) => Ok(PrimaryKey::Partitioned {
                partition,
                clustering: rest,
            }),
            KeyPart::Name(name) => {
                let mut names = vec![name];
                names.extend(rest);
                Ok(PrimaryKey::Composite(names))
            }
        }
    }
}

impl Serialize for PrimaryKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PrimaryKey::Single(name) => serializer.serialize_str(name),
            PrimaryKey::Composite(names) => names.serialize(serializer),
            PrimaryKey::Partitioned {
                partition,
                clustering,
            } => {
                let mut seq = serializer.serialize_seq(Some(1 + clustering.len()))?;
                seq.serialize_element(partition)?;
                for name in clustering {
                    seq.serialize_element(name)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_shapes() {
        let single: PrimaryKey = serde_json::from_str("\"dog_id\"").unwrap();
        assert_eq!(single, PrimaryKey::single("dog_id"));

        let flat: PrimaryKey = serde_json::from_str(r#"["owner", "dog_id"]"#).unwrap();
        assert_eq!(flat, PrimaryKey::composite(["owner", "dog_id"]));

        let nested: PrimaryKey = serde_json::from_str(r#"[["owner", "city"], "dog_id"]"#).unwrap();
        assert_eq!(nested, PrimaryKey::partitioned(["owner", "city"], ["dog_id"]));
    }

    #[test]
    fn test_deserialize_rejects_bad_shapes() {
        assert!(serde_json::from_str::<PrimaryKey>("[]").is_err());
        assert!(serde_json::from_str::<PrimaryKey>(r#"["a", ["b"]]"#).is_err());
        assert!(serde_json::from_str::<PrimaryKey>(r#"[[]]"#).is_err());
    }

    #[test]
    fn test_serialize_round_trips_nested_form() {
        let key = PrimaryKey::partitioned(["a", "b"], ["c"]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"[["a","b"],"c"]"#);
        assert_eq!(serde_json::from_str::<PrimaryKey>(&json).unwrap(), key);
    }

    #[test]
    fn test_cql_clause_reproduces_shape() {
        assert_eq!(PrimaryKey::single("id").cql_clause(), "PRIMARY KEY (id)");
        assert_eq!(
            PrimaryKey::composite(["a", "b"]).cql_clause(),
            "PRIMARY KEY (a, b)"
        );
        assert_eq!(
            PrimaryKey::partitioned(["a", "b"], ["c", "d"]).cql_clause(),
            "PRIMARY KEY ((a, b), c, d)"
        );
    }

    #[test]
    fn test_flat_list_by_shape() {
        assert_eq!(PrimaryKey::single("dog_id").flat_list(), vec!["dog_id"]);
        assert_eq!(PrimaryKey::composite(["a", "b"]).flat_list(), vec!["a", "b"]);
        assert_eq!(
            PrimaryKey::partitioned(["a", "b"], ["c"]).flat_list(),
            vec!["0", "1"]
        );
    }

    #[test]
    fn test_partition_and_clustering_split() {
        let flat = PrimaryKey::composite(["a", "b", "c"]);
        assert_eq!(flat.partition_columns(), vec!["a"]);
        assert_eq!(flat.clustering_columns(), vec!["b", "c"]);

        let nested = PrimaryKey::partitioned(["a", "b"], ["c"]);
        assert_eq!(nested.key_columns(), vec!["a", "b", "c"]);
    }
}
