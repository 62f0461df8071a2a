//! Field declarations and the shorthand normalisation pass.

use colonnade_types::ColumnType;
use serde::{Deserialize, Serialize};

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// A null or missing value fails validation on save
    #[serde(default)]
    pub required: bool,

    /// Field-level primary key shorthand
    #[serde(default)]
    pub primary: bool,

    /// Create a secondary index for this column during sync
    #[serde(default)]
    pub index: bool,
}

impl FieldDefinition {
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            required: false,
            primary: false,
            index: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }
}

/// Authoring form of a field: a bare type or a full descriptor.
///
/// JSON accepts both `"breed": "text"` and `"breed": {"type": "text", "required": true}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Type(ColumnType),
    Definition(FieldDefinition),
}

impl FieldSpec {
    /// Canonicalise into a descriptor.
    pub fn normalize(self) -> FieldDefinition {
        match self {
            FieldSpec::Type(column_type) => FieldDefinition::new(column_type),
            FieldSpec::Definition(def) => def,
        }
    }
}

impl From<ColumnType> for FieldSpec {
    fn from(column_type: ColumnType) -> Self {
        FieldSpec::Type(column_type)
    }
}

impl From<FieldDefinition> for FieldSpec {
    fn from(def: FieldDefinition) -> Self {
        FieldSpec::Definition(def)
    }
}

/// Field definitions in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, FieldDefinition)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, def)| def)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace. A replaced field keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, def: FieldDefinition) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => *existing = def,
            None => self.entries.push((name, def)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.entries.iter().map(|(n, def)| (n.as_str(), def))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut FieldDefinition)> {
        self.entries.iter_mut().map(|(n, def)| (n.as_str(), def))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
