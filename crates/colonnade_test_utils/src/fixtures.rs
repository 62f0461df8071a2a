//! Schemas and rows shared across tests.

use colonnade::{FieldDefinition, PrimaryKey, Row, Schema};
use colonnade_types::{ColumnType, WireValue};

/// `dog_id` int key, indexed `breed`, `age`, `tags` list.
pub fn dog_schema() -> Schema {
    Schema::builder()
        .field("dog_id", FieldDefinition::new(ColumnType::Int).primary())
        .field("breed", FieldDefinition::new(ColumnType::Text).indexed())
        .field("age", ColumnType::Int)
        .field("tags", ColumnType::list(ColumnType::Text))
        .build()
        .expect("dog schema is valid")
}

/// Keyless schema; gets a synthesized `id uuid` key.
pub fn note_schema() -> Schema {
    Schema::builder()
        .field("title", FieldDefinition::new(ColumnType::Text).required())
        .field("body", ColumnType::Text)
        .build()
        .expect("note schema is valid")
}

/// Composite key `(owner, dog_id)`.
pub fn kennel_schema() -> Schema {
    Schema::builder()
        .field("owner", ColumnType::Text)
        .field("dog_id", ColumnType::Int)
        .field("name", ColumnType::Text)
        .field("attrs", ColumnType::map(ColumnType::Text, ColumnType::Text))
        .primary(PrimaryKey::composite(["owner", "dog_id"]))
        .build()
        .expect("kennel schema is valid")
}

/// Build a result row from column/value pairs.
pub fn row(pairs: &[(&str, WireValue)]) -> Row {
    let (columns, values) = pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .unzip();
    Row::new(columns, values)
}
