//! Schema definitions
//!
//! A [`Schema`] declares the fields of one record shape and everything that
//! governs its lifecycle: the primary key, validators, hooks, virtual fields
//! and custom finders.
//!
//! # Primary key resolution
//!
//! Exactly one source of truth wins:
//!
//! - a schema-level single-name `primary` option overrides field flags
//! - a schema-level list option next to a field flag is an error
//! - a single field flag is used when no option is given
//! - with nothing declared, a `uuid` field named `id` is synthesized, unless a
//!   field named `id` already exists (ambiguous, rejected)

mod field;
mod hooks;
mod primary_key;

pub use field::{FieldDefinition, FieldMap, FieldSpec};
pub use hooks::{
    CustomQuery, HookError, HookEvent, HookKind, Plugin, PluginRegistry, PostHook, PreHook,
    QueryEntry, Validator, Virtual,
};
pub use primary_key::PrimaryKey;

use crate::identifier::validate_column_identifier;
use crate::model::Document;
use colonnade_types::{ColumnType, TypeError, Value};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Name of the synthesized key field.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Errors raised while constructing or configuring a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Multiple primary keys declared: {0}")]
    MultiplePrimaryKeys(String),

    #[error("Schema declares a field named 'id' but no primary key; you must specify a primary key")]
    MissingPrimaryKey,

    #[error("Primary key references unknown field '{0}'")]
    UnknownKeyField(String),

    #[error("Field '{0}' is part of the primary key and cannot be redefined")]
    KeyFieldRedefined(String),

    #[error("{kind} hooks only supports: {allowed} (got '{event}')")]
    UnsupportedHookEvent {
        kind: String,
        event: String,
        allowed: String,
    },

    #[error("Plugin '{0}' is not callable")]
    PluginNotCallable(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid type for field '{field}': {source}")]
    Type {
        field: String,
        #[source]
        source: TypeError,
    },

    #[error("Invalid schema definition: {0}")]
    Definition(String),
}

/// Schema-level options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOptions {
    /// Schema-level primary key declaration
    #[serde(default)]
    pub primary: Option<PrimaryKey>,

    /// Include this schema in table synchronization
    #[serde(default = "default_sync")]
    pub sync: bool,

    /// Appended verbatim to CREATE TABLE as `WITH ...`
    #[serde(default)]
    pub create_options: Option<String>,
}

fn default_sync() -> bool {
    true
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            primary: None,
            sync: default_sync(),
            create_options: None,
        }
    }
}

/// A declared record shape.
#[derive(Clone)]
pub struct Schema {
    fields: FieldMap,
    primary: PrimaryKey,
    synthesized_id: bool,
    validators: Vec<(String, Vec<Validator>)>,
    pre_hooks: HashMap<HookEvent, Vec<PreHook>>,
    post_hooks: HashMap<HookEvent, Vec<PostHook>>,
    virtuals: BTreeMap<String, Virtual>,
    queries: BTreeMap<String, CustomQuery>,
    sync: bool,
    create_options: Option<String>,
}

impl Schema {
    /// Start a builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Construct a schema from field specs and options.
    pub fn new<I, K>(fields: I, options: SchemaOptions) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (K, FieldSpec)>,
        K: Into<String>,
    {
        let mut field_map = FieldMap::new();
        for (name, spec) in fields {
            let name = name.into();
            let def = normalize_field(&name, spec)?;
            field_map.insert(name, def);
        }

        let (primary, synthesized_id) = resolve_primary_key(&mut field_map, options.primary)?;

        let key_columns: Vec<String> = primary.key_columns().iter().map(|s| s.to_string()).collect();
        for (name, def) in field_map.iter_mut() {
            def.primary = key_columns.iter().any(|k| k == name);
        }

        let mut schema = Self {
            fields: field_map,
            primary,
            synthesized_id,
            validators: Vec::new(),
            pre_hooks: HashMap::new(),
            post_hooks: HashMap::new(),
            virtuals: BTreeMap::new(),
            queries: BTreeMap::new(),
            sync: options.sync,
            create_options: options.create_options,
        };

        let required: Vec<String> = schema
            .fields
            .iter()
            .filter(|(_, def)| def.required)
            .map(|(name, _)| name.to_string())
            .collect();
        for name in required {
            schema.prepend_required_validator(&name);
        }

        Ok(schema)
    }

    /// Construct a schema from JSON field descriptors and options.
    ///
    /// `fields` is an object of `name -> "type"` or `name -> {"type": ..., ...}`.
    pub fn from_json(
        fields: &serde_json::Value,
        options: &serde_json::Value,
    ) -> Result<Self, SchemaError> {
        let object = fields
            .as_object()
            .ok_or_else(|| SchemaError::Definition("fields must be a JSON object".to_string()))?;

        let mut specs = Vec::with_capacity(object.len());
        for (name, raw) in object {
            let spec: FieldSpec = serde_json::from_value(raw.clone()).map_err(|e| {
                SchemaError::Definition(format!("field '{}': {}", name, e))
            })?;
            specs.push((name.clone(), spec));
        }

        let options = if options.is_null() {
            SchemaOptions::default()
        } else {
            serde_json::from_value(options.clone())
                .map_err(|e| SchemaError::Definition(format!("options: {}", e)))?
        };

        Self::new(specs, options)
    }

    // ========================================================================
    // Setup-phase mutators
    // ========================================================================

    /// Merge fields into the schema.
    ///
    /// Same-named fields are replaced entirely, except primary-key columns,
    /// which are refused. Added fields never join the primary key, whatever
    /// they declare.
    pub fn add<I, K>(&mut self, fields: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = (K, FieldSpec)>,
        K: Into<String>,
    {
        let mut added = Vec::new();
        for (name, spec) in fields {
            let name = name.into();
            if self.is_key_column(&name) {
                return Err(SchemaError::KeyFieldRedefined(name));
            }
            let def = normalize_field(&name, spec)?;
            added.push((name, def));
        }

        for (name, mut def) in added {
            if def.primary {
                debug!(field = %name, "Ignoring primary claim on added field");
            }
            def.primary = false;
            let required = def.required;
            self.fields.insert(name.clone(), def);

            if let Some((_, list)) = self.validators.iter_mut().find(|(n, _)| *n == name) {
                list.retain(|v| !v.is_implicit_required());
            }
            if required {
                self.prepend_required_validator(&name);
            }
        }
        Ok(())
    }

    /// Append a validator for `field`. Unknown field names are accepted.
    pub fn validate_field<F>(&mut self, field: &str, predicate: F, message: impl Into<String>)
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        let validator = Validator::new(predicate, message);
        match self.validators.iter_mut().find(|(n, _)| n == field) {
            Some((_, list)) => list.push(validator),
            None => self.validators.push((field.to_string(), vec![validator])),
        }
    }

    /// Register a pre hook for `event` (save or remove).
    pub fn pre<F>(&mut self, event: HookEvent, hook: F) -> Result<(), SchemaError>
    where
        F: for<'a> Fn(&'a mut Document) -> BoxFuture<'a, Result<(), HookError>>
            + Send
            + Sync
            + 'static,
    {
        self.pre_named(event.as_str(), hook)
    }

    /// Register a pre hook by event name.
    pub fn pre_named<F>(&mut self, event: &str, hook: F) -> Result<(), SchemaError>
    where
        F: for<'a> Fn(&'a mut Document) -> BoxFuture<'a, Result<(), HookError>>
            + Send
            + Sync
            + 'static,
    {
        let event = HookKind::Pre.check(event)?;
        self.pre_hooks.entry(event).or_default().push(Arc::new(hook));
        Ok(())
    }

    /// Register a post hook for `event` (save, remove, validate or init).
    pub fn post<F>(&mut self, event: HookEvent, hook: F) -> Result<(), SchemaError>
    where
        F: Fn(&Document) + Send + Sync + 'static,
    {
        self.post_named(event.as_str(), hook)
    }

    /// Register a post hook by event name.
    pub fn post_named<F>(&mut self, event: &str, hook: F) -> Result<(), SchemaError>
    where
        F: Fn(&Document) + Send + Sync + 'static,
    {
        let event = HookKind::Post.check(event)?;
        self.post_hooks.entry(event).or_default().push(Arc::new(hook));
        Ok(())
    }

    /// Register a computed field.
    pub fn virtual_field(&mut self, name: impl Into<String>, field: Virtual) {
        self.virtuals.insert(name.into(), field);
    }

    /// Apply a plugin synchronously.
    pub fn plugin<P>(&mut self, plugin: &P, options: &serde_json::Value) -> Result<(), SchemaError>
    where
        P: Plugin + ?Sized,
    {
        plugin.apply(self, options)
    }

    /// Apply a plugin looked up by name.
    pub fn plugin_named(
        &mut self,
        registry: &PluginRegistry,
        name: &str,
        options: &serde_json::Value,
    ) -> Result<(), SchemaError> {
        let plugin = registry
            .get(name)
            .ok_or_else(|| SchemaError::PluginNotCallable(name.to_string()))?;
        plugin.apply(self, options)
    }

    /// Register custom finders. Entries that are not callable are skipped.
    pub fn add_query<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, QueryEntry)>,
        K: Into<String>,
    {
        for (name, entry) in entries {
            let name = name.into();
            match entry {
                QueryEntry::Finder(query) => {
                    self.queries.insert(name, query);
                }
                QueryEntry::NotCallable(_) => {
                    debug!(query = %name, "Skipping non-callable query entry");
                }
            }
        }
    }

    fn prepend_required_validator(&mut self, field: &str) {
        let validator = Validator::required(field);
        match self.validators.iter_mut().find(|(n, _)| n == field) {
            Some((_, list)) => list.insert(0, validator),
            None => self.validators.push((field.to_string(), vec![validator])),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn column_type(&self, name: &str) -> Option<&ColumnType> {
        self.fields.get(name).map(|def| &def.column_type)
    }

    pub fn primary(&self) -> &PrimaryKey {
        &self.primary
    }

    /// See [`PrimaryKey::flat_list`].
    pub fn flat_primary_list(&self) -> Vec<String> {
        self.primary.flat_list()
    }

    pub fn key_columns(&self) -> Vec<&str> {
        self.primary.key_columns()
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.primary.key_columns().contains(&name)
    }

    /// True when the key is the synthesized `id` field.
    pub fn has_synthesized_id(&self) -> bool {
        self.synthesized_id
    }

    /// Validators in field order.
    pub fn validators(&self) -> &[(String, Vec<Validator>)] {
        &self.validators
    }

    pub fn validators_for(&self, field: &str) -> &[Validator] {
        self.validators
            .iter()
            .find(|(n, _)| n == field)
            .map(|(_, list)| list.as_slice())
            .unwrap_or(&[])
    }

    pub fn pre_hooks(&self, event: HookEvent) -> &[PreHook] {
        self.pre_hooks.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn post_hooks(&self, event: HookEvent) -> &[PostHook] {
        self.post_hooks.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn virtuals(&self) -> &BTreeMap<String, Virtual> {
        &self.virtuals
    }

    pub fn virtual_field_def(&self, name: &str) -> Option<&Virtual> {
        self.virtuals.get(name)
    }

    pub fn query(&self, name: &str) -> Option<&CustomQuery> {
        self.queries.get(name)
    }

    pub fn query_names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn sync_enabled(&self) -> bool {
        self.sync
    }

    pub fn create_options(&self) -> Option<&str> {
        self.create_options.as_deref()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("primary", &self.primary)
            .field("synthesized_id", &self.synthesized_id)
            .field("virtuals", &self.virtuals.keys().collect::<Vec<_>>())
            .field("queries", &self.queries.keys().collect::<Vec<_>>())
            .field("sync", &self.sync)
            .finish()
    }
}

fn normalize_field(name: &str, spec: FieldSpec) -> Result<FieldDefinition, SchemaError> {
    validate_column_identifier(name).map_err(|e| SchemaError::InvalidIdentifier(e.to_string()))?;
    let def = spec.normalize();
    def.column_type.validate().map_err(|source| SchemaError::Type {
        field: name.to_string(),
        source,
    })?;
    Ok(def)
}

fn resolve_primary_key(
    fields: &mut FieldMap,
    option: Option<PrimaryKey>,
) -> Result<(PrimaryKey, bool), SchemaError> {
    let flagged: Vec<String> = fields
        .iter()
        .filter(|(_, def)| def.primary)
        .map(|(name, _)| name.to_string())
        .collect();

    let primary = match option {
        Some(PrimaryKey::Single(name)) => PrimaryKey::Single(name),
        Some(list) => {
            if !flagged.is_empty() {
                return Err(SchemaError::MultiplePrimaryKeys(format!(
                    "field(s) {} marked primary and a schema-level key {:?} declared",
                    flagged.join(", "),
                    list.key_columns()
                )));
            }
            list
        }
        None => match flagged.len() {
            1 => PrimaryKey::Single(flagged[0].clone()),
            0 if fields.contains(DEFAULT_ID_FIELD) => return Err(SchemaError::MissingPrimaryKey),
            0 => {
                fields.insert(
                    DEFAULT_ID_FIELD,
                    FieldDefinition::new(ColumnType::Uuid).primary(),
                );
                return Ok((PrimaryKey::single(DEFAULT_ID_FIELD), true));
            }
            _ => {
                return Err(SchemaError::MultiplePrimaryKeys(format!(
                    "fields {} are all marked primary; declare a composite key in options",
                    flagged.join(", ")
                )))
            }
        },
    };

    let columns = primary.key_columns();
    if columns.is_empty() {
        return Err(SchemaError::Definition("primary key must name at least one field".to_string()));
    }
    for column in columns {
        if !fields.contains(column) {
            return Err(SchemaError::UnknownKeyField(column.to_string()));
        }
    }

    Ok((primary, false))
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent construction of a [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldSpec)>,
    options: SchemaOptions,
}

impl SchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.fields.push((name.into(), spec.into()));
        self
    }

    pub fn primary(mut self, key: PrimaryKey) -> Self {
        self.options.primary = Some(key);
        self
    }

    pub fn sync(mut self, enabled: bool) -> Self {
        self.options.sync = enabled;
        self
    }

    pub fn create_options(mut self, options: impl Into<String>) -> Self {
        self.options.create_options = Some(options.into());
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::new(self.fields, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dog_schema() -> Schema {
        Schema::builder()
            .field("dog_id", FieldDefinition::new(ColumnType::Int).primary())
            .field("breed", ColumnType::Text)
            .build()
            .unwrap()
    }

    #[test]
    fn test_field_level_primary() {
        let schema = dog_schema();
        assert_eq!(schema.primary(), &PrimaryKey::single("dog_id"));
        assert_eq!(schema.flat_primary_list(), vec!["dog_id"]);
        assert!(!schema.has_synthesized_id());
        assert!(schema.field(DEFAULT_ID_FIELD).is_none());
    }

    #[test]
    fn test_schema_level_list_primary() {
        let schema = Schema::builder()
            .field("dog_id", ColumnType::Int)
            .primary(PrimaryKey::composite(["dog_id"]))
            .build()
            .unwrap();
        assert_eq!(schema.primary(), &PrimaryKey::composite(["dog_id"]));
        assert!(schema.field("dog_id").unwrap().primary);
    }

    #[test]
    fn test_synthesizes_uuid_id() {
        let schema = Schema::builder().field("name", ColumnType::Text).build().unwrap();
        assert_eq!(
            schema.field("id"),
            Some(&FieldDefinition::new(ColumnType::Uuid).primary())
        );
        assert_eq!(schema.primary(), &PrimaryKey::single("id"));
        assert!(schema.has_synthesized_id());
        let names: Vec<&str> = schema.fields().names().collect();
        assert_eq!(names, vec!["name", "id"]);
    }

    #[test]
    fn test_existing_id_without_primary_fails() {
        let err = Schema::builder().field("id", ColumnType::Int).build().unwrap_err();
        assert_eq!(err, SchemaError::MissingPrimaryKey);
        assert!(err.to_string().contains("must specify a primary key"));
    }

    #[test]
    fn test_field_primary_with_list_option_fails() {
        let err = Schema::builder()
            .field("dog_id", FieldDefinition::new(ColumnType::Int).primary())
            .field("owner", ColumnType::Text)
            .primary(PrimaryKey::composite(["owner", "dog_id"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::MultiplePrimaryKeys(_)));
    }

    #[test]
    fn test_single_name_option_silently_wins() {
        let schema = Schema::builder()
            .field("dog_id", FieldDefinition::new(ColumnType::Int).primary())
            .field("tag", ColumnType::Text)
            .primary(PrimaryKey::single("tag"))
            .build()
            .unwrap();
        assert_eq!(schema.primary(), &PrimaryKey::single("tag"));
        assert!(!schema.field("dog_id").unwrap().primary);
        assert!(schema.field("tag").unwrap().primary);
    }

    #[test]
    fn test_two_flagged_fields_fail() {
        let err = Schema::builder()
            .field("a", FieldDefinition::new(ColumnType::Int).primary())
            .field("b", FieldDefinition::new(ColumnType::Int).primary())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::MultiplePrimaryKeys(_)));
    }

    #[test]
    fn test_unknown_key_field_fails() {
        let err = Schema::builder()
            .field("a", ColumnType::Int)
            .primary(PrimaryKey::partitioned(["a", "b"], ["c"]))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::UnknownKeyField("b".to_string()));
    }

    #[test]
    fn test_partitioned_flat_list_is_positional() {
        let schema = Schema::builder()
            .field("owner", ColumnType::Text)
            .field("city", ColumnType::Text)
            .field("dog_id", ColumnType::Int)
            .primary(PrimaryKey::partitioned(["owner", "city"], ["dog_id"]))
            .build()
            .unwrap();
        assert_eq!(schema.flat_primary_list(), vec!["0", "1"]);
        assert_eq!(schema.key_columns(), vec!["owner", "city", "dog_id"]);
    }

    #[test]
    fn test_invalid_field_name_and_nested_type() {
        let err = Schema::builder().field("bad-name", ColumnType::Text).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier(_)));

        let err = Schema::builder()
            .field("nested", ColumnType::list(ColumnType::list(ColumnType::Int)))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Type { .. }));
    }

    #[test]
    fn test_required_field_gets_implicit_validator_first() {
        let mut schema = Schema::builder()
            .field("name", FieldDefinition::new(ColumnType::Text).required())
            .build()
            .unwrap();
        schema.validate_field("name", |v| v.is_some(), "custom");

        let validators = schema.validators_for("name");
        assert_eq!(validators.len(), 2);
        assert_eq!(validators[0].message(), "Field: name is required.");
        assert_eq!(validators[1].message(), "custom");
    }

    #[test]
    fn test_validate_field_on_unknown_field_is_lenient() {
        let mut schema = dog_schema();
        schema.validate_field("ghost", |_| true, "never");
        assert_eq!(schema.validators_for("ghost").len(), 1);
        assert!(schema.field("ghost").is_none());
    }

    #[test]
    fn test_add_strips_primary_and_overwrites() {
        let mut schema = dog_schema();
        schema
            .add([
                ("age", FieldSpec::from(FieldDefinition::new(ColumnType::Int).primary())),
                ("breed", FieldSpec::from(FieldDefinition::new(ColumnType::BigInt).required())),
            ])
            .unwrap();

        assert!(!schema.field("age").unwrap().primary);
        assert_eq!(schema.primary(), &PrimaryKey::single("dog_id"));
        assert_eq!(schema.field("breed").unwrap().column_type, ColumnType::BigInt);
        assert_eq!(schema.validators_for("breed")[0].message(), "Field: breed is required.");

        schema.add([("breed", FieldSpec::from(ColumnType::Text))]).unwrap();
        assert!(schema.validators_for("breed").is_empty());
    }

    #[test]
    fn test_add_refuses_key_columns() {
        let mut schema = dog_schema();
        let err = schema
            .add([
                ("age", FieldSpec::from(ColumnType::Int)),
                ("dog_id", FieldSpec::from(ColumnType::list(ColumnType::Text))),
            ])
            .unwrap_err();
        assert_eq!(err, SchemaError::KeyFieldRedefined("dog_id".to_string()));

        let key = schema.field("dog_id").unwrap();
        assert!(key.primary);
        assert_eq!(key.column_type, ColumnType::Int);
        assert!(schema.field("age").is_none());

        let mut synthesized = Schema::builder().field("name", ColumnType::Text).build().unwrap();
        let err = synthesized.add([("id", FieldSpec::from(ColumnType::Text))]).unwrap_err();
        assert_eq!(err, SchemaError::KeyFieldRedefined("id".to_string()));
        assert_eq!(synthesized.field("id").unwrap().column_type, ColumnType::Uuid);
    }

    #[test]
    fn test_camel_case_field_names_are_rejected() {
        let err = Schema::builder().field("dogId", ColumnType::Int).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier(ref m) if m.contains("lower case")));

        let mut schema = dog_schema();
        let err = schema.add([("ownerName", FieldSpec::from(ColumnType::Text))]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier(_)));
        assert!(schema.field("ownerName").is_none());
    }

    #[test]
    fn test_pre_hook_registration() {
        let mut schema = dog_schema();
        let err = schema
            .pre_named("invalid", |_doc| Box::pin(async { Ok(()) }))
            .unwrap_err();
        assert!(err.to_string().contains("only supports"));

        schema
            .pre(HookEvent::Save, |_doc| Box::pin(async { Ok(()) }))
            .unwrap();
        assert_eq!(schema.pre_hooks(HookEvent::Save).len(), 1);
        assert!(schema.pre_hooks(HookEvent::Remove).is_empty());

        assert!(schema.pre(HookEvent::Init, |_doc| Box::pin(async { Ok(()) })).is_err());
    }

    #[test]
    fn test_post_hook_registration() {
        let mut schema = dog_schema();
        schema.post(HookEvent::Init, |_doc| {}).unwrap();
        schema.post_named("validate", |_doc| {}).unwrap();
        assert!(schema.post_named("bogus", |_doc| {}).is_err());
        assert_eq!(schema.post_hooks(HookEvent::Init).len(), 1);
        assert_eq!(schema.post_hooks(HookEvent::Validate).len(), 1);
    }

    #[test]
    fn test_plugin_mutates_schema() {
        let mut schema = dog_schema();
        let timestamps = |schema: &mut Schema, options: &serde_json::Value| {
            let field = options["field"].as_str().unwrap_or("updated_at").to_string();
            schema.add([(field, FieldSpec::from(ColumnType::Timestamp))])
        };
        schema.plugin(&timestamps, &json!({"field": "touched_at"})).unwrap();
        assert!(schema.field("touched_at").is_some());
    }

    #[test]
    fn test_plugin_named_missing_is_not_callable() {
        let mut schema = dog_schema();
        let registry = PluginRegistry::new();
        let err = schema.plugin_named(&registry, "nope", &json!({})).unwrap_err();
        assert_eq!(err, SchemaError::PluginNotCallable("nope".to_string()));
    }

    #[test]
    fn test_add_query_skips_non_callable() {
        let mut schema = dog_schema();
        schema.add_query([
            ("by_breed", QueryEntry::finder(|_model, _args| async { Ok(Vec::new()) })),
            ("broken", QueryEntry::from(json!("not a function"))),
        ]);
        let names: Vec<&str> = schema.query_names().collect();
        assert_eq!(names, vec!["by_breed"]);
    }

    #[test]
    fn test_from_json_shorthand_and_options() {
        let schema = Schema::from_json(
            &json!({
                "owner": "text",
                "dog_id": {"type": "int", "required": true},
                "tags": "list<text>"
            }),
            &json!({"primary": [["owner"], "dog_id"], "sync": false, "createOptions": "CLUSTERING ORDER BY (dog_id DESC)"}),
        )
        .unwrap();

        assert_eq!(schema.primary(), &PrimaryKey::partitioned(["owner"], ["dog_id"]));
        assert!(!schema.sync_enabled());
        assert_eq!(schema.create_options(), Some("CLUSTERING ORDER BY (dog_id DESC)"));
        assert_eq!(schema.column_type("tags"), Some(&ColumnType::list(ColumnType::Text)));
        let names: Vec<&str> = schema.fields().names().collect();
        assert_eq!(names, vec!["owner", "dog_id", "tags"]);
    }

    #[test]
    fn test_from_json_rejects_unknown_type() {
        let err = Schema::from_json(&json!({"x": "decimal"}), &serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, SchemaError::Definition(_)));
    }
}
