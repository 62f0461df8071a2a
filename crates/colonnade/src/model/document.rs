//! Model instances and their change tracking.

use super::pipeline;
use super::Model;
use crate::driver::execute_statement;
use crate::error::ModelError;
use crate::query::{FieldValues, InsertMode, QueryBuilder};
use crate::schema::{HookEvent, Schema, DEFAULT_ID_FIELD};
use crate::statement::{QueryOptions, Statement};
use colonnade_types::{ColumnType, Value};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// One record of a model.
///
/// Assignments through [`Document::set`] mark the field modified. Mutating a
/// container in place (via [`Document::value_mut`]) does not; call
/// [`Document::mark_modified`] afterwards or use [`Document::tracked_list`] /
/// [`Document::tracked_map`].
pub struct Document {
    model: Model,
    values: FieldValues,
    modified: Vec<String>,
    is_new: bool,
}

impl Document {
    pub(crate) fn new(model: Model, is_new: bool) -> Self {
        Self {
            model,
            values: FieldValues::new(),
            modified: Vec::new(),
            is_new,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn schema(&self) -> &Schema {
        self.model.schema()
    }

    /// True until the document has been saved or was loaded from the table.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Modified field names in modification order.
    pub fn modified(&self) -> &[String] {
        &self.modified
    }

    pub fn is_modified(&self, field: &str) -> bool {
        self.modified.iter().any(|f| f == field)
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Stored value of a declared field.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// In-place access. Changes made here are not tracked.
    pub fn value_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.values.get_mut(field)
    }

    /// Read a field or virtual. Virtuals are computed on every call.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(virtual_field) = self.schema().virtual_field_def(name) {
            return Some(virtual_field.get(self));
        }
        self.values.get(name).cloned()
    }

    /// Assign a field (marking it modified) or a virtual with a setter.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        self.assign(name, value.into(), true)
    }

    pub(crate) fn assign(&mut self, name: &str, value: Value, track: bool) -> Result<(), ModelError> {
        if let Some(virtual_field) = self.schema().virtual_field_def(name) {
            let setter = virtual_field
                .setter()
                .ok_or_else(|| ModelError::ReadOnlyVirtual(name.to_string()))?;
            return setter(self, value);
        }

        if self.schema().field(name).is_none() {
            return Err(ModelError::UnknownField(name.to_string()));
        }
        self.values.insert(name.to_string(), value);
        if track {
            self.mark_modified(name);
        }
        Ok(())
    }

    /// Store a loaded value without tracking.
    pub(crate) fn load(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Flag `field` as changed so the next update writes it.
    pub fn mark_modified(&mut self, field: &str) {
        if !self.is_modified(field) {
            self.modified.push(field.to_string());
        }
    }

    /// Record that the current values are stored. For callers that persist
    /// statements themselves, e.g. through [`crate::Context::batch`].
    pub fn mark_persisted(&mut self) {
        self.modified.clear();
        self.is_new = false;
    }

    /// Mutating view of a list field that marks it modified on change.
    pub fn tracked_list(&mut self, field: &str) -> Result<TrackedList<'_>, ModelError> {
        match self.schema().column_type(field) {
            Some(ColumnType::List { .. }) => {}
            Some(_) => {
                return Err(ModelError::NotAContainer {
                    field: field.to_string(),
                    expected: "list",
                })
            }
            None => return Err(ModelError::UnknownField(field.to_string())),
        }

        let items = match self.values.remove(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::List(items)) => items,
            Some(other) => {
                self.values.insert(field.to_string(), other);
                return Err(ModelError::NotAContainer {
                    field: field.to_string(),
                    expected: "list",
                });
            }
        };

        Ok(TrackedList {
            doc: self,
            field: field.to_string(),
            items,
            dirty: false,
        })
    }

    /// Mutating view of a map field that marks it modified on change.
    pub fn tracked_map(&mut self, field: &str) -> Result<TrackedMap<'_>, ModelError> {
        match self.schema().column_type(field) {
            Some(ColumnType::Map { .. }) => {}
            Some(_) => {
                return Err(ModelError::NotAContainer {
                    field: field.to_string(),
                    expected: "map",
                })
            }
            None => return Err(ModelError::UnknownField(field.to_string())),
        }

        let entries = match self.values.remove(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Map(entries)) => entries,
            Some(other) => {
                self.values.insert(field.to_string(), other);
                return Err(ModelError::NotAContainer {
                    field: field.to_string(),
                    expected: "map",
                });
            }
        };

        Ok(TrackedMap {
            doc: self,
            field: field.to_string(),
            entries,
            dirty: false,
        })
    }

    /// Declared fields that hold a value, in declaration order.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for name in self.schema().fields().names() {
            if let Some(value) = self.values.get(name) {
                object.insert(name.to_string(), value.to_json());
            }
        }
        serde_json::Value::Object(object)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Validate, run hooks, then insert (new) or update (existing).
    pub async fn save(&mut self, options: &QueryOptions) -> Result<(), ModelError> {
        let statement = self.prepare_save(options).await?;
        execute_statement(self.model.driver(), &statement).await?;
        self.mark_persisted();
        pipeline::run_post(self, HookEvent::Save);
        Ok(())
    }

    /// Like [`Document::save`] but returns the statement instead of running it.
    /// Dirty state is left untouched and no post hooks run.
    pub async fn save_statement(&mut self, options: &QueryOptions) -> Result<Statement, ModelError> {
        self.prepare_save(options).await
    }

    /// Run remove hooks and delete the row by primary key.
    pub async fn remove(&mut self, options: &QueryOptions) -> Result<(), ModelError> {
        let statement = self.prepare_remove(options).await?;
        execute_statement(self.model.driver(), &statement).await?;
        pipeline::run_post(self, HookEvent::Remove);
        Ok(())
    }

    /// Like [`Document::remove`] but returns the statement instead of running it.
    pub async fn remove_statement(&mut self, options: &QueryOptions) -> Result<Statement, ModelError> {
        self.prepare_remove(options).await
    }

    async fn prepare_save(&mut self, options: &QueryOptions) -> Result<Statement, ModelError> {
        pipeline::validate(self)?;
        pipeline::run_post(self, HookEvent::Validate);
        pipeline::run_pre(self, HookEvent::Save).await?;

        if self.is_new {
            self.ensure_synthesized_id();
        }

        let options = self.model.effective_options(options);
        let builder = QueryBuilder::new(self.schema(), self.model.table_name());
        let statement = if self.is_new {
            builder.insert(&self.values, InsertMode::Full, &options)?
        } else {
            builder.update(&self.values, &self.modified, &options)?
        };
        debug!(
            model = %self.model.name(),
            kind = statement.kind().as_str(),
            "Compiled save statement"
        );
        Ok(statement)
    }

    async fn prepare_remove(&mut self, options: &QueryOptions) -> Result<Statement, ModelError> {
        pipeline::run_pre(self, HookEvent::Remove).await?;
        let options = self.model.effective_options(options);
        let statement = QueryBuilder::new(self.schema(), self.model.table_name())
            .delete(&self.values, &options)?;
        Ok(statement)
    }

    fn ensure_synthesized_id(&mut self) {
        if !self.schema().has_synthesized_id() {
            return;
        }
        let unset = self
            .values
            .get(DEFAULT_ID_FIELD)
            .map(Value::is_null)
            .unwrap_or(true);
        if unset {
            self.values
                .insert(DEFAULT_ID_FIELD.to_string(), Value::Uuid(Uuid::new_v4()));
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("model", &self.model.name())
            .field("values", &self.values)
            .field("modified", &self.modified)
            .field("is_new", &self.is_new)
            .finish()
    }
}

// ============================================================================
// Tracked containers
// ============================================================================

/// A list field borrowed out of a document. Written back on drop.
pub struct TrackedList<'a> {
    doc: &'a mut Document,
    field: String,
    items: Vec<Value>,
    dirty: bool,
}

impl TrackedList<'_> {
    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
        self.dirty = true;
    }

    pub fn pop(&mut self) -> Option<Value> {
        let popped = self.items.pop();
        self.dirty |= popped.is_some();
        popped
    }

    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index >= self.items.len() {
            return None;
        }
        self.dirty = true;
        Some(self.items.remove(index))
    }

    /// Replace the item at `index`. Returns false when out of bounds.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> bool {
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.dirty |= !self.items.is_empty();
        self.items.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Drop for TrackedList<'_> {
    fn drop(&mut self) {
        let items = std::mem::take(&mut self.items);
        self.doc.load(&self.field, Value::List(items));
        if self.dirty {
            self.doc.mark_modified(&self.field);
        }
    }
}

/// A map field borrowed out of a document. Written back on drop.
pub struct TrackedMap<'a> {
    doc: &'a mut Document,
    field: String,
    entries: Vec<(Value, Value)>,
    dirty: bool,
}

impl TrackedMap<'_> {
    /// Insert or replace; returns the previous value for the key.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        self.dirty = true;
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        self.dirty = true;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        self.dirty |= !self.entries.is_empty();
        self.entries.clear();
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for TrackedMap<'_> {
    fn drop(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        self.doc.load(&self.field, Value::Map(entries));
        if self.dirty {
            self.doc.mark_modified(&self.field);
        }
    }
}
