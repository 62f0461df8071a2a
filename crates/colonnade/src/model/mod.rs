//! Model factories and the document lifecycle.
//!
//! A [`Model`] is what [`crate::Context::register`] hands back: a cheap,
//! cloneable handle bundling the frozen schema, the table name and the
//! driver. It creates new [`Document`]s and loads existing ones.

mod document;
mod pipeline;

pub use document::{Document, TrackedList, TrackedMap};

use crate::context::Runtime;
use crate::driver::{execute_statement, Driver, Row};
use crate::error::ModelError;
use crate::query::{Filter, FindOptions, QueryBuilder};
use crate::schema::{HookEvent, Schema};
use crate::statement::QueryOptions;
use colonnade_types::{unmarshal, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Factory and finder for one registered schema.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    name: String,
    table: String,
    schema: Arc<Schema>,
    runtime: Arc<Runtime>,
}

impl Model {
    pub(crate) fn new(name: &str, table: String, schema: Arc<Schema>, runtime: Arc<Runtime>) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                name: name.to_string(),
                table,
                schema,
                runtime,
            }),
        }
    }

    /// Name the model was registered under.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Backing table: the model name, lower-cased.
    pub fn table_name(&self) -> &str {
        &self.inner.table
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Statement compiler bound to this model's table.
    pub fn builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.inner.schema, &self.inner.table)
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.inner.runtime.driver()
    }

    pub(crate) fn effective_options(&self, options: &QueryOptions) -> QueryOptions {
        self.inner.runtime.effective_options(options)
    }

    /// New, unsaved document populated from `values`. Runs `init` post hooks.
    pub fn create<I, K, V>(&self, values: I) -> Result<Document, ModelError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut doc = Document::new(self.clone(), true);
        for (name, value) in values {
            doc.assign(name.as_ref(), value.into(), false)?;
        }
        pipeline::run_post(&doc, HookEvent::Init);
        Ok(doc)
    }

    /// [`Model::create`] from a JSON object.
    pub fn create_from_json(&self, json: &serde_json::Value) -> Result<Document, ModelError> {
        let empty = serde_json::Map::new();
        let object = match json {
            serde_json::Value::Object(object) => object,
            serde_json::Value::Null => &empty,
            other => {
                return Err(ModelError::InvalidValues(format!(
                    "expected an object, got {}",
                    other
                )))
            }
        };
        self.create(object.iter().map(|(k, v)| (k.as_str(), Value::from_json(v))))
    }

    /// Load documents matching `filter`. Runs `init` post hooks on each.
    pub async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, ModelError> {
        let mut statement = self.builder().select(filter, options)?;
        let effective = self.effective_options(statement.options());
        *statement.options_mut() = effective;

        let result = execute_statement(self.driver(), &statement).await?;
        debug!(model = %self.name(), rows = result.len(), "Find returned rows");

        result.rows().iter().map(|row| self.hydrate(row)).collect()
    }

    /// First document matching `filter`, if any.
    pub async fn find_one(&self, filter: &Filter, options: &FindOptions) -> Result<Option<Document>, ModelError> {
        let options = FindOptions {
            limit: Some(1),
            ..options.clone()
        };
        Ok(self.find(filter, &options).await?.into_iter().next())
    }

    /// Run a custom finder registered with [`Schema::add_query`].
    pub async fn query(&self, name: &str, args: serde_json::Value) -> Result<Vec<Document>, ModelError> {
        let finder = self
            .schema()
            .query(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownQuery(name.to_string()))?;
        finder(self.clone(), args).await
    }

    fn hydrate(&self, row: &Row) -> Result<Document, ModelError> {
        let mut doc = Document::new(self.clone(), false);
        for (column, wire) in row.iter() {
            match self.schema().column_type(column) {
                Some(column_type) => doc.load(column, unmarshal(wire, column_type)?),
                None => debug!(model = %self.name(), column = %column, "Ignoring undeclared column"),
            }
        }
        pipeline::run_post(&doc, HookEvent::Init);
        Ok(doc)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("table", &self.inner.table)
            .field("schema", &self.inner.schema)
            .finish()
    }
}
