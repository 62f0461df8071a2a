//! Explicit model registry.
//!
//! A [`Context`] owns the driver, the configuration and the registered
//! models. Nothing is global: several contexts may coexist, each with its own
//! driver.

use crate::config::ColonnadeConfig;
use crate::driver::{BatchSummary, Driver};
use crate::error::ModelError;
use crate::identifier::{table_name_for, validate_identifier};
use crate::model::Model;
use crate::schema::{Schema, SchemaError};
use crate::statement::{QueryOptions, Statement};
use crate::sync::{SyncReport, TableSynchronizer};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, debug_span, info, Instrument};

/// Driver and settings shared by every model of a context.
pub(crate) struct Runtime {
    driver: Arc<dyn Driver>,
    config: ColonnadeConfig,
}

impl Runtime {
    pub(crate) fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Fill in context-wide defaults the caller left unset.
    pub(crate) fn effective_options(&self, options: &QueryOptions) -> QueryOptions {
        let mut effective = options.clone();
        if effective.consistency.is_none() {
            effective.consistency = self.config.default_consistency;
        }
        effective.debug |= self.config.debug_queries;
        effective
    }
}

/// Registry of models bound to one driver.
#[derive(Clone)]
pub struct Context {
    runtime: Arc<Runtime>,
    models: Arc<RwLock<BTreeMap<String, Model>>>,
}

impl Context {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_config(driver, ColonnadeConfig::default())
    }

    pub fn with_config(driver: Arc<dyn Driver>, config: ColonnadeConfig) -> Self {
        Self {
            runtime: Arc::new(Runtime { driver, config }),
            models: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn config(&self) -> &ColonnadeConfig {
        &self.runtime.config
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.runtime.driver
    }

    /// Freeze `schema` and register it under `name`.
    ///
    /// Re-registering a name replaces the previous model.
    pub fn register(&self, name: &str, schema: Schema) -> Result<Model, ModelError> {
        validate_identifier(name).map_err(|e| SchemaError::InvalidIdentifier(e.to_string()))?;

        let table = table_name_for(name);
        let model = Model::new(name, table, Arc::new(schema), Arc::clone(&self.runtime));

        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        if models.insert(name.to_string(), model.clone()).is_some() {
            debug!(model = %name, "Replaced registered model");
        }
        debug!(model = %name, table = %model.table_name(), "Registered model");
        Ok(model)
    }

    /// Look up a registered model.
    pub fn model(&self, name: &str) -> Result<Model, ModelError> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    /// Every registered model, ordered by name.
    pub fn models(&self) -> Vec<Model> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Submit statements as one atomic batch. Noop statements are dropped;
    /// when nothing remains the driver is not called.
    pub async fn batch(
        &self,
        statements: Vec<Statement>,
        options: &QueryOptions,
    ) -> Result<BatchSummary, ModelError> {
        let statements: Vec<Statement> = statements.into_iter().filter(|s| !s.is_noop()).collect();
        if statements.is_empty() {
            debug!("Batch contains only noop statements; skipping");
            return Ok(BatchSummary::default());
        }

        let options = self.runtime.effective_options(options);
        for statement in &statements {
            statement.log_debug();
        }

        let span = debug_span!(
            "cql.batch",
            statements = statements.len(),
            duration_ms = tracing::field::Empty
        );
        let start = Instant::now();
        let summary = self
            .runtime
            .driver
            .batch(&statements, &options)
            .instrument(span.clone())
            .await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        span.record("duration_ms", duration_ms);

        info!(statements = statements.len(), duration_ms, "Batch applied");
        Ok(summary)
    }

    /// Synchronize the tables of every registered model.
    pub async fn sync(&self) -> SyncReport {
        if !self.runtime.config.sync.enabled {
            info!("Table synchronization disabled by configuration");
            return SyncReport::default();
        }

        let models = self.models();
        info!(
            keyspace = self.runtime.config.keyspace.as_deref().unwrap_or("-"),
            models = models.len(),
            "Synchronizing tables"
        );

        let report = TableSynchronizer::new(Arc::clone(&self.runtime.driver))
            .warn_extra_columns(self.runtime.config.sync.warn_extra_columns)
            .sync_models(&models)
            .await;

        info!(
            statements = report.statement_count(),
            failed = report.errors().count(),
            "Synchronization finished"
        );
        report
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        f.debug_struct("Context")
            .field("config", &self.runtime.config)
            .field("models", &names)
            .finish()
    }
}
