//! Additive table synchronization.
//!
//! Compares each declared schema with the live table description and issues
//! the DDL needed to close the gap: create missing tables, add missing
//! columns, create missing indexes. Nothing is ever dropped or retyped.

use crate::driver::{execute_statement, Driver, DriverError, TableMetadata};
use crate::model::Model;
use crate::query::{QueryBuilder, QueryError};
use crate::schema::Schema;
use crate::statement::Statement;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, debug_span, info, warn, Instrument};

/// Failure while synchronizing one table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Failed to describe table '{table}': {source}")]
    Describe {
        table: String,
        #[source]
        source: DriverError,
    },

    #[error("DDL failed on table '{table}' ({statement}): {source}")]
    Ddl {
        table: String,
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error("Cannot compile DDL for table '{table}': {source}")]
    Compile {
        table: String,
        #[source]
        source: QueryError,
    },
}

/// Outcome for one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSyncReport {
    pub table: String,
    /// The table did not exist and was created
    pub created: bool,
    /// DDL executed, in order
    pub statements: Vec<String>,
    /// Live columns with no declared field
    pub extra_columns: Vec<String>,
    pub error: Option<SyncError>,
}

impl TableSyncReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a synchronization run over many tables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub tables: Vec<TableSyncReport>,
}

impl SyncReport {
    pub fn table(&self, name: &str) -> Option<&TableSyncReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Total DDL statements executed.
    pub fn statement_count(&self) -> usize {
        self.tables.iter().map(|t| t.statements.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.tables.iter().all(TableSyncReport::is_success)
    }

    pub fn errors(&self) -> impl Iterator<Item = &SyncError> {
        self.tables.iter().filter_map(|t| t.error.as_ref())
    }
}

/// Diffs declared schemas against live metadata and applies additive DDL.
#[derive(Clone)]
pub struct TableSynchronizer {
    driver: Arc<dyn Driver>,
    warn_extra_columns: bool,
}

impl TableSynchronizer {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            warn_extra_columns: true,
        }
    }

    pub fn warn_extra_columns(mut self, enabled: bool) -> Self {
        self.warn_extra_columns = enabled;
        self
    }

    /// DDL that brings `live` in line with `schema`, without executing it.
    pub fn plan(
        schema: &Schema,
        table: &str,
        live: Option<&TableMetadata>,
    ) -> Result<Vec<Statement>, QueryError> {
        let builder = QueryBuilder::new(schema, table);
        let indexed = schema
            .fields()
            .iter()
            .filter(|(_, def)| def.index)
            .map(|(name, _)| name);

        let Some(live) = live else {
            let mut statements = vec![builder.create_table()];
            for field in indexed {
                statements.push(builder.create_index(field)?);
            }
            return Ok(statements);
        };

        let mut statements = Vec::new();
        for (name, def) in schema.fields().iter() {
            if !live.has_column(name) {
                statements.push(builder.add_column(name)?);
                if def.index {
                    statements.push(builder.create_index(name)?);
                }
            }
        }
        for field in indexed {
            if live.has_column(field) && !live.is_indexed(field) {
                statements.push(builder.create_index(field)?);
            }
        }
        Ok(statements)
    }

    /// Synchronize every model with sync enabled. Tables run concurrently.
    pub async fn sync_models(&self, models: &[Model]) -> SyncReport {
        let futures = models
            .iter()
            .filter(|model| {
                let enabled = model.schema().sync_enabled();
                if !enabled {
                    debug!(table = %model.table_name(), "Sync disabled for model");
                }
                enabled
            })
            .map(|model| self.sync_table(model.table_name(), model.schema()));

        SyncReport {
            tables: join_all(futures).await,
        }
    }

    /// Synchronize one table. Steps run in order and stop at the first failure.
    pub async fn sync_table(&self, table: &str, schema: &Schema) -> TableSyncReport {
        let mut report = TableSyncReport::new(table);

        let live = match self.describe(table).await {
            Ok(live) => live,
            Err(source) => {
                report.error = Some(SyncError::Describe {
                    table: table.to_string(),
                    source,
                });
                return report;
            }
        };

        if let Some(live) = live.as_ref().filter(|_| self.warn_extra_columns) {
            report.extra_columns = live
                .column_names()
                .filter(|name| schema.field(name).is_none())
                .map(str::to_string)
                .collect();
            if !report.extra_columns.is_empty() {
                warn!(
                    table = %table,
                    columns = ?report.extra_columns,
                    "Live table has columns not declared in the schema"
                );
            }
        }

        let statements = match Self::plan(schema, table, live.as_ref()) {
            Ok(statements) => statements,
            Err(source) => {
                report.error = Some(SyncError::Compile {
                    table: table.to_string(),
                    source,
                });
                return report;
            }
        };
        report.created = live.is_none();

        for statement in statements {
            info!(table = %table, ddl = %statement.query(), "Applying schema change");
            if let Err(source) = self.apply(&statement).await {
                report.error = Some(SyncError::Ddl {
                    table: table.to_string(),
                    statement: statement.query().to_string(),
                    source,
                });
                return report;
            }
            report.statements.push(statement.query().to_string());
        }

        report
    }

    async fn describe(&self, table: &str) -> Result<Option<TableMetadata>, DriverError> {
        let span = debug_span!(
            "cql.describe",
            table = %table,
            duration_ms = tracing::field::Empty
        );
        let start = Instant::now();
        let result = self.driver.describe_table(table).instrument(span.clone()).await;
        span.record("duration_ms", start.elapsed().as_millis() as u64);
        result
    }

    async fn apply(&self, statement: &Statement) -> Result<(), DriverError> {
        execute_statement(self.driver.as_ref(), statement).await?;
        Ok(())
    }
}
