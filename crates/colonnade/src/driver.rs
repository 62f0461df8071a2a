//! Driver collaborator.
//!
//! Transport, pooling, retries and host selection live behind this trait.
//! The engine only ever asks a driver to execute a statement, submit a batch
//! or describe a table.

use crate::statement::{QueryOptions, Statement};
use async_trait::async_trait;
use colonnade_types::{ColumnType, WireValue};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug_span, Instrument};

/// Errors reported by a driver. Passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Batch rejected: {0}")]
    Batch(String),

    #[error("Metadata error: {0}")]
    Metadata(String),
}

/// The three operations the engine needs from a database client.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Execute one parameterized statement.
    async fn execute(
        &self,
        query: &str,
        params: &[WireValue],
        options: &QueryOptions,
    ) -> Result<ResultSet, DriverError>;

    /// Submit statements as one atomic unit.
    async fn batch(
        &self,
        statements: &[Statement],
        options: &QueryOptions,
    ) -> Result<BatchSummary, DriverError>;

    /// Live metadata for `table`, or `None` when it does not exist.
    async fn describe_table(&self, table: &str) -> Result<Option<TableMetadata>, DriverError>;
}

/// Execute `statement` inside a `cql.exec` span. Noop statements never reach
/// the driver.
pub(crate) async fn execute_statement(
    driver: &dyn Driver,
    statement: &Statement,
) -> Result<ResultSet, DriverError> {
    if statement.is_noop() {
        return Ok(ResultSet::empty());
    }
    statement.log_debug();

    let span = debug_span!(
        "cql.exec",
        op = statement.kind().as_str(),
        table = %statement.table(),
        duration_ms = tracing::field::Empty
    );
    let start = Instant::now();
    let result = driver
        .execute(statement.query(), statement.params(), statement.options())
        .instrument(span.clone())
        .await;
    let duration_ms = start.elapsed().as_millis() as u64;
    span.record("duration_ms", duration_ms);
    result
}

// ============================================================================
// Results
// ============================================================================

/// A single result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<WireValue>,
}

impl Row {
    /// Create a new row with column names and values.
    pub fn new(columns: Vec<String>, values: Vec<WireValue>) -> Self {
        Self { columns, values }
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&WireValue> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&WireValue> {
        let index = self.columns.iter().position(|c| c == name)?;
        self.values.get(index)
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Column/value pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WireValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rows returned by [`Driver::execute`]. Empty for writes and DDL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of an accepted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Statements submitted to the driver
    pub statements: usize,
}

// ============================================================================
// Table metadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub name: String,
    pub column_type: ColumnType,
}

/// Live description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
    pub partition_key: Vec<String>,
    pub clustering_key: Vec<String>,
    pub indexed_columns: Vec<String>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Column lookups ignore ASCII case, like unquoted CQL identifiers.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn is_indexed(&self, name: &str) -> bool {
        self.indexed_columns.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
