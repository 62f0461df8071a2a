//! Recording driver for tests.

use crate::catalog::Catalog;
use async_trait::async_trait;
use colonnade::{
    BatchSummary, Driver, DriverError, QueryOptions, ResultSet, Statement, TableMetadata,
};
use colonnade_types::WireValue;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// One call to [`Driver::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub query: String,
    pub params: Vec<WireValue>,
    pub options: QueryOptions,
}

#[derive(Default)]
struct MockState {
    executed: Vec<ExecutedStatement>,
    batches: Vec<(Vec<Statement>, QueryOptions)>,
    describes: Vec<String>,
    catalog: Catalog,
    scripted_rows: VecDeque<ResultSet>,
    failures: Vec<(String, DriverError)>,
    describe_failures: HashMap<String, DriverError>,
    batch_failure: Option<DriverError>,
}

/// An in-memory [`Driver`].
///
/// Records every statement and batch, answers selects from a queue of
/// scripted result sets, and applies DDL to a [`Catalog`] so that
/// `describe_table` reflects earlier synchronization.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// New driver behind an `Arc`, ready for [`colonnade::Context::new`].
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------

    /// Pre-existing table.
    pub fn add_table(&self, table: TableMetadata) {
        self.state().catalog.insert(table);
    }

    /// Result for the next select. Selects beyond the queue return no rows.
    pub fn push_rows(&self, rows: ResultSet) {
        self.state().scripted_rows.push_back(rows);
    }

    /// Fail every statement whose text contains `pattern`.
    pub fn fail_when(&self, pattern: impl Into<String>, error: DriverError) {
        self.state().failures.push((pattern.into(), error));
    }

    pub fn fail_describe(&self, table: impl Into<String>, error: DriverError) {
        self.state().describe_failures.insert(table.into(), error);
    }

    /// Reject the next batch.
    pub fn fail_next_batch(&self, error: DriverError) {
        self.state().batch_failure = Some(error);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.state().executed.clone()
    }

    /// Executed query texts in order.
    pub fn queries(&self) -> Vec<String> {
        self.state().executed.iter().map(|s| s.query.clone()).collect()
    }

    /// Executed DDL texts in order.
    pub fn ddl(&self) -> Vec<String> {
        self.queries()
            .into_iter()
            .filter(|q| is_ddl(q))
            .collect()
    }

    pub fn last_executed(&self) -> Option<ExecutedStatement> {
        self.state().executed.last().cloned()
    }

    pub fn batches(&self) -> Vec<(Vec<Statement>, QueryOptions)> {
        self.state().batches.clone()
    }

    /// Tables passed to `describe_table`, in order.
    pub fn describes(&self) -> Vec<String> {
        self.state().describes.clone()
    }

    pub fn table(&self, name: &str) -> Option<TableMetadata> {
        self.state().catalog.get(name).cloned()
    }

    /// Forget recorded calls. The catalog is kept.
    pub fn clear_log(&self) {
        let mut state = self.state();
        state.executed.clear();
        state.batches.clear();
        state.describes.clear();
    }
}

fn is_ddl(query: &str) -> bool {
    let upper = query.trim_start().to_ascii_uppercase();
    ["CREATE TABLE", "ALTER TABLE", "CREATE INDEX"]
        .iter()
        .any(|prefix| upper.starts_with(prefix))
}

#[async_trait]
impl Driver for MockDriver {
    async fn execute(
        &self,
        query: &str,
        params: &[WireValue],
        options: &QueryOptions,
    ) -> Result<ResultSet, DriverError> {
        let mut state = self.state();
        state.executed.push(ExecutedStatement {
            query: query.to_string(),
            params: params.to_vec(),
            options: options.clone(),
        });
        debug!(query = %query, params = params.len(), "mock execute");

        if let Some((_, error)) = state.failures.iter().find(|(p, _)| query.contains(p.as_str())) {
            return Err(error.clone());
        }

        if state.catalog.apply(query)? {
            return Ok(ResultSet::empty());
        }

        if query.trim_start().to_ascii_uppercase().starts_with("SELECT") {
            return Ok(state.scripted_rows.pop_front().unwrap_or_default());
        }
        Ok(ResultSet::empty())
    }

    async fn batch(
        &self,
        statements: &[Statement],
        options: &QueryOptions,
    ) -> Result<BatchSummary, DriverError> {
        let mut state = self.state();
        if let Some(error) = state.batch_failure.take() {
            return Err(error);
        }
        state.batches.push((statements.to_vec(), options.clone()));
        Ok(BatchSummary {
            statements: statements.len(),
        })
    }

    async fn describe_table(&self, table: &str) -> Result<Option<TableMetadata>, DriverError> {
        let mut state = self.state();
        state.describes.push(table.to_string());
        if let Some(error) = state.describe_failures.get(table) {
            return Err(error.clone());
        }
        Ok(state.catalog.get(table).cloned())
    }
}
