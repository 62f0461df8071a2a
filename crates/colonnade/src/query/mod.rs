//! CQL statement compiler.
//!
//! [`QueryBuilder`] turns schema-level requests (filters, inserts, sparse
//! updates, deletes, DDL) into [`Statement`]s. Every literal goes through
//! [`marshal`] with the declared type of its field, and parameters are pushed
//! in exactly the order their placeholders are written.

mod filter;

pub use filter::{Condition, Filter, FindOptions, Operator, SortOrder};

use crate::schema::Schema;
use crate::statement::{QueryOptions, Statement, StatementKind};
use colonnade_types::{marshal, ColumnType, TypeError, Value, WireValue};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised while compiling a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Cannot bind field '{field}': {source}")]
    Type {
        field: String,
        #[source]
        source: TypeError,
    },

    #[error("Missing value for primary key field '{0}'")]
    MissingKey(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Unknown filter operator '{0}'")]
    UnknownOperator(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Insert into '{0}' has no values")]
    EmptyInsert(String),
}

/// Which columns an insert writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Every declared field; unset fields bind as null
    #[default]
    Full,

    /// Only fields that hold a value
    SetOnly,
}

/// Field values keyed by name.
pub type FieldValues = HashMap<String, Value>;

/// Compiles statements for one table.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    schema: &'a Schema,
    table: &'a str,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(schema: &'a Schema, table: &'a str) -> Self {
        Self { schema, table }
    }

    pub fn table(&self) -> &str {
        self.table
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn select(&self, filter: &Filter, find: &FindOptions) -> Result<Statement, QueryError> {
        let columns = match &find.projection {
            Some(fields) if !fields.is_empty() => {
                for field in fields {
                    self.column_type(field)?;
                }
                fields.join(", ")
            }
            _ => "*".to_string(),
        };

        let mut query = format!("SELECT {} FROM {}", columns, self.table);
        let mut params = Vec::new();

        if !filter.is_empty() {
            let mut terms = Vec::with_capacity(filter.conditions().len());
            for condition in filter.conditions() {
                terms.push(self.compile_condition(condition, &mut params)?);
            }
            query.push_str(" WHERE ");
            query.push_str(&terms.join(" AND "));
        }

        if !find.order_by.is_empty() {
            let mut parts = Vec::with_capacity(find.order_by.len());
            for (field, order) in &find.order_by {
                self.column_type(field)?;
                parts.push(format!("{} {}", field, order.as_cql()));
            }
            query.push_str(" ORDER BY ");
            query.push_str(&parts.join(", "));
        }

        if let Some(limit) = find.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        if find.allow_filtering {
            query.push_str(" ALLOW FILTERING");
        }

        Ok(Statement::new(StatementKind::Select, self.table, query, params)
            .with_options(find.query.clone()))
    }

    fn compile_condition(
        &self,
        condition: &Condition,
        params: &mut Vec<WireValue>,
    ) -> Result<String, QueryError> {
        let column_type = self.column_type(&condition.field)?;

        if condition.op == Operator::In {
            let items = condition.value.as_list().ok_or_else(|| {
                QueryError::InvalidFilter(format!("$in on '{}' expects a list", condition.field))
            })?;
            if items.is_empty() {
                return Err(QueryError::InvalidFilter(format!(
                    "$in on '{}' needs at least one value",
                    condition.field
                )));
            }
            let mut placeholders = Vec::with_capacity(items.len());
            for item in items {
                params.push(self.bind(&condition.field, item, column_type)?);
                placeholders.push("?");
            }
            return Ok(format!("{} IN ({})", condition.field, placeholders.join(", ")));
        }

        params.push(self.bind(&condition.field, &condition.value, column_type)?);
        Ok(format!("{} {} ?", condition.field, condition.op.as_cql()))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// `INSERT INTO t (...) VALUES (...) [IF NOT EXISTS] [USING TTL n]`
    pub fn insert(
        &self,
        values: &FieldValues,
        mode: InsertMode,
        options: &QueryOptions,
    ) -> Result<Statement, QueryError> {
        let mut columns = Vec::new();
        let mut params = Vec::new();

        for (name, def) in self.schema.fields().iter() {
            let value = values.get(name);
            if mode == InsertMode::SetOnly && value.is_none() {
                continue;
            }
            let value = value.unwrap_or(&Value::Null);
            params.push(self.bind(name, value, &def.column_type)?);
            columns.push(name);
        }

        if columns.is_empty() {
            return Err(QueryError::EmptyInsert(self.table.to_string()));
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let mut query = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders
        );
        if options.if_not_exists {
            query.push_str(" IF NOT EXISTS");
        }
        if let Some(ttl) = options.ttl {
            query.push_str(&format!(" USING TTL {}", ttl));
        }

        Ok(Statement::new(StatementKind::Insert, self.table, query, params)
            .with_options(options.clone()))
    }

    /// `UPDATE t [USING TTL n] SET ... WHERE <key> = ?`
    ///
    /// Only `modified` non-key fields are written, in modification order. An
    /// empty change set yields [`StatementKind::Noop`].
    pub fn update(
        &self,
        values: &FieldValues,
        modified: &[String],
        options: &QueryOptions,
    ) -> Result<Statement, QueryError> {
        let mut assignments = Vec::new();
        let mut params = Vec::new();

        for name in modified {
            if self.schema.is_key_column(name) {
                continue;
            }
            let Some(def) = self.schema.field(name) else {
                debug!(table = %self.table, field = %name, "Skipping undeclared modified field");
                continue;
            };
            let value = values.get(name).unwrap_or(&Value::Null);
            params.push(self.bind(name, value, &def.column_type)?);
            assignments.push(format!("{} = ?", name));
        }

        if assignments.is_empty() {
            return Ok(Statement::noop(self.table).with_options(options.clone()));
        }

        let where_clause = self.key_clause(values, &mut params)?;

        let mut query = format!("UPDATE {}", self.table);
        if let Some(ttl) = options.ttl {
            query.push_str(&format!(" USING TTL {}", ttl));
        }
        query.push_str(&format!(" SET {} WHERE {}", assignments.join(", "), where_clause));

        Ok(Statement::new(StatementKind::Update, self.table, query, params)
            .with_options(options.clone()))
    }

    /// `DELETE FROM t WHERE <key> = ?`
    pub fn delete(&self, values: &FieldValues, options: &QueryOptions) -> Result<Statement, QueryError> {
        let mut params = Vec::new();
        let where_clause = self.key_clause(values, &mut params)?;
        let query = format!("DELETE FROM {} WHERE {}", self.table, where_clause);
        Ok(Statement::new(StatementKind::Delete, self.table, query, params)
            .with_options(options.clone()))
    }

    /// Equality terms over the flat primary list. Every entry needs a value.
    fn key_clause(
        &self,
        values: &FieldValues,
        params: &mut Vec<WireValue>,
    ) -> Result<String, QueryError> {
        let mut terms = Vec::new();
        for key in self.schema.flat_primary_list() {
            let value = values
                .get(&key)
                .filter(|v| !v.is_null())
                .ok_or_else(|| QueryError::MissingKey(key.clone()))?;
            let column_type = self.column_type(&key)?;
            params.push(self.bind(&key, value, column_type)?);
            terms.push(format!("{} = ?", key));
        }
        Ok(terms.join(" AND "))
    }

    // ========================================================================
    // DDL
    // ========================================================================

    /// `CREATE TABLE IF NOT EXISTS` with every declared field.
    pub fn create_table(&self) -> Statement {
        let mut parts: Vec<String> = self
            .schema
            .fields()
            .iter()
            .map(|(name, def)| format!("{} {}", name, def.column_type))
            .collect();
        parts.push(self.schema.primary().cql_clause());

        let mut query = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            parts.join(", ")
        );
        if let Some(create_options) = self.schema.create_options() {
            query.push_str(" WITH ");
            query.push_str(create_options);
        }
        Statement::new(StatementKind::CreateTable, self.table, query, Vec::new())
    }

    /// `ALTER TABLE t ADD field type`
    pub fn add_column(&self, field: &str) -> Result<Statement, QueryError> {
        let column_type = self.column_type(field)?;
        let query = format!("ALTER TABLE {} ADD {} {}", self.table, field, column_type);
        Ok(Statement::new(StatementKind::AlterTable, self.table, query, Vec::new()))
    }

    /// `CREATE INDEX IF NOT EXISTS t_field_idx ON t (field)`
    pub fn create_index(&self, field: &str) -> Result<Statement, QueryError> {
        self.column_type(field)?;
        let query = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            index_name(self.table, field),
            self.table,
            field
        );
        Ok(Statement::new(StatementKind::CreateIndex, self.table, query, Vec::new()))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn column_type(&self, field: &str) -> Result<&'a ColumnType, QueryError> {
        self.schema
            .column_type(field)
            .ok_or_else(|| QueryError::UnknownField(field.to_string()))
    }

    fn bind(&self, field: &str, value: &Value, column_type: &ColumnType) -> Result<WireValue, QueryError> {
        marshal(value, column_type).map_err(|source| QueryError::Type {
            field: field.to_string(),
            source,
        })
    }
}

/// Name of the secondary index created for `field`.
pub fn index_name(table: &str, field: &str) -> String {
    format!("{}_{}_idx", table, field)
}
