//! In-memory table catalog driven by the DDL the engine emits.
//!
//! Understands exactly the statement shapes Colonnade generates:
//!
//! - `CREATE TABLE IF NOT EXISTS t (col type, ..., PRIMARY KEY (...)) [WITH ...]`
//! - `ALTER TABLE t ADD col type`
//! - `CREATE INDEX IF NOT EXISTS name ON t (col)`
//!
//! Table and column names fold to lower case, as unquoted identifiers do.

use colonnade::{ColumnMetadata, DriverError, TableMetadata};
use colonnade_types::ColumnType;
use std::collections::BTreeMap;

/// Tables known to a mock driver.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, TableMetadata>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: TableMetadata) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn get(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Apply a DDL statement. Returns `Ok(false)` when `query` is not DDL.
    pub fn apply(&mut self, query: &str) -> Result<bool, DriverError> {
        let trimmed = query.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.starts_with("CREATE TABLE") {
            self.create_table(trimmed)?;
        } else if upper.starts_with("ALTER TABLE") {
            self.alter_table(trimmed)?;
        } else if upper.starts_with("CREATE INDEX") {
            self.create_index(trimmed)?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    fn create_table(&mut self, query: &str) -> Result<(), DriverError> {
        let open = query
            .find('(')
            .ok_or_else(|| syntax(query, "missing column list"))?;
        let close = matching_paren(query, open).ok_or_else(|| syntax(query, "unbalanced parentheses"))?;

        let head: Vec<&str> = query[..open].split_whitespace().collect();
        let name = head
            .last()
            .map(|n| fold(n))
            .ok_or_else(|| syntax(query, "missing table name"))?;
        if self.tables.contains_key(&name) {
            return Ok(());
        }

        let mut table = TableMetadata::new(name.clone());
        for part in split_top_level(&query[open + 1..close]) {
            let part = part.trim();
            if part.to_ascii_uppercase().starts_with("PRIMARY KEY") {
                let (partition, clustering) = parse_primary_key(part)
                    .ok_or_else(|| syntax(query, "malformed PRIMARY KEY clause"))?;
                table.partition_key = partition;
                table.clustering_key = clustering;
                continue;
            }
            table.columns.push(parse_column(part).map_err(|e| syntax(query, &e))?);
        }

        if table.partition_key.is_empty() {
            return Err(syntax(query, "table has no primary key"));
        }
        self.tables.insert(name, table);
        Ok(())
    }

    fn alter_table(&mut self, query: &str) -> Result<(), DriverError> {
        // ALTER TABLE <name> ADD <column> <type>
        let mut words = query.splitn(5, char::is_whitespace).filter(|w| !w.is_empty());
        let (_, _, name, action) = (words.next(), words.next(), words.next(), words.next());
        let name = fold(name.ok_or_else(|| syntax(query, "missing table name"))?);
        if !action.map(|a| a.eq_ignore_ascii_case("ADD")).unwrap_or(false) {
            return Err(syntax(query, "only ADD is supported"));
        }
        let column_def = words.next().ok_or_else(|| syntax(query, "missing column"))?;
        let column = parse_column(column_def).map_err(|e| syntax(query, &e))?;

        let table = self
            .tables
            .get_mut(&name)
            .ok_or_else(|| DriverError::Query(format!("unconfigured table {}", name)))?;
        if table.has_column(&column.name) {
            return Err(DriverError::Query(format!(
                "Invalid column name {} because it conflicts with an existing column",
                column.name
            )));
        }
        table.columns.push(column);
        Ok(())
    }

    fn create_index(&mut self, query: &str) -> Result<(), DriverError> {
        let upper = query.to_ascii_uppercase();
        let on = upper.find(" ON ").ok_or_else(|| syntax(query, "missing ON"))?;
        let target = query[on + 4..].trim();
        let open = target.find('(').ok_or_else(|| syntax(query, "missing column"))?;
        let close = target.rfind(')').ok_or_else(|| syntax(query, "missing column"))?;
        let name = fold(target[..open].trim());
        let column = fold(target[open + 1..close].trim());

        let table = self
            .tables
            .get_mut(&name)
            .ok_or_else(|| DriverError::Query(format!("unconfigured table {}", name)))?;
        if !table.has_column(&column) {
            return Err(DriverError::Query(format!("No column definition found for {}", column)));
        }
        if !table.is_indexed(&column) {
            table.indexed_columns.push(column);
        }
        Ok(())
    }
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn syntax(query: &str, detail: &str) -> DriverError {
    DriverError::Query(format!("syntax error ({}): {}", detail, query))
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in s[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas outside `()` and `<>`.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, ch) in s.char_indices() {
        match ch {
            '(' | '<' => depth += 1,
            ')' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if !s[start..].trim().is_empty() {
        parts.push(&s[start..]);
    }
    parts
}

fn parse_column(def: &str) -> Result<ColumnMetadata, String> {
    let def = def.trim();
    let (name, type_name) = def
        .split_once(char::is_whitespace)
        .ok_or_else(|| format!("column '{}' has no type", def))?;
    let column_type: ColumnType = type_name.trim().parse().map_err(|e| format!("{}", e))?;
    Ok(ColumnMetadata {
        name: fold(name),
        column_type,
    })
}

/// `PRIMARY KEY ((a, b), c)` -> (`[a, b]`, `[c]`)
fn parse_primary_key(clause: &str) -> Option<(Vec<String>, Vec<String>)> {
    let open = clause.find('(')?;
    let close = matching_paren(clause, open)?;
    let parts = split_top_level(&clause[open + 1..close]);
    let (first, rest) = parts.split_first()?;

    let first = first.trim();
    let partition = match first.strip_prefix('(').and_then(|f| f.strip_suffix(')')) {
        Some(group) => group.split(',').map(|c| fold(c.trim())).collect(),
        None => vec![fold(first)],
    };
    let clustering = rest.iter().map(|c| fold(c.trim())).collect();
    Some((partition, clustering))
}
