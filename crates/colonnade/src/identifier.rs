//! CQL identifier guard.
//!
//! Field and table names are interpolated into statement text unquoted, so
//! they must be plain identifiers. Unquoted CQL identifiers are case
//! insensitive and fold to lower case; table names are lower-cased up front.

use std::error::Error;
use std::fmt;

/// Words that cannot be used as unquoted identifiers.
const RESERVED_KEYWORDS: &[&str] = &[
    "ADD", "ALLOW", "ALTER", "AND", "APPLY", "ASC", "AUTHORIZE", "BATCH", "BEGIN", "BY",
    "COLUMNFAMILY", "CREATE", "DELETE", "DESC", "DROP", "FROM", "GRANT", "IF", "IN", "INDEX",
    "INSERT", "INTO", "KEYSPACE", "LIMIT", "MODIFY", "NORECURSIVE", "OF", "ON", "ORDER",
    "PRIMARY", "REVOKE", "SCHEMA", "SELECT", "SET", "TABLE", "TO", "TOKEN", "TRUNCATE",
    "UPDATE", "USE", "USING", "WHERE", "WITH",
];

const MAX_IDENTIFIER_LEN: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierError {
    message: String,
}

impl IdentifierError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for IdentifierError {}

/// Validate that `name` can be used as an unquoted CQL identifier.
pub fn validate_identifier(name: &str) -> Result<(), IdentifierError> {
    if name.is_empty() {
        return Err(IdentifierError::new("Identifier is empty"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::new(format!(
            "Identifier '{}' exceeds {} characters",
            name, MAX_IDENTIFIER_LEN
        )));
    }

    let mut chars = name.chars();
    if !chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false) {
        return Err(IdentifierError::new(format!(
            "Identifier '{}' must start with a letter",
            name
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(IdentifierError::new(format!(
            "Identifier '{}' may only contain letters, digits and underscores",
            name
        )));
    }

    let upper = name.to_ascii_uppercase();
    if RESERVED_KEYWORDS.contains(&upper.as_str()) {
        return Err(IdentifierError::new(format!(
            "Identifier '{}' is a reserved keyword",
            name
        )));
    }

    Ok(())
}

/// Validate a column name. Besides the identifier rules, the name must
/// already be lower case so it matches the folded name the table reports.
pub fn validate_column_identifier(name: &str) -> Result<(), IdentifierError> {
    validate_identifier(name)?;
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(IdentifierError::new(format!(
            "Column name '{}' must be lower case (try '{}')",
            name,
            name.to_ascii_lowercase()
        )));
    }
    Ok(())
}

/// Table name for a model: the model name, lower-cased.
pub fn table_name_for(model_name: &str) -> String {
    model_name.to_ascii_lowercase()
}
