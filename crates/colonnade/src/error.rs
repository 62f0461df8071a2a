//! Runtime errors returned by models and contexts.

use crate::driver::DriverError;
use crate::query::QueryError;
use crate::schema::{HookError, SchemaError};
use colonnade_types::TypeError;
use thiserror::Error;

/// A validator rejected a field value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by save, remove, find and batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Hook failed: {0}")]
    Hook(#[from] HookError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Invalid document values: {0}")]
    InvalidValues(String),

    #[error("Field '{0}' is a read-only virtual")]
    ReadOnlyVirtual(String),

    #[error("Field '{field}' is not a {expected}")]
    NotAContainer { field: String, expected: &'static str },

    #[error("No model registered as '{0}'")]
    UnknownModel(String),

    #[error("No custom query named '{0}'")]
    UnknownQuery(String),
}

impl ModelError {
    /// The validation message, when this is a validation failure.
    pub fn validation_message(&self) -> Option<&str> {
        match self {
            ModelError::Validation(err) => Some(&err.message),
            _ => None,
        }
    }
}
