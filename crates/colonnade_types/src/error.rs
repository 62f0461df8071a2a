//! Errors raised by type parsing and value marshaling.

use thiserror::Error;

/// Type registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A value cannot be coerced into the declared column type.
    #[error("Type mismatch: cannot convert {value} to {expected}")]
    TypeMismatch { expected: String, value: String },

    /// The type itself is not supported (e.g. a container nested in a container).
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A type name could not be parsed.
    #[error("Invalid type name: '{0}'")]
    InvalidTypeName(String),
}

impl TypeError {
    pub(crate) fn mismatch(expected: impl std::fmt::Display, value: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            value: value.into(),
        }
    }
}
