//! Recipe errors.

use thiserror::Error;

use taskmind_commands::ValueType;

/// Caller-supplied parameters that do not fit a recipe's input schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("missing required parameter '{0}'")]
    Missing(String),

    #[error("parameter '{name}' expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("unknown parameter '{0}'")]
    Unknown(String),
}

/// Recipe error types. None of these are retried automatically.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// Definition could not be read as a recipe.
    #[error("Malformed recipe {location}: {reason}")]
    Malformed { location: String, reason: String },

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Structural validation failed; nothing was executed.
    #[error("Recipe '{id}' failed validation: {}", failures.join("; "))]
    ValidationFailed { id: String, failures: Vec<String> },

    #[error("Recipe not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecipeError {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            location: location.into(),
            reason: reason.into(),
        }
    }
}
