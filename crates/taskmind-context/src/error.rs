//! Run context errors.

use thiserror::Error;

/// Run context error types.
///
/// These signal misuse of the context contract and are never retried.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Another context holds the active slot.
    #[error("Context '{active}' is already active; release it before activating '{requested}'")]
    ContextConflict { active: String, requested: String },

    #[error("No active context")]
    NoActiveContext,

    #[error("Context not found: {0}")]
    ContextNotFound(String),

    /// Description yields no usable identifier.
    #[error("Invalid context description: {0:?}")]
    InvalidDescription(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
