//! Audit errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse inventory {location}: {reason}")]
    Parse { location: String, reason: String },

    #[error("Capability '{0}' is listed more than once")]
    DuplicateCapability(String),
}
