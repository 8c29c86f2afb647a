//! Command registry errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Unknown command: {0}")]
    NotFound(String),
}
