//! CDP error types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use taskmind_config::ConfigError;

/// Failure classification shared by the session, command modules and
/// recipe traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport-level failure reaching the target.
    Connection,
    /// Proxy rejected the credentials (or demanded some).
    ProxyAuth,
    /// A single protocol call exceeded its deadline.
    Timeout,
    /// The socket dropped while the call was in flight.
    ConnectionLost,
    /// The reconnect budget is spent; the session must be recreated.
    SessionDead,
    /// The target answered with a protocol error or a malformed frame.
    Protocol,
    ElementNotFound,
    NavigationTimeout,
    NavigationFailed,
    WaitTimeout,
    InvalidArgument,
    /// Injected script threw.
    Script,
    UnknownCapability,
}

impl ErrorKind {
    /// Whether retrying the same call without new input can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Connection
                | ErrorKind::Timeout
                | ErrorKind::ConnectionLost
                | ErrorKind::ElementNotFound
                | ErrorKind::NavigationTimeout
                | ErrorKind::WaitTimeout
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::ProxyAuth => "proxy_auth",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionLost => "connection_lost",
            ErrorKind::SessionDead => "session_dead",
            ErrorKind::Protocol => "protocol",
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::NavigationTimeout => "navigation_timeout",
            ErrorKind::NavigationFailed => "navigation_failed",
            ErrorKind::WaitTimeout => "wait_timeout",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Script => "script",
            ErrorKind::UnknownCapability => "unknown_capability",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CDP session errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to reach the target.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Proxy authentication failed.
    #[error("Proxy authentication failed: {0}")]
    ProxyAuth(String),

    /// No debuggable target matched.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol error.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (for target discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    /// A call exceeded its deadline.
    #[error("Request {method} timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    /// The socket dropped while the call was in flight.
    #[error("Connection lost while waiting for {0}")]
    ConnectionLost(String),

    /// Reconnection budget exhausted.
    #[error("Session dead after {attempts} reconnect attempts")]
    SessionDead { attempts: u32 },

    /// Session closed by its owner.
    #[error("Session closed")]
    SessionClosed,

    /// Invalid response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Session configuration rejected.
    #[error("Invalid session configuration: {0}")]
    Config(#[from] ConfigError),
}

impl CdpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CdpError::ConnectionFailed(_)
            | CdpError::TargetNotFound(_)
            | CdpError::WebSocket(_)
            | CdpError::Http(_)
            | CdpError::Config(_) => ErrorKind::Connection,
            CdpError::ProxyAuth(_) => ErrorKind::ProxyAuth,
            CdpError::Protocol { .. }
            | CdpError::Serialization(_)
            | CdpError::InvalidResponse(_) => ErrorKind::Protocol,
            CdpError::Timeout { .. } => ErrorKind::Timeout,
            CdpError::ConnectionLost(_) => ErrorKind::ConnectionLost,
            CdpError::SessionDead { .. } | CdpError::SessionClosed => ErrorKind::SessionDead,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}
