//! Uniform result of a protocol call or command module invocation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CdpError, ErrorKind};

/// Failure detail attached to an unsuccessful [`CommandResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

/// Outcome of a call; never mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "elapsed_ms", with = "millis")]
    pub elapsed: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandFailure>,
}

impl CommandResult {
    pub fn ok(payload: Value, elapsed: Duration) -> Self {
        Self {
            success: true,
            payload,
            elapsed,
            error: None,
        }
    }

    pub fn failed(kind: ErrorKind, detail: impl Into<String>, elapsed: Duration) -> Self {
        Self::failed_with_payload(kind, detail, Value::Null, elapsed)
    }

    /// Failure that still carries whatever the module observed.
    pub fn failed_with_payload(
        kind: ErrorKind,
        detail: impl Into<String>,
        payload: Value,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: false,
            payload,
            elapsed,
            error: Some(CommandFailure {
                kind,
                detail: detail.into(),
            }),
        }
    }

    pub fn from_error(error: &CdpError, elapsed: Duration) -> Self {
        Self::failed(error.kind(), error.to_string(), elapsed)
    }

    pub fn from_call(result: Result<Value, CdpError>, elapsed: Duration) -> Self {
        match result {
            Ok(value) => Self::ok(value, elapsed),
            Err(e) => Self::from_error(&e, elapsed),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.detail.as_str())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
