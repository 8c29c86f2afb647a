//! The seam between command modules and the protocol session.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::CdpError;
use crate::result::CommandResult;

/// Something that can issue CDP calls.
///
/// [`Session`](crate::Session) is the production implementation; command
/// module tests substitute scripted fakes.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Send one request and wait for its response.
    ///
    /// `timeout` overrides the session's default call deadline.
    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, CdpError>;

    /// Like [`Invoker::call`], folded into a [`CommandResult`].
    async fn invoke(&self, method: &str, params: Value, timeout: Option<Duration>) -> CommandResult {
        let started = Instant::now();
        let result = self.call(method, params, timeout).await;
        CommandResult::from_call(result, started.elapsed())
    }
}
