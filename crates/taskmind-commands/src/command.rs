//! The command module trait.

use async_trait::async_trait;
use serde_json::Value;

use taskmind_cdp::{CommandResult, Invoker};

use crate::schema::CapabilityDescriptor;

/// One verb: a function of (session, arguments) to [`CommandResult`].
///
/// Implementations issue their protocol calls strictly in sequence and never
/// panic or raise on a failed predicate; the failure is in the result.
#[async_trait]
pub trait Command: Send + Sync {
    /// Declared contract of this verb.
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Verb name.
    fn verb(&self) -> &str {
        &self.descriptor().verb
    }

    /// Run against `invoker` with a JSON object of arguments.
    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult;
}
