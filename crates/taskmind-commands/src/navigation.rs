//! Navigation: navigate, then poll for load completion.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::debug;

use taskmind_cdp::{CommandFailure, CommandResult, ErrorKind, Invoker};
use taskmind_config::CommandsConfig;

use crate::command::Command;
use crate::page::{Outcome, evaluate_lenient, failure, finish, invalid, parse_args};
use crate::poll::{Polled, poll_until};
use crate::schema::{CapabilityDescriptor, ValueType};

/// Which `document.readyState` counts as loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// `complete`: every subresource loaded.
    #[default]
    Load,
    /// `interactive` or later.
    DomContentLoaded,
}

impl WaitUntil {
    fn satisfied_by(&self, ready_state: &str) -> bool {
        match self {
            WaitUntil::Load => ready_state == "complete",
            WaitUntil::DomContentLoaded => matches!(ready_state, "interactive" | "complete"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NavigateArgs {
    url: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    wait_until: WaitUntil,
}

/// `navigate`: load a URL and wait until the page reports it loaded.
pub struct NavigateCommand {
    descriptor: CapabilityDescriptor,
    timeout: Duration,
    interval: Duration,
}

impl NavigateCommand {
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("navigate", "Navigate the page to a URL and wait for it to load")
                .required("url", ValueType::String)
                .optional("timeout_ms", ValueType::Integer)
                .optional("wait_until", ValueType::String)
                .output("url", ValueType::String)
                .output("frame_id", ValueType::String)
                .output("ready_state", ValueType::String),
            timeout: Duration::from_millis(config.navigation_timeout_ms),
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    async fn run(&self, invoker: &dyn Invoker, args: NavigateArgs) -> Outcome<Value> {
        if args.url.trim().is_empty() {
            return Err(invalid("url cannot be empty"));
        }
        let window = args.timeout_ms.map(Duration::from_millis).unwrap_or(self.timeout);
        let deadline = Instant::now() + window;

        let response = match invoker
            .call("Page.navigate", json!({"url": args.url}), Some(window))
            .await
        {
            Ok(response) => response,
            Err(e) if e.kind() == ErrorKind::Timeout => {
                return Err(failure(
                    ErrorKind::NavigationTimeout,
                    format!("navigation to {} did not start within {:?}", args.url, window),
                ));
            }
            Err(e) => return Err(failure(e.kind(), e.to_string())),
        };

        if let Some(error) = response.get("errorText").and_then(Value::as_str) {
            return Err(failure(
                ErrorKind::NavigationFailed,
                format!("navigation to {} failed: {}", args.url, error),
            ));
        }
        let frame_id = response["frameId"].as_str().unwrap_or("main").to_string();

        let remaining = deadline.saturating_duration_since(Instant::now());
        let wait_until = args.wait_until;
        let polled = poll_until(remaining, self.interval, |budget| async move {
            let state = evaluate_lenient(invoker, "document.readyState", budget).await?;
            Ok::<_, CommandFailure>(state
                .and_then(|s| s.as_str().map(str::to_string))
                .filter(|s| wait_until.satisfied_by(s)))
        })
        .await?;

        match polled {
            Polled::Ready { value, checks } => {
                debug!(url = %args.url, checks, "Navigation complete");
                Ok(json!({
                    "url": args.url,
                    "frame_id": frame_id,
                    "ready_state": value,
                }))
            }
            Polled::Expired { checks } => Err(failure(
                ErrorKind::NavigationTimeout,
                format!(
                    "{} did not finish loading within {:?} ({} checks)",
                    args.url, window, checks
                ),
            )),
        }
    }
}

#[async_trait]
impl Command for NavigateCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<NavigateArgs>(args) {
            Ok(args) => self.run(invoker, args).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod tests;
