//! Waiting: a fixed delay or a polled page condition.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::debug;

use taskmind_cdp::{CommandFailure, CommandResult, ErrorKind, Invoker};
use taskmind_config::CommandsConfig;

use crate::command::Command;
use crate::page::{Outcome, evaluate_lenient, finish, invalid, parse_args};
use crate::poll::{Polled, poll_until};
use crate::schema::{CapabilityDescriptor, ValueType};

#[derive(Debug, Deserialize)]
struct WaitArgs {
    /// Pure delay.
    #[serde(default)]
    duration_ms: Option<i64>,
    /// JavaScript predicate polled until truthy.
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    window_ms: Option<i64>,
    #[serde(default)]
    interval_ms: Option<i64>,
}

/// `wait`: sleep for a duration, or poll a predicate expression.
///
/// A conditional wait with a zero window evaluates its predicate exactly once.
pub struct WaitCommand {
    descriptor: CapabilityDescriptor,
    default_window: Duration,
    max_window: Duration,
    interval: Duration,
}

impl WaitCommand {
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                "wait",
                "Wait for a duration or until a page condition holds",
            )
            .optional("duration_ms", ValueType::Integer)
            .optional("condition", ValueType::String)
            .optional("window_ms", ValueType::Integer)
            .optional("interval_ms", ValueType::Integer)
            .output("waited_ms", ValueType::Integer)
            .output("satisfied", ValueType::Boolean),
            default_window: Duration::from_millis(config.element_poll_window_ms),
            max_window: Duration::from_millis(config.wait_max_window_ms),
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    fn non_negative(name: &str, value: i64) -> Outcome<Duration> {
        u64::try_from(value)
            .map(Duration::from_millis)
            .map_err(|_| invalid(format!("{} cannot be negative (got {})", name, value)))
    }

    async fn run(&self, invoker: &dyn Invoker, args: WaitArgs, started: Instant) -> Outcome<Value> {
        match (args.duration_ms, args.condition) {
            (Some(_), Some(_)) => Err(invalid("give either duration_ms or condition, not both")),
            (None, None) => Err(invalid("wait needs duration_ms or condition")),
            (Some(ms), None) => {
                let delay = Self::non_negative("duration_ms", ms)?;
                if delay > self.max_window {
                    return Err(invalid(format!(
                        "duration {:?} exceeds the maximum of {:?}",
                        delay, self.max_window
                    )));
                }
                tokio::time::sleep(delay).await;
                Ok(json!({
                    "waited_ms": started.elapsed().as_millis() as u64,
                    "satisfied": true,
                }))
            }
            (None, Some(condition)) => {
                if condition.trim().is_empty() {
                    return Err(invalid("condition cannot be empty"));
                }
                let window = match args.window_ms {
                    Some(ms) => Self::non_negative("window_ms", ms)?,
                    None => self.default_window,
                };
                if window > self.max_window {
                    return Err(invalid(format!(
                        "window {:?} exceeds the maximum of {:?}",
                        window, self.max_window
                    )));
                }
                let interval = match args.interval_ms {
                    Some(ms) => Self::non_negative("interval_ms", ms)?,
                    None => self.interval,
                };
                if interval.is_zero() {
                    return Err(invalid("interval_ms must be greater than 0"));
                }

                let predicate = format!("Boolean({})", condition);
                let polled = poll_until(window, interval, |budget| {
                    let predicate = &predicate;
                    async move {
                        let value = evaluate_lenient(invoker, predicate, budget).await?;
                        Ok::<_, CommandFailure>((value.and_then(|v| v.as_bool()) == Some(true)).then_some(()))
                    }
                })
                .await?;

                match polled {
                    Polled::Ready { checks, .. } => {
                        debug!(checks, "Wait condition satisfied");
                        Ok(json!({
                            "waited_ms": started.elapsed().as_millis() as u64,
                            "satisfied": true,
                            "checks": checks,
                        }))
                    }
                    Polled::Expired { checks } => Err(CommandFailure {
                        kind: ErrorKind::WaitTimeout,
                        detail: format!(
                            "condition `{}` not satisfied within {:?} ({} checks)",
                            condition, window, checks
                        ),
                    }),
                }
            }
        }
    }
}

#[async_trait]
impl Command for WaitCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<WaitArgs>(args) {
            Ok(args) => self.run(invoker, args, started).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod tests;
