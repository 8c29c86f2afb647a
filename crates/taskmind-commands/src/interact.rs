//! Page interaction: click and script execution.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::debug;

use taskmind_cdp::{CommandFailure, CommandResult, ErrorKind, Invoker};
use taskmind_config::CommandsConfig;

use crate::command::Command;
use crate::page::{Outcome, evaluate, evaluate_lenient, failure, finish, from_cdp, invalid, js_string, parse_args};
use crate::poll::{Polled, poll_until};
use crate::schema::{CapabilityDescriptor, ValueType};

#[derive(Debug, Deserialize)]
struct ClickArgs {
    selector: String,
    #[serde(default)]
    window_ms: Option<u64>,
}

/// `click`: wait for an element, then click its centre.
pub struct ClickCommand {
    descriptor: CapabilityDescriptor,
    window: Duration,
    interval: Duration,
}

impl ClickCommand {
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("click", "Click the element matching a CSS selector")
                .required("selector", ValueType::String)
                .optional("window_ms", ValueType::Integer)
                .output("selector", ValueType::String)
                .output("x", ValueType::Number)
                .output("y", ValueType::Number),
            window: Duration::from_millis(config.element_poll_window_ms),
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// Centre of the element in viewport coordinates, scrolled into view.
    fn locate_script(selector: &str) -> String {
        format!(
            r#"(() => {{
    const el = document.querySelector({});
    if (!el) return null;
    el.scrollIntoView({{ block: 'center', inline: 'center' }});
    const r = el.getBoundingClientRect();
    if (r.width === 0 && r.height === 0) return null;
    return {{ x: r.left + r.width / 2, y: r.top + r.height / 2 }};
}})()"#,
            js_string(selector)
        )
    }

    async fn dispatch(&self, invoker: &dyn Invoker, kind: &str, x: f64, y: f64) -> Outcome<()> {
        invoker
            .call(
                "Input.dispatchMouseEvent",
                json!({
                    "type": kind,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                }),
                None,
            )
            .await
            .map_err(from_cdp)?;
        Ok(())
    }

    async fn run(&self, invoker: &dyn Invoker, args: ClickArgs) -> Outcome<Value> {
        if args.selector.trim().is_empty() {
            return Err(invalid("selector cannot be empty"));
        }
        let window = args.window_ms.map(Duration::from_millis).unwrap_or(self.window);
        let locate = Self::locate_script(&args.selector);

        let polled = poll_until(window, self.interval, |budget| {
            let locate = &locate;
            async move {
                let point = evaluate_lenient(invoker, locate, budget).await?;
                Ok::<_, CommandFailure>(point.and_then(|p| Some((p["x"].as_f64()?, p["y"].as_f64()?))))
            }
        })
        .await?;

        let (x, y) = match polled {
            Polled::Ready { value, .. } => value,
            Polled::Expired { checks } => {
                return Err(failure(
                    ErrorKind::ElementNotFound,
                    format!(
                        "no visible element matches {} within {:?} ({} checks)",
                        args.selector, window, checks
                    ),
                ));
            }
        };

        self.dispatch(invoker, "mousePressed", x, y).await?;
        self.dispatch(invoker, "mouseReleased", x, y).await?;
        debug!(selector = %args.selector, x, y, "Clicked");

        Ok(json!({"selector": args.selector, "x": x, "y": y}))
    }
}

#[async_trait]
impl Command for ClickCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<ClickArgs>(args) {
            Ok(args) => self.run(invoker, args).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}

#[derive(Debug, Deserialize)]
struct ScriptArgs {
    #[serde(alias = "script")]
    expression: String,
}

/// `script`: evaluate JavaScript in the page and return its value.
pub struct ScriptCommand {
    descriptor: CapabilityDescriptor,
}

impl ScriptCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("script", "Evaluate JavaScript in the page and return the result")
                .required("expression", ValueType::String)
                .output("value", ValueType::Any),
        }
    }
}

impl Default for ScriptCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for ScriptCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<ScriptArgs>(args) {
            Ok(args) if args.expression.trim().is_empty() => Err(invalid("expression cannot be empty")),
            Ok(args) => evaluate(invoker, &args.expression)
                .await
                .map(|value| json!({"value": value})),
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}
