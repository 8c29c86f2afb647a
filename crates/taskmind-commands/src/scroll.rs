//! Scrolling by amount and to a piece of text.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::debug;

use taskmind_cdp::{CommandFailure, CommandResult, ErrorKind, Invoker};
use taskmind_config::CommandsConfig;

use crate::command::Command;
use crate::page::{Outcome, evaluate, evaluate_lenient, failure, finish, invalid, js_string, parse_args};
use crate::poll::{Polled, poll_until};
use crate::schema::{CapabilityDescriptor, ValueType};

/// Attribute set on the element located by `scroll_to_text`.
const TARGET_ATTR: &str = "data-taskmind-scroll-target";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Deserialize)]
struct ScrollArgs {
    #[serde(default)]
    direction: Direction,
    #[serde(default = "default_amount")]
    amount: i64,
}

fn default_amount() -> i64 {
    500
}

/// `scroll`: scroll the window by a distance or to an edge.
pub struct ScrollCommand {
    descriptor: CapabilityDescriptor,
}

impl ScrollCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("scroll", "Scroll the page by a distance or to the top or bottom")
                .optional("direction", ValueType::String)
                .optional("amount", ValueType::Integer)
                .output("x", ValueType::Number)
                .output("y", ValueType::Number),
        }
    }

    async fn run(&self, invoker: &dyn Invoker, args: ScrollArgs) -> Outcome<Value> {
        if args.amount < 0 {
            return Err(invalid("amount cannot be negative"));
        }
        let step = match args.direction {
            Direction::Up => format!("window.scrollBy(0, -{})", args.amount),
            Direction::Down => format!("window.scrollBy(0, {})", args.amount),
            Direction::Left => format!("window.scrollBy(-{}, 0)", args.amount),
            Direction::Right => format!("window.scrollBy({}, 0)", args.amount),
            Direction::Top => "window.scrollTo(0, 0)".to_string(),
            Direction::Bottom => {
                "window.scrollTo(0, document.documentElement.scrollHeight)".to_string()
            }
        };
        let expression = format!("(() => {{ {}; return {{ x: window.scrollX, y: window.scrollY }}; }})()", step);
        let position = evaluate(invoker, &expression).await?;
        Ok(json!({"x": position["x"], "y": position["y"]}))
    }
}

impl Default for ScrollCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for ScrollCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<ScrollArgs>(args) {
            Ok(args) => self.run(invoker, args).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}

#[derive(Debug, Deserialize)]
struct ScrollToTextArgs {
    text: String,
    #[serde(default)]
    window_ms: Option<u64>,
}

/// `scroll_to_text`: find the innermost element containing some text and
/// scroll it into view.
pub struct ScrollToTextCommand {
    descriptor: CapabilityDescriptor,
    window: Duration,
    interval: Duration,
}

impl ScrollToTextCommand {
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                "scroll_to_text",
                "Scroll until an element containing the given text is in view",
            )
            .required("text", ValueType::String)
            .optional("window_ms", ValueType::Integer)
            .output("text", ValueType::String)
            .output("found", ValueType::Boolean)
            .output("y", ValueType::Number),
            window: Duration::from_millis(config.element_poll_window_ms),
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// Marks the first text node's parent element containing `text` and
    /// reports whether one was found.
    fn locate_script(text: &str) -> String {
        format!(
            r#"(() => {{
    const needle = {needle};
    document.querySelectorAll('[{attr}]').forEach(el => el.removeAttribute('{attr}'));
    const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
    while (walker.nextNode()) {{
        const node = walker.currentNode;
        if (node.textContent && node.textContent.includes(needle) && node.parentElement) {{
            node.parentElement.setAttribute('{attr}', '1');
            return true;
        }}
    }}
    return false;
}})()"#,
            needle = js_string(text),
            attr = TARGET_ATTR,
        )
    }

    fn scroll_script() -> String {
        format!(
            r#"(() => {{
    const el = document.querySelector('[{attr}]');
    if (!el) return null;
    el.scrollIntoView({{ block: 'center', inline: 'nearest' }});
    el.removeAttribute('{attr}');
    return {{ y: window.scrollY }};
}})()"#,
            attr = TARGET_ATTR,
        )
    }

    async fn run(&self, invoker: &dyn Invoker, args: ScrollToTextArgs) -> Outcome<Value> {
        if args.text.is_empty() {
            return Err(invalid("text cannot be empty"));
        }
        let window = args.window_ms.map(Duration::from_millis).unwrap_or(self.window);
        let locate = Self::locate_script(&args.text);

        let polled = poll_until(window, self.interval, |budget| {
            let locate = &locate;
            async move {
                let found = evaluate_lenient(invoker, locate, budget).await?;
                Ok::<_, CommandFailure>(found.filter(|v| v.as_bool() == Some(true)).map(|_| ()))
            }
        })
        .await?;

        match polled {
            Polled::Ready { checks, .. } => {
                debug!(text = %args.text, checks, "Located text");
            }
            Polled::Expired { checks } => {
                return Err(failure(
                    ErrorKind::ElementNotFound,
                    format!(
                        "no element containing {:?} within {:?} ({} checks)",
                        args.text, window, checks
                    ),
                ));
            }
        }

        let scrolled = evaluate(invoker, &Self::scroll_script()).await?;
        if scrolled.is_null() {
            // The page replaced the element between locate and scroll.
            return Err(failure(
                ErrorKind::ElementNotFound,
                format!("element containing {:?} disappeared before scrolling", args.text),
            ));
        }

        Ok(json!({
            "text": args.text,
            "found": true,
            "y": scrolled["y"],
        }))
    }
}

#[async_trait]
impl Command for ScrollToTextCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<ScrollToTextArgs>(args) {
            Ok(args) => self.run(invoker, args).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}
