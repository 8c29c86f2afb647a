//! Single round-trip page queries: title, URL, content and status.
//!
//! All of these are idempotent and safe to retry.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;

use taskmind_cdp::{CommandResult, ErrorKind, Invoker};

use crate::command::Command;
use crate::page::{Outcome, evaluate, failure, finish, invalid, js_string, parse_args};
use crate::schema::{CapabilityDescriptor, ValueType};

/// `get_title`: document title.
pub struct GetTitleCommand {
    descriptor: CapabilityDescriptor,
}

impl GetTitleCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("get_title", "Read the page title")
                .output("title", ValueType::String),
        }
    }
}

impl Default for GetTitleCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for GetTitleCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, _args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = evaluate(invoker, "document.title")
            .await
            .map(|title| json!({"title": title.as_str().unwrap_or_default()}));
        finish(started, outcome)
    }
}

/// `get_url`: current location.
pub struct GetUrlCommand {
    descriptor: CapabilityDescriptor,
}

impl GetUrlCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("get_url", "Read the current page URL")
                .output("url", ValueType::String),
        }
    }
}

impl Default for GetUrlCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for GetUrlCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, _args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = evaluate(invoker, "window.location.href")
            .await
            .map(|url| json!({"url": url.as_str().unwrap_or_default()}));
        finish(started, outcome)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ContentFormat {
    #[default]
    Html,
    Text,
}

impl ContentFormat {
    fn as_str(&self) -> &'static str {
        match self {
            ContentFormat::Html => "html",
            ContentFormat::Text => "text",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentArgs {
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    format: ContentFormat,
}

/// `get_content`: HTML or text of the document or one element.
pub struct GetContentCommand {
    descriptor: CapabilityDescriptor,
}

impl GetContentCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                "get_content",
                "Read the HTML or visible text of the page or of one element",
            )
            .optional("selector", ValueType::String)
            .optional("format", ValueType::String)
            .output("content", ValueType::String)
            .output("format", ValueType::String),
        }
    }

    async fn run(&self, invoker: &dyn Invoker, args: ContentArgs) -> Outcome<Value> {
        let target = match &args.selector {
            Some(selector) if selector.trim().is_empty() => {
                return Err(invalid("selector cannot be empty"));
            }
            Some(selector) => format!("document.querySelector({})", js_string(selector)),
            None => "document.documentElement".to_string(),
        };
        let read = match args.format {
            ContentFormat::Html => "el.outerHTML",
            ContentFormat::Text => "el.innerText",
        };
        let expression = format!("(() => {{ const el = {}; return el ? {} : null; }})()", target, read);

        let content = evaluate(invoker, &expression).await?;
        let Some(content) = content.as_str() else {
            return Err(failure(
                ErrorKind::ElementNotFound,
                format!("no element matches {}", args.selector.as_deref().unwrap_or("document")),
            ));
        };

        let mut payload = json!({
            "content": content,
            "format": args.format.as_str(),
        });
        if let Some(selector) = args.selector {
            payload["selector"] = json!(selector);
        }
        Ok(payload)
    }
}

impl Default for GetContentCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for GetContentCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<ContentArgs>(args) {
            Ok(args) => self.run(invoker, args).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}

const STATUS_SCRIPT: &str = r#"(() => ({
    url: window.location.href,
    title: document.title,
    ready_state: document.readyState,
    viewport: { width: window.innerWidth, height: window.innerHeight },
    scroll: { x: window.scrollX, y: window.scrollY }
}))()"#;

/// `status`: URL, title, ready state, viewport and scroll position.
pub struct StatusCommand {
    descriptor: CapabilityDescriptor,
}

impl StatusCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("status", "Report URL, title, load state and viewport of the page")
                .output("url", ValueType::String)
                .output("title", ValueType::String)
                .output("ready_state", ValueType::String)
                .output("viewport", ValueType::Object)
                .output("scroll", ValueType::Object),
        }
    }
}

impl Default for StatusCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for StatusCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, _args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match evaluate(invoker, STATUS_SCRIPT).await {
            Ok(status) if status.is_object() => Ok(status),
            Ok(other) => Err(failure(
                ErrorKind::Protocol,
                format!("unexpected status value: {}", other),
            )),
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}
