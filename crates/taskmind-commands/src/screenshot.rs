//! Viewport and full-page screenshots.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::debug;

use taskmind_cdp::{CommandResult, ErrorKind, Invoker};

use crate::command::Command;
use crate::page::{Outcome, evaluate, failure, finish, from_cdp, invalid, parse_args};
use crate::schema::{CapabilityDescriptor, ValueType};

const MEASURE_SCRIPT: &str = r#"(() => {
    const doc = document.documentElement;
    const body = document.body || doc;
    return {
        width: Math.max(doc.scrollWidth, body.scrollWidth, doc.clientWidth),
        height: Math.max(doc.scrollHeight, body.scrollHeight, doc.clientHeight)
    };
})()"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScreenshotArgs {
    #[serde(default)]
    full_page: bool,
    #[serde(default)]
    format: ImageFormat,
    #[serde(default)]
    quality: Option<i64>,
    /// Write the decoded image here instead of returning it inline.
    #[serde(default)]
    path: Option<PathBuf>,
}

/// `screenshot`: capture the viewport, or the whole page.
///
/// Full-page capture measures the document first, then captures with a clip
/// of that size.
pub struct ScreenshotCommand {
    descriptor: CapabilityDescriptor,
}

impl ScreenshotCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("screenshot", "Capture the viewport or the full page as an image")
                .optional("full_page", ValueType::Boolean)
                .optional("format", ValueType::String)
                .optional("quality", ValueType::Integer)
                .optional("path", ValueType::String)
                .output("format", ValueType::String)
                .output("full_page", ValueType::Boolean)
                .output("bytes", ValueType::Integer),
        }
    }

    async fn run(&self, invoker: &dyn Invoker, args: ScreenshotArgs) -> Outcome<Value> {
        let mut params = json!({"format": args.format.as_str()});
        if let Some(quality) = args.quality {
            if !(0..=100).contains(&quality) {
                return Err(invalid(format!("quality {} is outside 0..=100", quality)));
            }
            if args.format == ImageFormat::Png {
                return Err(invalid("quality applies to jpeg and webp only"));
            }
            params["quality"] = json!(quality);
        }

        let mut size = Value::Null;
        if args.full_page {
            let measured = evaluate(invoker, MEASURE_SCRIPT).await?;
            let (Some(width), Some(height)) = (measured["width"].as_f64(), measured["height"].as_f64()) else {
                return Err(failure(
                    ErrorKind::Protocol,
                    format!("could not measure page: {}", measured),
                ));
            };
            params["captureBeyondViewport"] = json!(true);
            params["clip"] = json!({
                "x": 0,
                "y": 0,
                "width": width,
                "height": height,
                "scale": 1,
            });
            size = json!({"width": width, "height": height});
        }

        let response = invoker
            .call("Page.captureScreenshot", params, None)
            .await
            .map_err(from_cdp)?;
        let data = response["data"]
            .as_str()
            .ok_or_else(|| failure(ErrorKind::Protocol, "captureScreenshot returned no data"))?;
        let bytes = BASE64
            .decode(data)
            .map_err(|e| failure(ErrorKind::Protocol, format!("invalid screenshot data: {}", e)))?;

        let mut payload = json!({
            "format": args.format.as_str(),
            "full_page": args.full_page,
            "bytes": bytes.len(),
        });
        if !size.is_null() {
            payload["size"] = size;
        }

        match args.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| invalid(format!("cannot create {}: {}", parent.display(), e)))?;
                }
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| invalid(format!("cannot write {}: {}", path.display(), e)))?;
                debug!(path = %path.display(), bytes = bytes.len(), "Saved screenshot");
                payload["path"] = json!(path.display().to_string());
            }
            None => payload["data"] = json!(data),
        }
        Ok(payload)
    }
}

impl Default for ScreenshotCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for ScreenshotCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<ScreenshotArgs>(args) {
            Ok(args) => self.run(invoker, args).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}
