//! Ephemeral visual overlays: highlight, pointer, spotlight, annotate.
//!
//! Every overlay lives in the page DOM under a fixed id per effect kind, so
//! a repeated call replaces the previous overlay and navigation discards it.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;

use taskmind_cdp::{CommandResult, ErrorKind, Invoker};

use crate::command::Command;
use crate::page::{Outcome, evaluate, failure, finish, invalid, js_literal, parse_args};
use crate::schema::{CapabilityDescriptor, ValueType};

/// Marker attribute carried by every overlay element.
const EFFECT_ATTR: &str = "data-taskmind-effect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Highlight,
    Pointer,
    Spotlight,
    Annotate,
}

impl EffectKind {
    pub fn verb(&self) -> &'static str {
        match self {
            EffectKind::Highlight => "highlight",
            EffectKind::Pointer => "pointer",
            EffectKind::Spotlight => "spotlight",
            EffectKind::Annotate => "annotate",
        }
    }

    /// DOM id of this kind's overlay.
    pub fn overlay_id(&self) -> String {
        format!("taskmind-effect-{}", self.verb())
    }

    fn descriptor(&self) -> CapabilityDescriptor {
        let base = match self {
            EffectKind::Highlight => CapabilityDescriptor::new("highlight", "Outline an element on the page")
                .required("selector", ValueType::String)
                .optional("color", ValueType::String),
            EffectKind::Pointer => CapabilityDescriptor::new("pointer", "Show a pointer dot over an element")
                .required("selector", ValueType::String)
                .optional("color", ValueType::String),
            EffectKind::Spotlight => CapabilityDescriptor::new("spotlight", "Dim everything except one element")
                .required("selector", ValueType::String),
            EffectKind::Annotate => CapabilityDescriptor::new("annotate", "Attach a text label to an element or the page")
                .required("text", ValueType::String)
                .optional("selector", ValueType::String)
                .optional("color", ValueType::String),
        };
        base.optional("duration_ms", ValueType::Integer)
            .output("effect", ValueType::String)
            .output("overlay_id", ValueType::String)
    }

    /// Body building the overlay element `o` from target rect `r` and `args`.
    fn paint(&self) -> &'static str {
        match self {
            EffectKind::Highlight => {
                r#"Object.assign(o.style, { left: r.left + 'px', top: r.top + 'px', width: r.width + 'px', height: r.height + 'px', outline: '3px solid ' + (args.color || '#ff3b30'), borderRadius: '4px' });"#
            }
            EffectKind::Pointer => {
                r#"Object.assign(o.style, { left: (r.left + r.width / 2 - 10) + 'px', top: (r.top + r.height / 2 - 10) + 'px', width: '20px', height: '20px', borderRadius: '50%', background: args.color || 'rgba(255, 59, 48, 0.8)' });"#
            }
            EffectKind::Spotlight => {
                r#"Object.assign(o.style, { left: r.left + 'px', top: r.top + 'px', width: r.width + 'px', height: r.height + 'px', boxShadow: '0 0 0 9999px rgba(0, 0, 0, 0.6)', borderRadius: '6px' });"#
            }
            EffectKind::Annotate => {
                r#"o.textContent = args.text; Object.assign(o.style, { left: (r ? r.left : window.innerWidth - 320) + 'px', top: (r ? Math.max(r.top - 36, 0) : 16) + 'px', maxWidth: '300px', padding: '6px 10px', font: '14px sans-serif', color: '#fff', background: args.color || '#007aff', borderRadius: '6px' });"#
            }
        }
    }

    fn needs_target(&self) -> bool {
        !matches!(self, EffectKind::Annotate)
    }
}

#[derive(Debug, Deserialize)]
struct EffectArgs {
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
}

/// One visual effect verb.
pub struct EffectCommand {
    kind: EffectKind,
    descriptor: CapabilityDescriptor,
}

impl EffectCommand {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            descriptor: kind.descriptor(),
            kind,
        }
    }

    fn script(&self, args: &Value) -> String {
        format!(
            r#"((args) => {{
    const id = {id};
    let r = null;
    if (args.selector) {{
        const el = document.querySelector(args.selector);
        if (!el) return {{ found: false }};
        r = el.getBoundingClientRect();
    }}
    const old = document.getElementById(id);
    if (old) old.remove();
    const o = document.createElement('div');
    o.id = id;
    o.setAttribute('{attr}', {kind});
    Object.assign(o.style, {{ position: 'fixed', pointerEvents: 'none', zIndex: '2147483647' }});
    {paint}
    document.documentElement.appendChild(o);
    if (args.duration_ms) setTimeout(() => o.remove(), args.duration_ms);
    return {{ found: true }};
}})({args})"#,
            id = js_literal(&json!(self.kind.overlay_id())),
            attr = EFFECT_ATTR,
            kind = js_literal(&json!(self.kind.verb())),
            paint = self.kind.paint(),
            args = js_literal(args),
        )
    }

    async fn run(&self, invoker: &dyn Invoker, args: EffectArgs) -> Outcome<Value> {
        let selector = args.selector.filter(|s| !s.trim().is_empty());
        if self.kind.needs_target() && selector.is_none() {
            return Err(invalid(format!("{} needs a selector", self.kind.verb())));
        }
        if self.kind == EffectKind::Annotate && args.text.as_deref().is_none_or(str::is_empty) {
            return Err(invalid("annotate needs text"));
        }

        let script_args = json!({
            "selector": selector,
            "text": args.text,
            "color": args.color,
            "duration_ms": args.duration_ms,
        });
        let applied = evaluate(invoker, &self.script(&script_args)).await?;
        if applied["found"].as_bool() != Some(true) {
            return Err(failure(
                ErrorKind::ElementNotFound,
                format!("no element matches {}", selector.as_deref().unwrap_or_default()),
            ));
        }

        let mut payload = json!({
            "effect": self.kind.verb(),
            "overlay_id": self.kind.overlay_id(),
        });
        if let Some(selector) = selector {
            payload["selector"] = json!(selector);
        }
        Ok(payload)
    }
}

#[async_trait]
impl Command for EffectCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<EffectArgs>(args) {
            Ok(args) => self.run(invoker, args).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}

/// `clear_effects`: remove every overlay.
pub struct ClearEffectsCommand {
    descriptor: CapabilityDescriptor,
}

impl ClearEffectsCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("clear_effects", "Remove all visual effect overlays")
                .output("removed", ValueType::Integer),
        }
    }
}

impl Default for ClearEffectsCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for ClearEffectsCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, _args: Value) -> CommandResult {
        let started = Instant::now();
        let expression = format!(
            "(() => {{ const els = document.querySelectorAll('[{}]'); els.forEach(el => el.remove()); return els.length; }})()",
            EFFECT_ATTR
        );
        let outcome = evaluate(invoker, &expression)
            .await
            .map(|removed| json!({"removed": removed.as_u64().unwrap_or(0)}));
        finish(started, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedInvoker, eval_ok, expression};

    #[tokio::test]
    async fn test_highlight_replaces_existing_overlay() {
        let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!({"found": true})));
        let command = EffectCommand::new(EffectKind::Highlight);

        for _ in 0..2 {
            let result = command.execute(&invoker, json!({"selector": "#buy"})).await;
            assert!(result.success);
            assert_eq!(result.payload["overlay_id"], "taskmind-effect-highlight");
        }

        // Both calls target the same fixed id and remove it before painting.
        for (_, params) in invoker.calls() {
            let script = expression(&params);
            assert!(script.contains("\"taskmind-effect-highlight\""));
            assert!(script.contains("if (old) old.remove();"));
            assert!(!script.contains("addScriptToEvaluateOnNewDocument"));
        }
    }

    #[test]
    fn test_each_kind_has_its_own_overlay() {
        let ids: std::collections::HashSet<String> = [
            EffectKind::Highlight,
            EffectKind::Pointer,
            EffectKind::Spotlight,
            EffectKind::Annotate,
        ]
        .iter()
        .map(|k| k.overlay_id())
        .collect();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_element() {
        let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!({"found": false})));
        let result = EffectCommand::new(EffectKind::Spotlight)
            .execute(&invoker, json!({"selector": "#gone"}))
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ElementNotFound));
    }

    #[test]
    fn test_existing_overlay_kept_until_target_resolves() {
        let script = EffectCommand::new(EffectKind::Highlight).script(&json!({"selector": "#gone"}));
        let bail = script.find("return { found: false }").unwrap();
        let removal = script.find("if (old) old.remove();").unwrap();
        assert!(bail < removal);
    }

    #[tokio::test]
    async fn test_selector_required() {
        let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!({"found": true})));
        let result = EffectCommand::new(EffectKind::Pointer).execute(&invoker, json!({})).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
        assert_eq!(invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_annotate_without_selector() {
        let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!({"found": true})));
        let result = EffectCommand::new(EffectKind::Annotate)
            .execute(&invoker, json!({"text": "Step 1: open the menu"}))
            .await;
        assert!(result.success, "{:?}", result.error);
        assert!(expression(&invoker.calls()[0].1).contains("Step 1: open the menu"));

        let missing = EffectCommand::new(EffectKind::Annotate).execute(&invoker, json!({})).await;
        assert_eq!(missing.error_kind(), Some(ErrorKind::InvalidArgument));
    }

    #[tokio::test]
    async fn test_clear_effects() {
        let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!(3)));
        let result = ClearEffectsCommand::new().execute(&invoker, Value::Null).await;
        assert_eq!(result.payload["removed"], 3);
        assert!(expression(&invoker.calls()[0].1).contains(EFFECT_ATTR));
    }
}
