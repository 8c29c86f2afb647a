//! Fake browser target for engine tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use taskmind_cdp::{CdpError, Invoker};

type Handler = Box<dyn Fn(&str, &Value) -> Result<Value, CdpError> + Send + Sync>;

/// Answers protocol calls from a closure and records each one.
pub(crate) struct FakePage {
    handler: Handler,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakePage {
    pub(crate) fn new(handler: impl Fn(&str, &Value) -> Result<Value, CdpError> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A loaded page titled `title`; `Page.navigate` always succeeds.
    pub(crate) fn loaded(title: &'static str) -> Self {
        Self::new(move |method, params| match method {
            "Page.navigate" => Ok(json!({"frameId": "F1"})),
            "Runtime.evaluate" => match params["expression"].as_str().unwrap_or_default() {
                "document.readyState" => Ok(evaluated(json!("complete"))),
                "document.title" => Ok(evaluated(json!(title))),
                "throw" => Ok(json!({
                    "result": {"type": "object", "subtype": "error"},
                    "exceptionDetails": {"text": "Uncaught", "exception": {"description": "Error: boom"}}
                })),
                other => Ok(evaluated(json!(format!("evaluated: {}", other)))),
            },
            _ => Ok(json!({})),
        })
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }
}

pub(crate) fn evaluated(value: Value) -> Value {
    json!({"result": {"type": "object", "value": value}})
}

#[async_trait]
impl Invoker for FakePage {
    async fn call(&self, method: &str, params: Value, _timeout: Option<Duration>) -> Result<Value, CdpError> {
        self.calls.lock().push((method.to_string(), params.clone()));
        (self.handler)(method, &params)
    }
}
