//! Scripted [`Invoker`] for module tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use taskmind_cdp::{CdpError, Invoker};

pub(crate) enum Reply {
    Ok(Value),
    Err(CdpError),
    /// Never answers; the call times out after its deadline.
    Hang,
}

type Handler = Box<dyn Fn(&str, &Value) -> Reply + Send + Sync>;

pub(crate) struct ScriptedInvoker {
    handler: Handler,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedInvoker {
    pub(crate) fn new(handler: impl Fn(&str, &Value) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn call(&self, method: &str, params: Value, timeout: Option<Duration>) -> Result<Value, CdpError> {
        self.calls.lock().push((method.to_string(), params.clone()));
        match (self.handler)(method, &params) {
            Reply::Ok(value) => Ok(value),
            Reply::Err(e) => Err(e),
            Reply::Hang => {
                let after = timeout.unwrap_or(Duration::from_secs(30));
                tokio::time::sleep(after).await;
                Err(CdpError::Timeout {
                    method: method.to_string(),
                    after,
                })
            }
        }
    }
}

/// `Runtime.evaluate` response carrying `value`.
pub(crate) fn eval_ok(value: Value) -> Reply {
    Reply::Ok(json!({"result": {"type": "object", "value": value}}))
}

/// `Runtime.evaluate` response for a thrown exception.
pub(crate) fn eval_throws(description: &str) -> Reply {
    Reply::Ok(json!({
        "result": {"type": "object", "subtype": "error"},
        "exceptionDetails": {
            "text": "Uncaught",
            "exception": {"description": description}
        }
    }))
}

/// Expression text of a `Runtime.evaluate` call.
pub(crate) fn expression(params: &Value) -> &str {
    params["expression"].as_str().unwrap_or_default()
}
