//! Shared helpers for issuing page-level calls.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::time::Instant;

use taskmind_cdp::{CdpError, CommandFailure, CommandResult, ErrorKind, Invoker};

pub(crate) type Outcome<T> = Result<T, CommandFailure>;

pub(crate) fn failure(kind: ErrorKind, detail: impl Into<String>) -> CommandFailure {
    CommandFailure {
        kind,
        detail: detail.into(),
    }
}

pub(crate) fn invalid(detail: impl Into<String>) -> CommandFailure {
    failure(ErrorKind::InvalidArgument, detail)
}

pub(crate) fn from_cdp(error: CdpError) -> CommandFailure {
    failure(error.kind(), error.to_string())
}

/// Deserialize the argument object; `null` counts as no arguments.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Outcome<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| invalid(format!("Invalid params: {}", e)))
}

/// Fold an outcome into a result timed from `started`.
pub(crate) fn finish(started: Instant, outcome: Outcome<Value>) -> CommandResult {
    let elapsed = started.elapsed();
    match outcome {
        Ok(payload) => CommandResult::ok(payload, elapsed),
        Err(f) => CommandResult::failed(f.kind, f.detail, elapsed),
    }
}

/// JavaScript literal for `value`.
pub(crate) fn js_literal(value: &Value) -> String {
    value.to_string()
}

/// JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Evaluate an expression in the page, awaiting promises and returning by value.
pub(crate) async fn evaluate(invoker: &dyn Invoker, expression: &str) -> Outcome<Value> {
    evaluate_within(invoker, expression, None).await
}

/// [`evaluate`] with an explicit call timeout; `None` uses the session default.
pub(crate) async fn evaluate_within(
    invoker: &dyn Invoker,
    expression: &str,
    timeout: Option<Duration>,
) -> Outcome<Value> {
    let result = invoker
        .call(
            "Runtime.evaluate",
            json!({
                "expression": expression,
                "returnByValue": true,
                "awaitPromise": true,
            }),
            timeout,
        )
        .await
        .map_err(from_cdp)?;

    if let Some(exception) = result.get("exceptionDetails") {
        let text = exception["exception"]["description"]
            .as_str()
            .or_else(|| exception["text"].as_str())
            .unwrap_or("Unknown error");
        return Err(failure(ErrorKind::Script, text));
    }

    Ok(result["result"]["value"].clone())
}

/// Poll-friendly evaluate bounded by `budget`. Errors the page can recover
/// from (a destroyed execution context mid-navigation, a predicate that
/// throws, a check that outlives its budget) read as "not yet"; transport
/// errors still abort.
pub(crate) async fn evaluate_lenient(
    invoker: &dyn Invoker,
    expression: &str,
    budget: Duration,
) -> Outcome<Option<Value>> {
    match evaluate_within(invoker, expression, Some(budget)).await {
        Ok(value) => Ok(Some(value)),
        Err(f) if matches!(f.kind, ErrorKind::Protocol | ErrorKind::Script | ErrorKind::Timeout) => Ok(None),
        Err(f) => Err(f),
    }
}
