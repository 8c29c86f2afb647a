use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::testing::{Reply, ScriptedInvoker, eval_ok, eval_throws, expression};

fn command() -> WaitCommand {
    WaitCommand::new(&CommandsConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_pure_delay() {
    let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!(true)));
    let result = command().execute(&invoker, json!({"duration_ms": 1500})).await;

    assert!(result.success);
    assert!(result.elapsed >= Duration::from_millis(1500));
    assert_eq!(invoker.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_condition_satisfied_after_polls() {
    let checks = Arc::new(AtomicUsize::new(0));
    let counter = checks.clone();
    let invoker = ScriptedInvoker::new(move |_, params| {
        assert!(expression(params).starts_with("Boolean("));
        eval_ok(json!(counter.fetch_add(1, Ordering::SeqCst) >= 4))
    });

    let result = command()
        .execute(
            &invoker,
            json!({"condition": "document.querySelector('#done')", "window_ms": 2000}),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.payload["checks"], 5);
}

#[tokio::test(start_paused = true)]
async fn test_condition_never_satisfied() {
    let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!(false)));
    let result = command()
        .execute(&invoker, json!({"condition": "false", "window_ms": 300, "interval_ms": 100}))
        .await;

    assert_eq!(result.error_kind(), Some(ErrorKind::WaitTimeout));
    assert_eq!(invoker.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_zero_window_evaluates_once() {
    let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!(false)));
    let started = Instant::now();
    let result = command()
        .execute(&invoker, json!({"condition": "window.ready", "window_ms": 0}))
        .await;

    assert_eq!(result.error_kind(), Some(ErrorKind::WaitTimeout));
    assert_eq!(invoker.call_count(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_zero_window_satisfied() {
    let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!(true)));
    let result = command()
        .execute(&invoker, json!({"condition": "true", "window_ms": 0}))
        .await;
    assert!(result.success);
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn test_negative_window_rejected() {
    let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!(true)));
    let result = command()
        .execute(&invoker, json!({"condition": "true", "window_ms": -1}))
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
    assert_eq!(invoker.call_count(), 0);

    let result = command().execute(&invoker, json!({"duration_ms": -50})).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn test_requires_exactly_one_mode() {
    let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!(true)));
    let neither = command().execute(&invoker, json!({})).await;
    assert_eq!(neither.error_kind(), Some(ErrorKind::InvalidArgument));

    let both = command()
        .execute(&invoker, json!({"duration_ms": 10, "condition": "true"}))
        .await;
    assert_eq!(both.error_kind(), Some(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn test_window_above_maximum_rejected() {
    let config = CommandsConfig {
        wait_max_window_ms: 1_000,
        ..Default::default()
    };
    let invoker = ScriptedInvoker::new(|_, _| eval_ok(json!(true)));
    let result = WaitCommand::new(&config)
        .execute(&invoker, json!({"condition": "true", "window_ms": 5000}))
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
}

#[tokio::test(start_paused = true)]
async fn test_throwing_predicate_counts_as_unsatisfied() {
    let invoker = ScriptedInvoker::new(|_, _| eval_throws("TypeError: Cannot read properties of null"));
    let result = command()
        .execute(&invoker, json!({"condition": "document.querySelector('#x').dataset.ok", "window_ms": 200}))
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::WaitTimeout));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_condition_check_respects_window() {
    let invoker = ScriptedInvoker::new(|_, _| Reply::Hang);
    let interval = Duration::from_millis(CommandsConfig::default().poll_interval_ms);

    let started = Instant::now();
    let result = command()
        .execute(&invoker, json!({"condition": "window.appReady", "window_ms": 1000}))
        .await;

    assert_eq!(result.error_kind(), Some(ErrorKind::WaitTimeout));
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() <= Duration::from_secs(1) + interval);
}
