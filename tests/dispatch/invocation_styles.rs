//! Callback style versus deferred style.

use super::harness::{payment, response_for, StoreHarness, StubEngine};
use futures::future::join_all;
use iap_dispatch::{complete_with, Capabilities, Dispatcher, EngineRegistry, ErrorKind, Result};
use serde_json::{json, Value};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Completion that records whether the caller had already returned.
struct Probe<T> {
    returned: Arc<AtomicBool>,
    rx: oneshot::Receiver<(bool, Result<T>)>,
}

impl<T: Send + 'static> Probe<T> {
    fn new() -> (Self, impl FnOnce(Result<T>) + Send + 'static) {
        let returned = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&returned);
        let (tx, rx) = oneshot::channel();
        let completion = move |outcome: Result<T>| {
            let _ = tx.send((observed.load(Ordering::SeqCst), outcome));
        };
        (Self { returned, rx }, completion)
    }

    /// Mark the call as returned, then wait for its single outcome.
    async fn settle(self) -> Result<T> {
        self.returned.store(true, Ordering::SeqCst);
        let (returned_first, outcome) = self.rx.await.expect("completion must run exactly once");
        assert!(returned_first, "completion ran before the call returned");
        outcome
    }
}

fn same_outcome<T: PartialEq + Debug>(callback: &Result<T>, deferred: &Result<T>) {
    match (callback, deferred) {
        (Ok(a), Ok(b)) => assert_eq!(a, b),
        (Err(a), Err(b)) => {
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.to_string(), b.to_string());
        }
        (a, b) => unreachable!("styles disagree: {a:?} vs {b:?}"),
    }
}

#[tokio::test]
async fn test_validation_error_is_never_synchronous() {
    let harness = StoreHarness::setup();

    let (probe, completion) = Probe::new();
    harness
        .dispatcher
        .verify_payment_with_completion("roku", None, completion);
    let err = probe.settle().await.expect_err("missing payment");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let (probe, completion) = Probe::new();
    harness.dispatcher.is_expired_with_completion(None, completion);
    let err = probe.settle().await.expect_err("missing response");
    assert_eq!(err.to_string(), "No response given");
}

#[tokio::test]
async fn test_unknown_and_unsupported_are_never_synchronous() {
    let harness = StoreHarness::setup();

    let (probe, completion) = Probe::new();
    harness.dispatcher.acknowledge_with_completion(
        "xbox",
        Some(payment(json!({ "token": "t" }))),
        completion,
    );
    let err = probe.settle().await.expect_err("unknown platform");
    assert_eq!(err.kind(), ErrorKind::UnknownPlatform);

    let (probe, completion) = Probe::new();
    harness.dispatcher.cancel_subscription_with_completion(
        "apple",
        Some(payment(json!({ "receipt": "r" }))),
        completion,
    );
    let err = probe.settle().await.expect_err("unsupported operation");
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[tokio::test]
async fn test_styles_agree_for_every_operation() {
    let harness = StoreHarness::setup();
    let dispatcher = &harness.dispatcher;
    let pay = payment(json!({ "receipt": "abc" }));

    // verifyPayment: success and validation failure
    let inputs = [
        ("amazon", Some(pay.clone())),
        ("amazon", None),
        ("xbox", Some(pay.clone())),
    ];
    for (platform, input) in inputs {
        let (probe, completion) = Probe::new();
        dispatcher.verify_payment_with_completion(platform, input.clone(), completion);
        let via_callback = probe.settle().await;
        let via_future = dispatcher.verify_payment(platform, input.as_ref()).await;
        same_outcome(&via_callback, &via_future);
    }

    // cancelSubscription: supported on google, not on amazon
    for platform in ["google", "amazon"] {
        let (probe, completion) = Probe::new();
        dispatcher.cancel_subscription_with_completion(platform, Some(pay.clone()), completion);
        let via_callback = probe.settle().await;
        let via_future = dispatcher.cancel_subscription(platform, Some(&pay)).await;
        same_outcome(&via_callback, &via_future);
    }

    // acknowledge
    for platform in ["amazon", "roku"] {
        let (probe, completion) = Probe::new();
        dispatcher.acknowledge_with_completion(platform, Some(pay.clone()), completion);
        let via_callback = probe.settle().await;
        let via_future = dispatcher.acknowledge(platform, Some(&pay)).await;
        same_outcome(&via_callback, &via_future);
    }

    // isCancelled / isExpired
    for platform in ["google", "apple", "roku"] {
        let response = response_for(platform, json!("t-1"));

        let (probe, completion) = Probe::new();
        dispatcher.is_cancelled_with_completion(Some(response.clone()), completion);
        let via_callback = probe.settle().await;
        let via_future = dispatcher.is_cancelled(Some(&response)).await;
        same_outcome(&via_callback, &via_future);

        let (probe, completion) = Probe::new();
        dispatcher.is_expired_with_completion(Some(response.clone()), completion);
        let via_callback = probe.settle().await;
        let via_future = dispatcher.is_expired(Some(&response)).await;
        same_outcome(&via_callback, &via_future);
    }
}

#[tokio::test]
async fn test_engine_settling_in_background() {
    let harness = StoreHarness::setup();

    // The apple engine settles from a spawned task.
    let (probe, completion) = Probe::new();
    harness.dispatcher.verify_payment_with_completion(
        "apple",
        Some(payment(json!({ "receipt": "base64" }))),
        completion,
    );
    let result = probe.settle().await.expect("apple verifies");
    assert_eq!(result.platform(), Some("apple"));
    assert_eq!(result.get("productId"), Some(&json!("monthly")));
}

#[tokio::test]
async fn test_completion_handle_resolves_after_completion() {
    let harness = StoreHarness::setup();
    let delivered = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&delivered);

    let handle = harness.dispatcher.verify_payment_with_completion(
        "amazon",
        Some(payment(json!({ "receipt": "abc" }))),
        move |outcome| {
            assert!(outcome.is_ok());
            flag.store(true, Ordering::SeqCst);
        },
    );

    handle.await.expect("completion task");
    assert!(delivered.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_generic_adapter_drives_any_operation() {
    let harness = StoreHarness::setup();
    let dispatcher = harness.dispatcher.clone();
    let (tx, rx) = oneshot::channel();

    complete_with(
        async move {
            let response = response_for("google", json!("GPA.1"));
            dispatcher.is_cancelled(Some(&response)).await
        },
        move |outcome: Result<Value>| {
            let _ = tx.send(outcome);
        },
    );

    let outcome = rx.await.expect("completion must run");
    assert_eq!(outcome.expect("google answers"), json!({ "cancelled": true }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_are_independent() {
    let slow = StubEngine::new(Capabilities::verify_only(), json!({ "slow": true }), Value::Null)
        .delayed(Duration::from_millis(50));
    let fast = StubEngine::new(Capabilities::verify_only(), json!({ "fast": true }), Value::Null);
    let slow_calls = slow.calls();

    let dispatcher = Dispatcher::new(
        EngineRegistry::builder()
            .register("slow", slow)
            .register("fast", fast)
            .build(),
    );

    let calls = (0..16).map(|i| {
        let dispatcher = dispatcher.clone();
        let platform = if i % 2 == 0 { "slow" } else { "fast" };
        async move {
            let pay = payment(json!({ "n": i }));
            dispatcher.verify_payment(platform, Some(&pay)).await
        }
    });

    let results = join_all(calls).await;
    for (i, result) in results.into_iter().enumerate() {
        let result = result.expect("every call verifies");
        let expected = if i % 2 == 0 { "slow" } else { "fast" };
        assert_eq!(result.platform(), Some(expected));
        assert_eq!(result.get(expected), Some(&json!(true)));
    }
    assert_eq!(slow_calls.load(Ordering::SeqCst), 8);
}
