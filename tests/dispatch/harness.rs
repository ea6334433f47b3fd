//! In-process storefront engines used by the dispatcher tests.
//!
//! The harness registers four platforms with different capability sets:
//!
//! | Platform | Optional capabilities | Behaviour |
//! |---|---|---|
//! | amazon | acknowledge | verifies with `{valid: true}` |
//! | apple | isExpired | verifies from a background task |
//! | google | all | answers `isCancelled` with `{cancelled: true}` |
//! | roku | none | stamps its own (wrong) platform on results |

use async_trait::async_trait;
use iap_dispatch::{
    Capabilities, Dispatcher, EngineError, EngineRegistry, EngineResult, Operation, Payment,
    VerificationEngine, VerificationResult,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Configurable engine that counts how often it is invoked.
#[derive(Clone)]
pub struct StubEngine {
    capabilities: Capabilities,
    verify_reply: Value,
    reply: Value,
    failure: Option<String>,
    background: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubEngine {
    /// Engine that verifies with `verify_reply` and answers other operations with `reply`.
    pub fn new(capabilities: Capabilities, verify_reply: Value, reply: Value) -> Self {
        Self {
            capabilities,
            verify_reply,
            reply,
            failure: None,
            background: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every call with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Settle from a spawned task rather than inline.
    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }

    /// Sleep before settling.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared invocation counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    async fn settle(&self, reply: Value) -> EngineResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = match self.failure {
            Some(ref message) => Err(message.clone()),
            None => Ok(reply),
        };

        let outcome = if self.background {
            let (tx, rx) = oneshot::channel();
            tokio::spawn(async move {
                let _ = tx.send(outcome);
            });
            rx.await.map_err(EngineError::new)?
        } else {
            outcome
        };

        outcome.map_err(EngineError::new)
    }
}

#[async_trait]
impl VerificationEngine for StubEngine {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn verify_payment(&self, _payment: &Payment) -> EngineResult<VerificationResult> {
        self.settle(self.verify_reply.clone())
            .await
            .map(VerificationResult::from_value)
    }

    async fn cancel_subscription(&self, _payment: &Payment) -> EngineResult<Value> {
        self.settle(self.reply.clone()).await
    }

    async fn is_cancelled(&self, _response: &VerificationResult) -> EngineResult<Value> {
        self.settle(self.reply.clone()).await
    }

    async fn is_expired(&self, _response: &VerificationResult) -> EngineResult<Value> {
        self.settle(self.reply.clone()).await
    }

    async fn acknowledge(&self, _payment: &Payment) -> EngineResult<Value> {
        self.settle(self.reply.clone()).await
    }
}

/// Dispatcher over the four test storefronts, with their call counters.
pub struct StoreHarness {
    pub dispatcher: Dispatcher,
    pub amazon_calls: Arc<AtomicUsize>,
    pub apple_calls: Arc<AtomicUsize>,
    pub google_calls: Arc<AtomicUsize>,
    pub roku_calls: Arc<AtomicUsize>,
}

impl StoreHarness {
    /// Build the standard four-platform harness.
    pub fn setup() -> Self {
        let amazon = StubEngine::new(
            Capabilities::verify_only().with(Operation::Acknowledge),
            json!({ "valid": true }),
            json!({ "acknowledged": true }),
        );
        let apple = StubEngine::new(
            Capabilities::verify_only().with(Operation::IsExpired),
            json!({ "transactionId": "1000000123", "productId": "monthly" }),
            json!({ "expired": false }),
        )
        .in_background();
        let google = StubEngine::new(
            Capabilities::all(),
            json!({ "transactionId": "GPA.1234", "valid": true }),
            json!({ "cancelled": true }),
        );
        let roku = StubEngine::new(
            Capabilities::verify_only(),
            json!({ "platform": "not-roku", "transactionId": "r-1" }),
            Value::Null,
        );

        let amazon_calls = amazon.calls();
        let apple_calls = apple.calls();
        let google_calls = google.calls();
        let roku_calls = roku.calls();

        let registry = EngineRegistry::builder()
            .register("amazon", amazon)
            .register("apple", apple)
            .register("google", google)
            .register("roku", roku)
            .build();

        Self {
            dispatcher: Dispatcher::new(registry),
            amazon_calls,
            apple_calls,
            google_calls,
            roku_calls,
        }
    }

    /// Total engine invocations across all platforms.
    pub fn total_calls(&self) -> usize {
        [
            &self.amazon_calls,
            &self.apple_calls,
            &self.google_calls,
            &self.roku_calls,
        ]
        .iter()
        .map(|calls| calls.load(Ordering::SeqCst))
        .sum()
    }
}

/// A previous verification result routed to `platform`.
pub fn response_for(platform: &str, transaction_id: Value) -> VerificationResult {
    let mut response = VerificationResult::default().with_field("transactionId", transaction_id);
    response.platform = Some(platform.into());
    response
}

/// A non-empty payment payload.
pub fn payment(payload: Value) -> Payment {
    Payment::new(payload)
}
