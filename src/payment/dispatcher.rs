//! Platform-agnostic dispatcher for the five verification operations.
//!
//! This is the core of iap-dispatch: it validates input, resolves the
//! engine, checks its capabilities, invokes it and normalizes the outcome.

use crate::error::{Error, Result};
use crate::payment::completion::complete_with;
use crate::payment::engine::{Operation, VerificationEngine};
use crate::payment::registry::EngineRegistry;
use crate::payment::types::{Payment, PlatformId, VerificationResult};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const NO_PAYMENT: &str = "No payment given";
const NO_RESPONSE: &str = "No response given";
const NO_TRANSACTION_ID: &str = "Response must have a transaction id";
const NO_PLATFORM: &str = "(none)";

/// Engine resolved for a call, together with the platform it was found under.
type Target = (PlatformId, Arc<dyn VerificationEngine>);

/// Routes verification operations to the engine registered for a platform.
///
/// The dispatcher holds nothing but a read-only [`EngineRegistry`], so it
/// is cheap to clone and safe to share across tasks. Calls are independent.
///
/// Each operation comes in two styles:
///
/// * `async fn` (deferred style): the returned future settles exactly once.
/// * `*_with_completion` (callback style): the completion is invoked exactly
///   once from a spawned task, never on the caller's stack.
///
/// Both styles produce the same classification and result shape.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    registry: EngineRegistry,
}

impl Dispatcher {
    /// Create a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: EngineRegistry) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher routes through.
    #[must_use]
    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Verify a purchase receipt on `platform`.
    ///
    /// On success the result's `platform` field is set to `platform`,
    /// whatever the engine reported.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if no payment is given
    /// * [`Error::UnknownPlatform`] if `platform` is not registered
    /// * [`Error::Engine`] if the engine reports a failure
    pub async fn verify_payment(
        &self,
        platform: &str,
        payment: Option<&Payment>,
    ) -> Result<VerificationResult> {
        let (payment, (platform, engine)) =
            match self.preflight_payment(Operation::VerifyPayment, platform, payment) {
                Ok(target) => target,
                Err(e) => return reject(Operation::VerifyPayment, e).await,
            };

        let mut result = engine
            .verify_payment(payment)
            .await
            .map_err(|e| engine_failure(Operation::VerifyPayment, &platform, e.into()))?;

        result.stamp(&platform);
        debug!("verifyPayment succeeded on {}", platform);
        Ok(result)
    }

    /// Cancel the subscription behind `payment` on `platform`.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if no payment is given
    /// * [`Error::UnknownPlatform`] if `platform` is not registered
    /// * [`Error::UnsupportedOperation`] if the engine cannot cancel
    /// * [`Error::Engine`] if the engine reports a failure
    pub async fn cancel_subscription(
        &self,
        platform: &str,
        payment: Option<&Payment>,
    ) -> Result<Value> {
        let op = Operation::CancelSubscription;
        let (payment, (platform, engine)) = match self.preflight_payment(op, platform, payment) {
            Ok(target) => target,
            Err(e) => return reject(op, e).await,
        };

        let result = engine
            .cancel_subscription(payment)
            .await
            .map_err(|e| engine_failure(op, &platform, e.into()))?;
        debug!("{} succeeded on {}", op, platform);
        Ok(result)
    }

    /// Acknowledge the purchase behind `payment` on `platform`.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if no payment is given
    /// * [`Error::UnknownPlatform`] if `platform` is not registered
    /// * [`Error::UnsupportedOperation`] if the engine cannot acknowledge
    /// * [`Error::Engine`] if the engine reports a failure
    pub async fn acknowledge(&self, platform: &str, payment: Option<&Payment>) -> Result<Value> {
        let op = Operation::Acknowledge;
        let (payment, (platform, engine)) = match self.preflight_payment(op, platform, payment) {
            Ok(target) => target,
            Err(e) => return reject(op, e).await,
        };

        let result = engine
            .acknowledge(payment)
            .await
            .map_err(|e| engine_failure(op, &platform, e.into()))?;
        debug!("{} succeeded on {}", op, platform);
        Ok(result)
    }

    /// Check whether the purchase behind a previous verification was cancelled.
    ///
    /// The platform is read from `response.platform`.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if no response or transaction id is given
    /// * [`Error::UnknownPlatform`] if the response's platform is not registered
    /// * [`Error::UnsupportedOperation`] if the engine cannot answer
    /// * [`Error::Engine`] if the engine reports a failure
    pub async fn is_cancelled(&self, response: Option<&VerificationResult>) -> Result<Value> {
        let op = Operation::IsCancelled;
        let (response, (platform, engine)) = match self.preflight_response(op, response) {
            Ok(target) => target,
            Err(e) => return reject(op, e).await,
        };

        let result = engine
            .is_cancelled(response)
            .await
            .map_err(|e| engine_failure(op, &platform, e.into()))?;
        debug!("{} succeeded on {}", op, platform);
        Ok(result)
    }

    /// Check whether the subscription behind a previous verification has expired.
    ///
    /// The platform is read from `response.platform`.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if no response or transaction id is given
    /// * [`Error::UnknownPlatform`] if the response's platform is not registered
    /// * [`Error::UnsupportedOperation`] if the engine cannot answer
    /// * [`Error::Engine`] if the engine reports a failure
    pub async fn is_expired(&self, response: Option<&VerificationResult>) -> Result<Value> {
        let op = Operation::IsExpired;
        let (response, (platform, engine)) = match self.preflight_response(op, response) {
            Ok(target) => target,
            Err(e) => return reject(op, e).await,
        };

        let result = engine
            .is_expired(response)
            .await
            .map_err(|e| engine_failure(op, &platform, e.into()))?;
        debug!("{} succeeded on {}", op, platform);
        Ok(result)
    }

    /// Callback-style [`verify_payment`](Self::verify_payment).
    pub fn verify_payment_with_completion<F>(
        &self,
        platform: impl Into<String>,
        payment: Option<Payment>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<VerificationResult>) + Send + 'static,
    {
        let this = self.clone();
        let platform = platform.into();
        complete_with(
            async move { this.verify_payment(&platform, payment.as_ref()).await },
            completion,
        )
    }

    /// Callback-style [`cancel_subscription`](Self::cancel_subscription).
    pub fn cancel_subscription_with_completion<F>(
        &self,
        platform: impl Into<String>,
        payment: Option<Payment>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let this = self.clone();
        let platform = platform.into();
        complete_with(
            async move { this.cancel_subscription(&platform, payment.as_ref()).await },
            completion,
        )
    }

    /// Callback-style [`acknowledge`](Self::acknowledge).
    pub fn acknowledge_with_completion<F>(
        &self,
        platform: impl Into<String>,
        payment: Option<Payment>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let this = self.clone();
        let platform = platform.into();
        complete_with(
            async move { this.acknowledge(&platform, payment.as_ref()).await },
            completion,
        )
    }

    /// Callback-style [`is_cancelled`](Self::is_cancelled).
    pub fn is_cancelled_with_completion<F>(
        &self,
        response: Option<VerificationResult>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let this = self.clone();
        complete_with(
            async move { this.is_cancelled(response.as_ref()).await },
            completion,
        )
    }

    /// Callback-style [`is_expired`](Self::is_expired).
    pub fn is_expired_with_completion<F>(
        &self,
        response: Option<VerificationResult>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let this = self.clone();
        complete_with(
            async move { this.is_expired(response.as_ref()).await },
            completion,
        )
    }

    /// Pre-flight for the payment-carrying operations.
    fn preflight_payment<'p>(
        &self,
        op: Operation,
        platform: &str,
        payment: Option<&'p Payment>,
    ) -> Result<(&'p Payment, Target)> {
        let payment = payment
            .filter(|p| p.is_present())
            .ok_or_else(|| Error::Validation(NO_PAYMENT.to_string()))?;
        let target = self.target(op, platform)?;
        Ok((payment, target))
    }

    /// Pre-flight for the operations that re-dispatch a previous result.
    fn preflight_response<'r>(
        &self,
        op: Operation,
        response: Option<&'r VerificationResult>,
    ) -> Result<(&'r VerificationResult, Target)> {
        let response = response.ok_or_else(|| Error::Validation(NO_RESPONSE.to_string()))?;
        if response.transaction_id().is_none() {
            return Err(Error::Validation(NO_TRANSACTION_ID.to_string()));
        }
        let platform = response.platform().unwrap_or(NO_PLATFORM);
        let target = self.target(op, platform)?;
        Ok((response, target))
    }

    /// Resolve the engine for `platform` and check it supports `op`.
    fn target(&self, op: Operation, platform: &str) -> Result<Target> {
        let engine = self
            .registry
            .resolve(platform)
            .ok_or_else(|| Error::UnknownPlatform(platform.to_string()))?;

        let platform = PlatformId::from(platform);
        if !op.is_mandatory() && !engine.capabilities().supports(op) {
            return Err(Error::UnsupportedOperation {
                platform,
                operation: op,
            });
        }

        debug!("Dispatching {} to {}", op, platform);
        Ok((platform, engine))
    }
}

/// Report a pre-flight failure on the next scheduler turn.
async fn reject<T>(op: Operation, error: Error) -> Result<T> {
    warn!("{} rejected: {}", op, error);
    tokio::task::yield_now().await;
    Err(error)
}

fn engine_failure(op: Operation, platform: &PlatformId, error: Error) -> Error {
    debug!("{} failed on {}: {}", op, platform, error);
    error
}
