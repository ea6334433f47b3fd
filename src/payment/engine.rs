//! Verification engine contract and capability sets.

use crate::error::{EngineError, EngineResult};
use crate::payment::types::{Payment, VerificationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The five operations the dispatcher can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Verify a purchase receipt. Mandatory for every engine.
    VerifyPayment,
    /// Cancel a subscription.
    CancelSubscription,
    /// Check whether a previously verified purchase was cancelled.
    IsCancelled,
    /// Check whether a previously verified subscription has expired.
    IsExpired,
    /// Acknowledge a purchase with the storefront.
    Acknowledge,
}

impl Operation {
    /// All operations, mandatory first.
    pub const ALL: [Self; 5] = [
        Self::VerifyPayment,
        Self::CancelSubscription,
        Self::IsCancelled,
        Self::IsExpired,
        Self::Acknowledge,
    ];

    /// Wire name of the operation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::VerifyPayment => "verifyPayment",
            Self::CancelSubscription => "cancelSubscription",
            Self::IsCancelled => "isCancelled",
            Self::IsExpired => "isExpired",
            Self::Acknowledge => "acknowledge",
        }
    }

    /// Returns true if every engine must implement this operation.
    #[must_use]
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::VerifyPayment)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::VerifyPayment => 1,
            Self::CancelSubscription => 1 << 1,
            Self::IsCancelled => 1 << 2,
            Self::IsExpired => 1 << 3,
            Self::Acknowledge => 1 << 4,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("unknown operation: {s}"))
    }
}

/// Set of operations an engine supports.
///
/// `verifyPayment` is always a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Only the mandatory `verifyPayment` capability.
    #[must_use]
    pub const fn verify_only() -> Self {
        Self(Operation::VerifyPayment.bit())
    }

    /// Every operation.
    #[must_use]
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < Operation::ALL.len() {
            bits |= Operation::ALL[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Add an operation to the set.
    #[must_use]
    pub const fn with(self, operation: Operation) -> Self {
        Self(self.0 | operation.bit())
    }

    /// Returns true if the set contains `operation`.
    #[must_use]
    pub const fn supports(self, operation: Operation) -> bool {
        self.0 & operation.bit() != 0
    }

    /// Iterate over the supported operations in [`Operation::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Operation> {
        Operation::ALL
            .into_iter()
            .filter(move |op| self.supports(*op))
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::verify_only()
    }
}

impl FromIterator<Operation> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        iter.into_iter().fold(Self::verify_only(), Self::with)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Operation::name).collect();
        f.write_str(&names.join(", "))
    }
}

/// A per-platform verification engine.
///
/// Engines own everything storefront-specific: HTTP calls, receipt parsing,
/// signature checks and retries. Each method settles exactly once with
/// either a result or an error.
///
/// Only [`verify_payment`](Self::verify_payment) is mandatory. The optional
/// methods are called only when [`capabilities`](Self::capabilities)
/// advertises them; their default bodies report the operation as not
/// implemented.
///
/// Engines need not set [`VerificationResult::platform`]. The dispatcher
/// overwrites it.
#[async_trait]
pub trait VerificationEngine: Send + Sync {
    /// Operations this engine supports.
    fn capabilities(&self) -> Capabilities {
        Capabilities::verify_only()
    }

    /// Verify a purchase receipt.
    async fn verify_payment(&self, payment: &Payment) -> EngineResult<VerificationResult>;

    /// Cancel the subscription behind `payment`.
    async fn cancel_subscription(&self, _payment: &Payment) -> EngineResult<Value> {
        Err(EngineError::not_implemented(Operation::CancelSubscription))
    }

    /// Check whether the purchase behind `response` was cancelled.
    async fn is_cancelled(&self, _response: &VerificationResult) -> EngineResult<Value> {
        Err(EngineError::not_implemented(Operation::IsCancelled))
    }

    /// Check whether the subscription behind `response` has expired.
    async fn is_expired(&self, _response: &VerificationResult) -> EngineResult<Value> {
        Err(EngineError::not_implemented(Operation::IsExpired))
    }

    /// Acknowledge the purchase behind `payment`.
    async fn acknowledge(&self, _payment: &Payment) -> EngineResult<Value> {
        Err(EngineError::not_implemented(Operation::Acknowledge))
    }
}
