//! HTTP relay engine.
//!
//! Forwards each operation to a per-platform verification service as
//! `POST {endpoint}/{operation}` with the payment (or previous result) as the
//! JSON body. This lets a deployment register storefront engines that run
//! out of process.

use crate::config::PlatformConfig;
use crate::error::{EngineError, EngineResult, Error, Result};
use crate::payment::engine::{Capabilities, Operation, VerificationEngine};
use crate::payment::types::{Payment, VerificationResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for a [`RelayEngine`].
#[derive(Debug, Clone)]
pub struct RelayEngineConfig {
    /// Base URL of the verification service.
    pub endpoint: String,
    /// Operations the service supports.
    pub capabilities: Capabilities,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RelayEngineConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            capabilities: Capabilities::verify_only(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Failure reported by a relay service.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The service answered with a non-success status.
    #[error("{operation} rejected with HTTP {status}: {body}")]
    Status {
        /// Operation that was relayed.
        operation: Operation,
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The request could not be completed.
    #[error("{operation} relay failed: {source}")]
    Transport {
        /// Operation that was relayed.
        operation: Operation,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
}

/// Verification engine backed by a remote HTTP service.
#[derive(Debug, Clone)]
pub struct RelayEngine {
    client: reqwest::Client,
    endpoint: String,
    capabilities: Capabilities,
}

impl RelayEngine {
    /// Create a relay engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: RelayEngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            capabilities: config.capabilities,
        })
    }

    /// Create a relay engine from a platform's configuration entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &PlatformConfig) -> Result<Self> {
        Self::new(RelayEngineConfig {
            endpoint: config.endpoint.clone(),
            capabilities: config.capability_set(),
            timeout: config.timeout(),
        })
    }

    /// URL an operation is relayed to.
    #[must_use]
    pub fn url_for(&self, operation: Operation) -> String {
        format!("{}/{}", self.endpoint, operation.name())
    }

    async fn relay<B>(&self, operation: Operation, body: &B) -> EngineResult<Value>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url_for(operation);
        debug!("Relaying {} to {}", operation, url);

        let transport = |source| EngineError::new(RelayError::Transport { operation, source });

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read {} error body from {}: {}", operation, url, e);
                    format!("<unreadable body: {e}>")
                }
            };
            warn!("{} relay to {} returned {}", operation, url, status);
            return Err(EngineError::new(RelayError::Status {
                operation,
                status: status.as_u16(),
                body,
            }));
        }

        response.json::<Value>().await.map_err(transport)
    }
}

#[async_trait]
impl VerificationEngine for RelayEngine {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn verify_payment(&self, payment: &Payment) -> EngineResult<VerificationResult> {
        self.relay(Operation::VerifyPayment, payment)
            .await
            .map(VerificationResult::from_value)
    }

    async fn cancel_subscription(&self, payment: &Payment) -> EngineResult<Value> {
        self.relay(Operation::CancelSubscription, payment).await
    }

    async fn is_cancelled(&self, response: &VerificationResult) -> EngineResult<Value> {
        self.relay(Operation::IsCancelled, response).await
    }

    async fn is_expired(&self, response: &VerificationResult) -> EngineResult<Value> {
        self.relay(Operation::IsExpired, response).await
    }

    async fn acknowledge(&self, payment: &Payment) -> EngineResult<Value> {
        self.relay(Operation::Acknowledge, payment).await
    }
}
