//! # iap-dispatch
//!
//! A single, platform-agnostic entry point for verifying in-app purchase
//! receipts and driving subscription lifecycle operations across storefront
//! backends.
//!
//! Callers name a platform and hand over an opaque payment payload. The
//! [`Dispatcher`] resolves the platform's [`VerificationEngine`] through the
//! [`EngineRegistry`], checks that the engine supports the requested
//! operation, invokes it, and normalizes the outcome.
//!
//! ## Operations
//!
//! | Operation | Input | Mandatory on engine |
//! |---|---|---|
//! | `verifyPayment` | platform + payment | yes |
//! | `cancelSubscription` | platform + payment | no |
//! | `acknowledge` | platform + payment | no |
//! | `isCancelled` | previous result | no |
//! | `isExpired` | previous result | no |
//!
//! Every operation is available as an `async fn` and as a callback-style
//! `*_with_completion` entry point. Both report through one completion
//! channel and never complete on the caller's stack.
//!
//! ## Example
//!
//! ```rust,ignore
//! use iap_dispatch::{Dispatcher, EngineRegistry, Payment};
//!
//! let registry = EngineRegistry::builder()
//!     .register("amazon", amazon_engine)
//!     .build();
//! let dispatcher = Dispatcher::new(registry);
//!
//! let payment = Payment::new(serde_json::json!({ "receipt": "abc" }));
//! let result = dispatcher.verify_payment("amazon", Some(&payment)).await?;
//! assert_eq!(result.platform(), Some("amazon"));
//! ```

pub mod config;
pub mod error;
pub mod payment;

pub use config::{DispatchConfig, PlatformConfig};
pub use error::{EngineError, EngineResult, Error, ErrorKind, Result};
pub use payment::{
    complete_with, Capabilities, Dispatcher, EngineRegistry, EngineRegistryBuilder, Operation,
    Payment, PlatformId, RelayEngine, RelayEngineConfig, RelayError, VerificationEngine,
    VerificationResult,
};

/// Version of the iap-dispatch crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
