//! Receipt verification dispatch.
//!
//! Every operation runs the same straight-line pipeline:
//!
//! ```text
//! caller (platform | response, payload)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Pre-flight checks   │──── missing input ─────► Validation
//! └─────────┬───────────┘
//!           ▼
//! ┌─────────────────────┐
//! │ Registry lookup     │──── not registered ────► UnknownPlatform
//! └─────────┬───────────┘
//!           ▼
//! ┌─────────────────────┐
//! │ Capability check    │──── not supported ─────► UnsupportedOperation
//! └─────────┬───────────┘
//!           ▼
//! ┌─────────────────────┐
//! │ Engine invocation   │──── engine failure ────► Engine (as reported)
//! └─────────┬───────────┘
//!           ▼
//!   stamp platform (verifyPayment only)
//!           │
//!           ▼
//!        result
//! ```
//!
//! Pre-flight rejections are known synchronously but are only reported after
//! yielding to the scheduler once.

mod completion;
mod dispatcher;
mod engine;
mod registry;
mod relay;
mod types;

pub use completion::complete_with;
pub use dispatcher::Dispatcher;
pub use engine::{Capabilities, Operation, VerificationEngine};
pub use registry::{EngineRegistry, EngineRegistryBuilder};
pub use relay::{RelayEngine, RelayEngineConfig, RelayError};
pub use types::{Payment, PlatformId, VerificationResult};
