//! Error types for iap-dispatch.

use crate::payment::{Operation, PlatformId};
use std::fmt;
use thiserror::Error;

/// Result type for dispatcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type returned by verification engines.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the dispatcher.
///
/// The first three variants originate in the dispatcher itself. Engine
/// failures are carried through [`Error::Engine`] untouched.
#[derive(Debug, Error)]
pub enum Error {
    /// A required payment, response or transaction id was missing.
    #[error("{0}")]
    Validation(String),

    /// The platform identifier is not present in the registry.
    #[error("Platform {0} not recognized")]
    UnknownPlatform(String),

    /// The resolved engine lacks the requested optional capability.
    #[error("Platform {platform} does not support {operation}")]
    UnsupportedOperation {
        /// Platform whose engine was resolved.
        platform: PlatformId,
        /// Operation that was requested.
        operation: Operation,
    },

    /// Failure reported by the engine itself.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification of an [`Error`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Validation`].
    Validation,
    /// See [`Error::UnknownPlatform`].
    UnknownPlatform,
    /// See [`Error::UnsupportedOperation`].
    UnsupportedOperation,
    /// See [`Error::Engine`].
    Engine,
    /// See [`Error::Config`].
    Config,
    /// See [`Error::Io`].
    Io,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::UnknownPlatform(_) => ErrorKind::UnknownPlatform,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::Engine(_) => ErrorKind::Engine,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true if the dispatcher rejected the call before reaching an engine.
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::UnknownPlatform | ErrorKind::UnsupportedOperation
        )
    }
}

/// Opaque engine-owned error.
///
/// Wraps whatever the engine reported. The dispatcher never inspects or
/// re-classifies it; callers can recover the concrete type with
/// [`EngineError::downcast_ref`].
pub struct EngineError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl EngineError {
    /// Wrap an engine error.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self(error.into())
    }

    /// Error reported by the default body of an optional engine method.
    #[must_use]
    pub fn not_implemented(operation: Operation) -> Self {
        Self::new(format!("{operation} is not implemented by this engine"))
    }

    /// Attempt to view the wrapped error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// Consume the wrapper and return the engine's error.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.0
    }
}

impl fmt::Debug for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}
