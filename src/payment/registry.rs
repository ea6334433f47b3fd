//! Platform to engine mapping.

use crate::config::DispatchConfig;
use crate::error::Result;
use crate::payment::engine::VerificationEngine;
use crate::payment::relay::RelayEngine;
use crate::payment::types::PlatformId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Read-only registry of verification engines keyed by platform.
///
/// Built once at startup and shared by every call. Cloning is an `Arc` bump.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: Arc<HashMap<PlatformId, Arc<dyn VerificationEngine>>>,
}

impl EngineRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> EngineRegistryBuilder {
        EngineRegistryBuilder::default()
    }

    /// Build a registry with one relay engine per configured platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a relay engine
    /// cannot be constructed.
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder();
        for (platform, platform_config) in &config.platforms {
            let engine = RelayEngine::from_config(platform_config)?;
            builder = builder.register(platform.as_str(), engine);
        }
        let registry = builder.build();
        info!(
            "Engine registry initialized with {} platform(s)",
            registry.len()
        );
        Ok(registry)
    }

    /// Look up the engine for `platform`.
    #[must_use]
    pub fn resolve(&self, platform: &str) -> Option<Arc<dyn VerificationEngine>> {
        self.engines.get(platform).cloned()
    }

    /// Registered platforms in sorted order.
    #[must_use]
    pub fn platforms(&self) -> Vec<&PlatformId> {
        let mut platforms: Vec<_> = self.engines.keys().collect();
        platforms.sort();
        platforms
    }

    /// Number of registered platforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Returns true if no platform is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}

/// Builder for [`EngineRegistry`].
#[derive(Default)]
pub struct EngineRegistryBuilder {
    engines: HashMap<PlatformId, Arc<dyn VerificationEngine>>,
}

impl EngineRegistryBuilder {
    /// Register `engine` under `platform`, replacing any earlier registration.
    #[must_use]
    pub fn register<E>(self, platform: impl Into<PlatformId>, engine: E) -> Self
    where
        E: VerificationEngine + 'static,
    {
        self.register_shared(platform, Arc::new(engine))
    }

    /// Register an already shared engine under `platform`.
    #[must_use]
    pub fn register_shared(
        mut self,
        platform: impl Into<PlatformId>,
        engine: Arc<dyn VerificationEngine>,
    ) -> Self {
        let platform = platform.into();
        debug!(
            "Registering engine for {} ({})",
            platform,
            engine.capabilities()
        );
        self.engines.insert(platform, engine);
        self
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> EngineRegistry {
        EngineRegistry {
            engines: Arc::new(self.engines),
        }
    }
}
