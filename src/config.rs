//! Configuration for iap-dispatch.

use crate::payment::{Capabilities, Operation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Dispatcher configuration.
///
/// ```toml
/// log_level = "info"
///
/// [platforms.google]
/// endpoint = "https://verifier.internal/google"
/// capabilities = ["cancelSubscription", "isCancelled", "isExpired", "acknowledge"]
///
/// [platforms.roku]
/// endpoint = "https://verifier.internal/roku"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Registered platforms, keyed by platform identifier.
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformConfig>,
}

/// Configuration of a single platform's relay engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform's verification service.
    pub endpoint: String,

    /// Optional operations the service supports. `verifyPayment` is implied.
    #[serde(default)]
    pub capabilities: Vec<Operation>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            platforms: BTreeMap::new(),
        }
    }
}

impl PlatformConfig {
    /// Create a platform entry with default timeout and no optional capabilities.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            capabilities: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Capability set advertised by this platform.
    #[must_use]
    pub fn capability_set(&self) -> Capabilities {
        self.capabilities.iter().copied().collect()
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Default location of the configuration file.
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "iap-dispatch")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".iap-dispatch/config.toml"))
}

impl DispatchConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every platform entry.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first platform with an empty identifier,
    /// a non-HTTP endpoint or a zero timeout.
    pub fn validate(&self) -> crate::Result<()> {
        for (platform, entry) in &self.platforms {
            if platform.trim().is_empty() {
                return Err(crate::Error::Config(
                    "platform identifier must not be empty".to_string(),
                ));
            }
            if !(entry.endpoint.starts_with("http://") || entry.endpoint.starts_with("https://")) {
                return Err(crate::Error::Config(format!(
                    "platform {platform}: endpoint must be an http(s) URL, got {:?}",
                    entry.endpoint
                )));
            }
            if entry.timeout_secs == 0 {
                return Err(crate::Error::Config(format!(
                    "platform {platform}: timeout_secs must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}
