//! Command-line interface definition.

use clap::{Parser, Subcommand};
use iap_dispatch::config::{default_config_path, DispatchConfig};
use std::path::PathBuf;

/// Verify in-app purchase receipts across storefront platforms.
#[derive(Parser, Debug)]
#[command(name = "iap-dispatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short, env = "IAP_DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (overrides the configuration file).
    #[arg(long, env = "IAP_DISPATCH_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Dispatcher operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered platforms and their capabilities.
    Platforms,

    /// Verify a purchase receipt.
    Verify(PaymentArgs),

    /// Cancel a subscription.
    Cancel(PaymentArgs),

    /// Acknowledge a purchase.
    Acknowledge(PaymentArgs),

    /// Check whether a verified purchase was cancelled.
    IsCancelled(ResponseArgs),

    /// Check whether a verified subscription has expired.
    IsExpired(ResponseArgs),
}

/// Arguments for operations that take a platform and a payment.
#[derive(clap::Args, Debug)]
pub struct PaymentArgs {
    /// Platform identifier.
    #[arg(long, short)]
    pub platform: String,

    /// JSON payment payload file ("-" for stdin).
    #[arg(long, default_value = "-")]
    pub payment: PathBuf,
}

/// Arguments for operations that take a previous verification result.
#[derive(clap::Args, Debug)]
pub struct ResponseArgs {
    /// JSON verification result file ("-" for stdin).
    #[arg(long, default_value = "-")]
    pub response: PathBuf,
}

impl Cli {
    /// Resolve the configuration.
    ///
    /// An explicit `--config` must exist. Without it the default location is
    /// used when present, and an empty configuration otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be loaded.
    pub fn load_config(&self) -> color_eyre::Result<DispatchConfig> {
        let mut config = match self.config {
            Some(ref path) => DispatchConfig::from_file(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    DispatchConfig::from_file(&path)?
                } else {
                    DispatchConfig::default()
                }
            }
        };

        if let Some(ref level) = self.log_level {
            config.log_level.clone_from(level);
        }

        Ok(config)
    }
}
