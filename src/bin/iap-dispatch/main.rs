//! iap-dispatch CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::WrapErr;
use iap_dispatch::{Dispatcher, EngineRegistry, Payment, VerificationResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Initialize tracing; logs go to stderr so stdout stays valid JSON
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("iap-dispatch v{}", iap_dispatch::VERSION);

    let registry = EngineRegistry::from_config(&config)?;
    let dispatcher = Dispatcher::new(registry);

    match cli.command {
        Command::Platforms => {
            for platform in dispatcher.registry().platforms() {
                let capabilities = dispatcher
                    .registry()
                    .resolve(platform.as_str())
                    .map(|engine| engine.capabilities().to_string())
                    .unwrap_or_default();
                println!("{platform}\t{capabilities}");
            }
        }
        Command::Verify(args) => {
            let payment: Payment = read_json(&args.payment)?;
            let result = dispatcher
                .verify_payment(&args.platform, Some(&payment))
                .await?;
            print_json(&result)?;
        }
        Command::Cancel(args) => {
            let payment: Payment = read_json(&args.payment)?;
            let result = dispatcher
                .cancel_subscription(&args.platform, Some(&payment))
                .await?;
            print_json(&result)?;
        }
        Command::Acknowledge(args) => {
            let payment: Payment = read_json(&args.payment)?;
            let result = dispatcher
                .acknowledge(&args.platform, Some(&payment))
                .await?;
            print_json(&result)?;
        }
        Command::IsCancelled(args) => {
            let response: VerificationResult = read_json(&args.response)?;
            let result = dispatcher.is_cancelled(Some(&response)).await?;
            print_json(&result)?;
        }
        Command::IsExpired(args) => {
            let response: VerificationResult = read_json(&args.response)?;
            let result = dispatcher.is_expired(Some(&response)).await?;
            print_json(&result)?;
        }
    }

    Ok(())
}

/// Read a JSON document from `path`, or from stdin when `path` is `-`.
fn read_json<T: DeserializeOwned>(path: &Path) -> color_eyre::Result<T> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).wrap_err("Invalid JSON input")
}

fn print_json<T: Serialize>(value: &T) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
