//! Tessera image lifecycle daemon.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::Path;
use tessera_core::config::AppConfig;
use tessera_lifecycle::{ImageLifecycle, spawn_cleanup_scheduler};
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tessera - cached image promotion and deferred deletion
#[derive(Parser, Debug)]
#[command(name = "tesserad")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "TESSERA_CONFIG",
        default_value = "config/tessera.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the cleanup scheduler until interrupted (default)
    Run,
    /// Run the cleanup job once and print its statistics as JSON
    Cleanup,
    /// Scan for orphaned files once and print the statistics as JSON
    Reconcile,
}

/// Load configuration from an optional TOML file merged with `TESSERA_` env vars.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}, using defaults", path);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("TESSERA_").ignore(&["config"]).split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Tessera v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    let dirs = tessera_storage::from_config(&config.storage)
        .await
        .context("failed to initialize image directories")?;
    dirs.health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!("Image directories verified");

    let metadata = tessera_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata health check failed")?;
    tracing::info!("Metadata store initialized");

    let lifecycle = ImageLifecycle::new(metadata, dirs, &config);

    match args.command.unwrap_or(Command::Run) {
        Command::Cleanup => {
            let stats = lifecycle.cleanup.run().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Reconcile => {
            let stats = lifecycle
                .reconciler
                .scan(OffsetDateTime::now_utc())
                .await
                .context("reconciliation failed")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Run => run(lifecycle, &config).await?,
    }

    Ok(())
}

async fn run(lifecycle: ImageLifecycle, config: &AppConfig) -> Result<()> {
    let scheduler = if config.cleanup.auto_schedule_enabled {
        let handle = spawn_cleanup_scheduler(
            lifecycle.cleanup.clone(),
            lifecycle.reconciler.clone(),
            &config.cleanup,
        );
        tracing::info!("Cleanup scheduler spawned");
        Some(handle)
    } else {
        tracing::info!("Automatic cleanup scheduling disabled");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    if let Some(handle) = scheduler {
        handle.abort();
    }
    Ok(())
}
