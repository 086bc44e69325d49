//! Argos registry server binary

use argos_core::{OrchestratorConfig, RegistryConfig, WallClockTime};
use argos_registry::{spawn_sweeper, LocalRegistry};
use argos_server::api::{router, AppState};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Argos registry server CLI
#[derive(Parser, Debug)]
#[command(name = "argos-server")]
#[command(about = "Argos component registry server")]
#[command(version)]
struct Cli {
    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0:7700")]
    bind: String,

    /// Optional YAML configuration file (registry tuning)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let registry_config: RegistryConfig = match &cli.config {
        Some(path) => OrchestratorConfig::from_yaml_file(path)?.registry,
        None => RegistryConfig::default(),
    };

    let time = Arc::new(WallClockTime::new());
    let registry = Arc::new(LocalRegistry::with_time(registry_config, time.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_sweeper(registry.clone(), shutdown_rx);

    let state = AppState::new(registry, time);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!(bind = %cli.bind, "argos registry listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    sweeper.await?;
    Ok(())
}
