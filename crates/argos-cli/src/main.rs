//! Argos CLI
//!
//! `argos up` reads the component map, launches everything in dependency
//! order against a running registry, and supervises until interrupted.
//! `argos status` and `argos check` are the read-only companions.
//!
//! Exit codes: 0 when every component launched, 1 when any component failed
//! or the registry was unreachable, 2 for configuration errors (including
//! dependency cycles).

use argos_core::{ComponentRecord, OrchestratorConfig, TimeProvider, WallClockTime};
use argos_orchestrator::{Launcher, OrchestratorError, TokioSpawner};
use argos_registry::{QueryFilter, Registry};
use argos_server::client::HttpRegistryClient;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit code when every component launched and shut down cleanly
const EXIT_SUCCESS: i32 = 0;
/// Exit code when a launch failed or the registry was unreachable
const EXIT_FAILURE: i32 = 1;
/// Exit code for configuration errors, including dependency cycles
const EXIT_CONFIG_ERROR: i32 = 2;

/// Default registry server URL
const DEFAULT_REGISTRY_URL: &str = "http://127.0.0.1:7700";

/// Argos CLI
#[derive(Parser, Debug)]
#[command(name = "argos")]
#[command(about = "Argos component lifecycle orchestrator CLI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Registry server URL
    #[arg(short, long, default_value = DEFAULT_REGISTRY_URL, global = true)]
    registry: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the configured components in dependency order and supervise them
    Up {
        /// YAML configuration file with the component map
        #[arg(short, long, default_value = "argos.yaml")]
        config: String,
    },

    /// Show the components the registry currently tracks
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration and print its launch waves without launching
    Check {
        /// YAML configuration file with the component map
        #[arg(short, long, default_value = "argos.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let code = match cli.command {
        Commands::Up { ref config } => cmd_up(&cli.registry, config).await,
        Commands::Status { json } => cmd_status(&cli.registry, json).await,
        Commands::Check { ref config } => cmd_check(config),
    };

    std::process::exit(code);
}

/// Launch everything, supervise until interrupted, then shut down
async fn cmd_up(registry_url: &str, config_path: &str) -> i32 {
    let config = match OrchestratorConfig::from_yaml_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            return EXIT_CONFIG_ERROR;
        }
    };

    let registry: Arc<dyn Registry> = match HttpRegistryClient::new(registry_url) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("{} {}", "Failed to create registry client:".red().bold(), e);
            return EXIT_FAILURE;
        }
    };

    let launcher = match Launcher::new(
        config,
        registry,
        Arc::new(TokioSpawner),
        Arc::new(WallClockTime::new()),
    ) {
        Ok(launcher) => launcher,
        Err(e @ OrchestratorError::CyclicDependency { .. }) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            return EXIT_CONFIG_ERROR;
        }
        Err(e) => {
            eprintln!("{} {}", "Failed to build launcher:".red().bold(), e);
            return EXIT_FAILURE;
        }
    };

    println!("{}", "Launching components...".dimmed());
    let report = launcher.run().await;

    for id in &report.launched {
        println!("  {} {}", "launched".green(), id);
    }
    for (id, error) in &report.failed {
        println!("  {} {} ({})", "failed".red().bold(), id, error);
    }
    for id in &report.skipped {
        println!("  {} {} (dependency unavailable)", "skipped".yellow(), id);
    }

    if !report.all_launched() {
        // Stop whatever did come up before reporting failure
        launcher.shutdown().await;
        return EXIT_FAILURE;
    }

    println!();
    println!(
        "{} {} components running, press Ctrl-C to stop",
        "Ready:".green().bold(),
        report.launched.len()
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("{} {}", "Failed to wait for shutdown signal:".red(), e);
    }

    println!("{}", "Shutting down...".dimmed());
    launcher.shutdown().await;
    EXIT_SUCCESS
}

/// Show the registry's current view of the component set
async fn cmd_status(registry_url: &str, json_output: bool) -> i32 {
    let client = match HttpRegistryClient::new(registry_url) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{} {}", "Failed to create registry client:".red().bold(), e);
            return EXIT_FAILURE;
        }
    };

    let records = match client.query(&QueryFilter::default()).await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("{} {}", "Failed to reach registry:".red().bold(), e);
            eprintln!("  Registry URL: {}", registry_url);
            return EXIT_FAILURE;
        }
    };

    if json_output {
        match serde_json::to_string_pretty(&records) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                eprintln!("{} {}", "Failed to render JSON:".red().bold(), e);
                return EXIT_FAILURE;
            }
        }
        return EXIT_SUCCESS;
    }

    if records.is_empty() {
        println!("{}", "No components registered.".dimmed());
        return EXIT_SUCCESS;
    }

    let now_ms = WallClockTime::new().now_ms();
    println!();
    println!("{} ({} total)", "Components".bold(), records.len());
    println!("{}", "-".repeat(60));
    for record in &records {
        println!(
            "  {} {} {}",
            record.id.to_string().cyan(),
            format_status(record),
            format!(
                "v{} @ {} (heartbeat {}ms ago, epoch {})",
                record.version,
                record.endpoint,
                record.heartbeat_age_ms(now_ms),
                record.registration_epoch
            )
            .dimmed()
        );
    }
    println!();
    EXIT_SUCCESS
}

fn format_status(record: &ComponentRecord) -> colored::ColoredString {
    let rendered = record.status.to_string();
    match record.status {
        argos_core::ComponentStatus::Healthy => rendered.green(),
        argos_core::ComponentStatus::Registering => rendered.yellow(),
        argos_core::ComponentStatus::Stale => rendered.yellow().bold(),
        argos_core::ComponentStatus::Gone => rendered.red(),
    }
}

/// Validate a configuration and print the launch plan
fn cmd_check(config_path: &str) -> i32 {
    let config = match OrchestratorConfig::from_yaml_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            return EXIT_CONFIG_ERROR;
        }
    };

    let graph = match argos_orchestrator::DependencyGraph::from_components(&config.components) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            return EXIT_CONFIG_ERROR;
        }
    };

    println!(
        "{} {} components in {} waves",
        "OK:".green().bold(),
        graph.len(),
        graph.waves().len()
    );
    for (index, wave) in graph.waves().iter().enumerate() {
        let names: Vec<&str> = wave.iter().map(|id| id.as_str()).collect();
        println!("  wave {}: {}", index + 1, names.join(", "));
    }
    EXIT_SUCCESS
}
