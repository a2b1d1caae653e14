use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use indexkeeper::{
    cluster::{ClusterConnector, ElasticsearchConnector},
    config::{KeeperConfig, LogLevel},
    jobs::Ticker,
    observability::{init_tracing, metrics::init_metrics},
    retention::{CleanupSettings, start_retention_worker},
    snapshot::{SnapshotSettings, start_snapshot_worker},
};
use tokio_util::sync::CancellationToken;

/// CLI arguments for indexkeeper
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Retention cleanup and snapshot backups for Elasticsearch",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (TOML, or JSON with a .json extension)
    #[arg(
        short,
        long,
        global = true,
        default_value = "/etc/indexkeeper/indexkeeper.toml"
    )]
    config: PathBuf,

    /// Override the cluster URL from the config file
    #[arg(long, global = true)]
    elasticsearch_url: Option<String>,

    /// Override the log level from the config file
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Delete daily indices outside their retention window (default)
    Cleanup,
    /// Take periodic snapshots of the configured indices
    Snapshot,
    /// Validate the configuration, print the rules and exit
    Check,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = load_config(&args);

    match args.command {
        Some(Command::Check) => run_check(&config),
        Some(Command::Snapshot) => {
            let connector = start_runtime(&config);
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));

            let settings = SnapshotSettings::from_config(&config);
            let ticker = match config.snapshot_schedule() {
                Ok(Some(schedule)) => Ticker::with_schedule(schedule, config.timezone, shutdown),
                Ok(None) => Ticker::new(config.snapshot_interval(), shutdown),
                Err(e) => {
                    tracing::error!(error = %e, "Invalid snapshot schedule");
                    std::process::exit(1);
                }
            };
            start_snapshot_worker(connector, settings, ticker).await;
        }
        Some(Command::Cleanup) | None => {
            let connector = start_runtime(&config);
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));

            let settings = match CleanupSettings::from_config(&config) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::error!(error = %e, "Invalid retention rules");
                    std::process::exit(1);
                }
            };
            let ticker = Ticker::new(config.check_interval(), shutdown);
            if let Err(e) = start_retention_worker(connector, settings, ticker).await {
                tracing::error!(error = %e, "Retention worker stopped");
                std::process::exit(1);
            }
        }
    }
}

/// Load the config file and apply command line overrides.
///
/// Runs before logging is set up, so errors go to stderr.
fn load_config(args: &Args) -> KeeperConfig {
    let mut config = match KeeperConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if let Some(url) = &args.elasticsearch_url {
        config.cluster.url = url.clone();
        if let Err(e) = config.cluster.validate() {
            eprintln!("Invalid --elasticsearch-url: {e}");
            std::process::exit(1);
        }
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    config
}

/// Initialize logging and metrics, then build the cluster connector.
fn start_runtime(config: &KeeperConfig) -> Arc<dyn ClusterConnector> {
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = init_metrics(&config.metrics) {
        tracing::error!(error = %e, "Failed to initialize metrics");
        std::process::exit(1);
    }

    match ElasticsearchConnector::new(&config.cluster) {
        Ok(connector) => {
            tracing::info!(url = %connector.base_url(), "Using cluster");
            Arc::new(connector)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build cluster client");
            std::process::exit(1);
        }
    }
}

fn run_check(config: &KeeperConfig) {
    println!("Configuration is valid.");
    println!("Cluster: {}", config.cluster.url);
    println!(
        "Cleanup every {}s{}",
        config.check_interval,
        if config.dry_run { " (dry run)" } else { "" }
    );
    match config.retention_rules() {
        Ok(rules) => {
            for rule in rules {
                println!("  keep {rule}");
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
    match &config.cron {
        Some(expr) => println!("Snapshots on cron '{expr}' ({:?})", config.timezone),
        None => println!("Snapshots every {}s", config.snapshot_interval),
    }
    for entry in &config.snapshot_indices {
        println!(
            "  {} -> {} ({})",
            entry.index,
            entry.repository,
            entry.location()
        );
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping after the current cycle");
    shutdown.cancel();
}
