//! Retention worker driving cleanup cycles on an interval.
//!
//! Each wake re-establishes the cluster handle once and shares it across all
//! rules of that cycle. A failed handshake is treated as an operator problem
//! rather than a transient one: the worker logs it and returns an error
//! without retrying.

use std::sync::Arc;

use super::{RetentionRule, RuleOutcome, run_one_cycle};
use crate::{
    cluster::{ClusterConnector, ClusterError},
    config::{ConfigError, DateBasis, KeeperConfig},
    jobs::Ticker,
    observability::metrics,
};

/// Everything the retention worker needs, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct CleanupSettings {
    pub rules: Vec<RetentionRule>,
    pub dry_run: bool,
    pub date_basis: DateBasis,
}

impl CleanupSettings {
    /// Fails when no `clean_indices` are configured, since the cleanup loop
    /// would have nothing to do.
    pub fn from_config(config: &KeeperConfig) -> Result<Self, ConfigError> {
        let rules = config.retention_rules()?;
        if rules.is_empty() {
            return Err(ConfigError::Validation(
                "cleanup requires at least one clean_indices entry".into(),
            ));
        }
        Ok(Self {
            rules,
            dry_run: config.dry_run,
            date_basis: config.timezone,
        })
    }
}

/// Why the retention worker stopped without a shutdown request.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("Cluster connection failed: {0}")]
    Connection(#[source] ClusterError),
}

/// Runs cleanup cycles until shutdown is requested or the cluster becomes
/// unreachable.
///
/// Returns `Ok(())` on shutdown and `Err` on a connection failure.
pub async fn start_retention_worker(
    connector: Arc<dyn ClusterConnector>,
    settings: CleanupSettings,
    ticker: Ticker,
) -> Result<(), CleanupError> {
    let dry_run_msg = if settings.dry_run { " (DRY RUN)" } else { "" };

    tracing::info!(
        schedule = %ticker,
        rules = settings.rules.len(),
        dry_run = settings.dry_run,
        timezone = ?settings.date_basis,
        "Starting retention worker{}",
        dry_run_msg
    );

    loop {
        if ticker.is_stopped() {
            tracing::info!("Shutdown requested, stopping retention worker");
            return Ok(());
        }

        tracing::info!("Cleanup cycle begin");

        let client = match connector.connect().await {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Can not connect to cluster, stopping retention worker");
                metrics::record_cleanup_failure("*", "connect");
                return Err(CleanupError::Connection(e));
            }
        };

        let info = client.info();
        tracing::info!(
            cluster_name = %info.cluster_name,
            version = %info.version,
            "Connected to cluster"
        );

        let today = settings.date_basis.today();
        match run_one_cycle(&settings.rules, client.as_ref(), today, settings.dry_run).await {
            Ok(report) => {
                let dry_run_count: usize = report
                    .rules
                    .iter()
                    .map(|r| match r.outcome {
                        RuleOutcome::DryRun { count } => count,
                        _ => 0,
                    })
                    .sum();
                tracing::info!(
                    today = %today,
                    rules = report.rules.len(),
                    deleted = report.deleted_total(),
                    would_delete = dry_run_count,
                    failures = report.failures(),
                    "Cleanup cycle end{}",
                    dry_run_msg
                );
                metrics::record_cycle("cleanup", report.failures() == 0);
            }
            Err(e) => {
                tracing::error!(error = %e, "Lost connection to cluster, stopping retention worker");
                metrics::record_cycle("cleanup", false);
                return Err(CleanupError::Connection(e));
            }
        }

        // The handle only lives for one cycle.
        drop(client);

        if !ticker.tick().await {
            tracing::info!("Shutdown requested, stopping retention worker");
            return Ok(());
        }
    }
}
