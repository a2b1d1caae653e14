use std::sync::Arc;

use chrono::Utc;

use super::{SnapshotRule, run_snapshot_cycle};
use crate::{cluster::ClusterConnector, config::KeeperConfig, jobs::Ticker, observability::metrics};

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub rules: Vec<SnapshotRule>,
}

impl SnapshotSettings {
    pub fn from_config(config: &KeeperConfig) -> Self {
        Self {
            rules: config.snapshot_indices.iter().map(SnapshotRule::from).collect(),
        }
    }
}

/// Runs snapshot cycles until shutdown is requested.
///
/// Unlike cleanup, an unreachable cluster only skips the current run. With a
/// cron ticker the first run waits for the first fire time.
pub async fn start_snapshot_worker(
    connector: Arc<dyn ClusterConnector>,
    settings: SnapshotSettings,
    ticker: Ticker,
) {
    if settings.rules.is_empty() {
        tracing::warn!("Snapshot worker started but no snapshot_indices are configured");
        return;
    }

    tracing::info!(
        schedule = %ticker,
        rules = settings.rules.len(),
        "Starting snapshot worker"
    );

    if !ticker.runs_immediately() && !ticker.tick().await {
        tracing::info!("Shutdown requested, stopping snapshot worker");
        return;
    }

    loop {
        if ticker.is_stopped() {
            break;
        }

        match connector.connect().await {
            Ok(client) => {
                let started = Utc::now().timestamp();
                tracing::info!(
                    cluster_name = %client.info().cluster_name,
                    "Snapshot run begin"
                );
                let report = run_snapshot_cycle(&settings.rules, client.as_ref(), started).await;
                tracing::info!(
                    created = report.created(),
                    failures = report.failures(),
                    "Snapshot run end"
                );
                metrics::record_cycle("snapshot", report.failures() == 0);
            }
            Err(e) => {
                tracing::error!(error = %e, "Can not connect to cluster, skipping snapshot run");
                metrics::record_cycle("snapshot", false);
            }
        }

        if !ticker.tick().await {
            break;
        }
    }

    tracing::info!("Shutdown requested, stopping snapshot worker");
}
