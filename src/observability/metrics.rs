//! Prometheus metrics for the maintenance jobs.
//!
//! Provides metrics for:
//! - Indices deleted per retention rule
//! - Cleanup and snapshot failures
//! - Cycle outcomes per job
//!
//! Every recorder compiles to a no-op without the `prometheus` feature.

#[cfg(feature = "prometheus")]
use metrics::{counter, gauge};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;

/// Install the Prometheus recorder and its scrape listener.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(MetricsError::Install)?;

    tracing::info!(listen_addr = %config.listen_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(_config: &MetricsConfig) -> Result<(), MetricsError> {
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record indices deleted by a retention rule.
///
/// # Arguments
/// * `index_prefix` - The rule's index prefix (e.g., "logs")
/// * `count` - The number of indices the cluster acknowledged deleting
pub fn record_index_deletions(index_prefix: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "index_retention_deletions_total",
            "index_prefix" => index_prefix.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (index_prefix, count);
    }
}

/// Record a cleanup failure.
///
/// # Arguments
/// * `index_prefix` - The rule's index prefix, or "*" when no rule was reached
/// * `stage` - Where it failed ("connect", "list", "delete")
pub fn record_cleanup_failure(index_prefix: &str, stage: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "index_retention_errors_total",
            "index_prefix" => index_prefix.to_string(),
            "stage" => stage.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (index_prefix, stage);
    }
}

/// Record one snapshot rule's result.
///
/// # Arguments
/// * `repository` - The snapshot repository name
/// * `status` - "created", "skipped" or "failed"
pub fn record_snapshot(repository: &str, status: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "snapshots_total",
            "repository" => repository.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (repository, status);
    }
}

/// Record a finished cycle of a worker.
///
/// Also sets `last_cycle_success` so a stalled or failing job can be alerted on.
pub fn record_cycle(job: &str, success: bool) {
    #[cfg(feature = "prometheus")]
    {
        let status = if success { "success" } else { "failure" };
        counter!(
            "maintenance_cycles_total",
            "job" => job.to_string(),
            "status" => status
        )
        .increment(1);
        gauge!("maintenance_last_cycle_success", "job" => job.to_string())
            .set(if success { 1.0 } else { 0.0 });
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (job, success);
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
