//! A single cleanup pass over all retention rules.

use chrono::NaiveDate;

use super::{
    DeleteOutcome, DeletionSet, KeptSet, RetentionRule, compute_kept_set, delete_indices, diff,
    join_names,
};
use crate::{
    cluster::{ClusterClient, ClusterError},
    observability::metrics,
};

/// How one rule fared in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Every live index is inside the window.
    Retained,
    /// The cluster acknowledged deletion of `count` indices.
    Deleted { count: usize },
    /// Dry run: `count` indices would have been deleted.
    DryRun { count: usize },
    /// Listing the live indices failed; the rule was skipped.
    ListFailed { error: String },
    /// The bulk delete failed or was not acknowledged.
    DeleteFailed { error: String },
}

impl RuleOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RuleOutcome::ListFailed { .. } | RuleOutcome::DeleteFailed { .. }
        )
    }
}

/// Result of applying one rule.
#[derive(Debug, Clone)]
pub struct RuleReport {
    pub index_prefix: String,
    pub kept: KeptSet,
    /// Empty when listing failed.
    pub deletion: DeletionSet,
    pub outcome: RuleOutcome,
}

/// Results from a single cleanup cycle, one entry per rule in order.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub rules: Vec<RuleReport>,
}

impl CycleReport {
    /// Number of indices deleted across all rules.
    pub fn deleted_total(&self) -> usize {
        self.rules
            .iter()
            .map(|r| match r.outcome {
                RuleOutcome::Deleted { count } => count,
                _ => 0,
            })
            .sum()
    }

    /// Number of rules that failed this cycle.
    pub fn failures(&self) -> usize {
        self.rules.iter().filter(|r| r.outcome.is_failure()).count()
    }

    pub fn has_deletions(&self) -> bool {
        self.deleted_total() > 0
    }
}

/// Apply every rule once, in order, against an already connected cluster.
///
/// Rule failures are contained in the report. The only error returned is a
/// connection failure, which ends the cycle immediately.
pub async fn run_one_cycle(
    rules: &[RetentionRule],
    client: &dyn ClusterClient,
    today: NaiveDate,
    dry_run: bool,
) -> Result<CycleReport, ClusterError> {
    let mut report = CycleReport::default();

    for rule in rules {
        let rule_report = clean_index(rule, client, today, dry_run).await?;
        report.rules.push(rule_report);
    }

    Ok(report)
}

async fn clean_index(
    rule: &RetentionRule,
    client: &dyn ClusterClient,
    today: NaiveDate,
    dry_run: bool,
) -> Result<RuleReport, ClusterError> {
    let prefix = rule.index_prefix();
    let kept = compute_kept_set(prefix, rule.retain_days(), today);

    tracing::info!(
        index_prefix = %prefix,
        retain_days = rule.retain_days().get(),
        reserved = %join_names(kept.iter()),
        "Computed reserved indices"
    );

    let live = match client.list_indices(&rule.list_pattern()).await {
        Ok(live) => live,
        Err(e) if e.is_connection_failure() => return Err(e),
        Err(e) => {
            tracing::error!(
                index_prefix = %prefix,
                error = %e,
                "Failed to list existing indices, skipping rule"
            );
            metrics::record_cleanup_failure(prefix, "list");
            return Ok(RuleReport {
                index_prefix: prefix.to_string(),
                kept,
                deletion: DeletionSet::default(),
                outcome: RuleOutcome::ListFailed {
                    error: e.to_string(),
                },
            });
        }
    };

    let deletion = diff(&live, &kept);

    let outcome = if deletion.is_empty() {
        tracing::debug!(
            index_prefix = %prefix,
            live = live.len(),
            "No indices outside the retention window"
        );
        RuleOutcome::Retained
    } else if dry_run {
        tracing::info!(
            index_prefix = %prefix,
            count = deletion.len(),
            indices = %join_names(deletion.iter()),
            "DRY RUN: Would delete indices"
        );
        RuleOutcome::DryRun {
            count: deletion.len(),
        }
    } else {
        match delete_indices(client, &deletion).await {
            Ok(DeleteOutcome::Deleted(count)) => {
                tracing::info!(index_prefix = %prefix, count, "Deleted indices");
                metrics::record_index_deletions(prefix, count as u64);
                RuleOutcome::Deleted { count }
            }
            Ok(DeleteOutcome::Noop) => RuleOutcome::Retained,
            Err(e) => {
                tracing::error!(
                    index_prefix = %prefix,
                    indices = %join_names(deletion.iter()),
                    error = %e,
                    "Failed to delete indices"
                );
                metrics::record_cleanup_failure(prefix, "delete");
                RuleOutcome::DeleteFailed {
                    error: e.to_string(),
                }
            }
        }
    };

    Ok(RuleReport {
        index_prefix: prefix.to_string(),
        kept,
        deletion,
        outcome,
    })
}
