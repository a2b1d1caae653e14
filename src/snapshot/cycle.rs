use super::SnapshotRule;
use crate::{
    cluster::{ClusterClient, ClusterError},
    observability::metrics,
    retention::join_names,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The cluster accepted snapshot `name` covering `count` indices.
    Created { name: String, count: usize },
    /// No index matched the pattern.
    NoIndices,
    RepositoryFailed { error: String },
    ListFailed { error: String },
    SnapshotFailed { error: String },
}

impl SnapshotOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SnapshotOutcome::RepositoryFailed { .. }
                | SnapshotOutcome::ListFailed { .. }
                | SnapshotOutcome::SnapshotFailed { .. }
        )
    }

    fn status(&self) -> &'static str {
        match self {
            SnapshotOutcome::Created { .. } => "created",
            SnapshotOutcome::NoIndices => "skipped",
            _ => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotReport {
    pub index: String,
    pub repository: String,
    pub outcome: SnapshotOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotCycleReport {
    pub rules: Vec<SnapshotReport>,
}

impl SnapshotCycleReport {
    pub fn created(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.outcome, SnapshotOutcome::Created { .. }))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.rules.iter().filter(|r| r.outcome.is_failure()).count()
    }
}

/// Snapshot every rule once, in order. Every failure is isolated to its rule.
pub async fn run_snapshot_cycle(
    rules: &[SnapshotRule],
    client: &dyn ClusterClient,
    unix_seconds: i64,
) -> SnapshotCycleReport {
    let mut report = SnapshotCycleReport::default();

    for rule in rules {
        let outcome = snapshot_rule(rule, client, unix_seconds).await;
        metrics::record_snapshot(rule.repository(), outcome.status());
        report.rules.push(SnapshotReport {
            index: rule.index().to_string(),
            repository: rule.repository().to_string(),
            outcome,
        });
    }

    report
}

async fn snapshot_rule(
    rule: &SnapshotRule,
    client: &dyn ClusterClient,
    unix_seconds: i64,
) -> SnapshotOutcome {
    if let Err(e) = client
        .create_fs_repository(rule.repository(), rule.location())
        .await
    {
        log_failure(rule, "Failed to register snapshot repository", &e);
        return SnapshotOutcome::RepositoryFailed {
            error: e.to_string(),
        };
    }

    let indices: Vec<String> = match client.list_indices(rule.index()).await {
        Ok(live) => live.into_iter().collect(),
        Err(e) => {
            log_failure(rule, "Failed to list indices for snapshot", &e);
            return SnapshotOutcome::ListFailed {
                error: e.to_string(),
            };
        }
    };

    // An empty index list would snapshot the whole cluster.
    if indices.is_empty() {
        tracing::info!(
            index = %rule.index(),
            repository = %rule.repository(),
            "No indices match, skipping snapshot"
        );
        return SnapshotOutcome::NoIndices;
    }

    let name = rule.snapshot_name(unix_seconds);
    match client
        .create_snapshot(rule.repository(), &name, &indices)
        .await
    {
        Ok(()) => {
            tracing::info!(
                repository = %rule.repository(),
                snapshot = %name,
                indices = %join_names(indices.iter()),
                "Snapshot accepted"
            );
            SnapshotOutcome::Created {
                name,
                count: indices.len(),
            }
        }
        Err(e) => {
            log_failure(rule, "Failed to create snapshot", &e);
            SnapshotOutcome::SnapshotFailed {
                error: e.to_string(),
            }
        }
    }
}

fn log_failure(rule: &SnapshotRule, message: &str, error: &ClusterError) {
    tracing::error!(
        index = %rule.index(),
        repository = %rule.repository(),
        error = %error,
        "{message}"
    );
}
