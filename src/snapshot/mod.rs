//! Periodic snapshot backups into filesystem repositories.

mod cycle;
mod worker;

use std::fmt;

pub use cycle::{SnapshotCycleReport, SnapshotOutcome, SnapshotReport, run_snapshot_cycle};
pub use worker::{SnapshotSettings, start_snapshot_worker};

use crate::config::SnapshotEntry;

/// Which indices to back up, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRule {
    index: String,
    repository: String,
    snap_name: String,
    location: String,
}

impl SnapshotRule {
    /// Index name or pattern, passed to the cluster unchanged.
    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Snapshot name for a run started at `unix_seconds`.
    pub fn snapshot_name(&self, unix_seconds: i64) -> String {
        format!("{}-{}", self.snap_name, unix_seconds)
    }
}

impl From<&SnapshotEntry> for SnapshotRule {
    fn from(entry: &SnapshotEntry) -> Self {
        Self {
            index: entry.index.clone(),
            repository: entry.repository.clone(),
            snap_name: entry.snap_name.clone(),
            location: entry.location().to_string(),
        }
    }
}

impl fmt::Display for SnapshotRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.index, self.repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_from_entry() {
        let entry = SnapshotEntry {
            index: "incidents-*".into(),
            repository: "incidents_backup".into(),
            snap_name: "incidents".into(),
            location: None,
        };
        let rule = SnapshotRule::from(&entry);

        assert_eq!(rule.index(), "incidents-*");
        assert_eq!(rule.location(), "incidents_backup");
        assert_eq!(rule.snapshot_name(1_700_000_000), "incidents-1700000000");
        assert_eq!(rule.to_string(), "incidents-* -> incidents_backup");
    }
}
