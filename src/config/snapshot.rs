//! Snapshot backup configuration.
//!
//! # Example
//!
//! ```toml
//! snapshot_interval = 86400
//! # Takes precedence over snapshot_interval when set.
//! cron = "0 0 2 * * *"
//!
//! [[snapshot_indices]]
//! index = "incidents-*"
//! repository = "incidents_backup"
//! snap_name = "incidents"
//! location = "/mnt/es-backup/incidents"
//! ```

use serde::{Deserialize, Serialize};

/// Characters Elasticsearch rejects in repository and snapshot names.
const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#'];

fn invalid_name_char(name: &str) -> Option<char> {
    name.chars()
        .find(|c| FORBIDDEN_NAME_CHARS.contains(c) || c.is_whitespace())
}

/// One snapshot rule: which indices to back up and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotEntry {
    /// Index name or pattern passed to the cluster as given (e.g. `logs-*`).
    pub index: String,

    /// Snapshot repository name. Registered as a filesystem repository on
    /// every run.
    pub repository: String,

    /// Snapshot name prefix. The run's Unix timestamp is appended.
    pub snap_name: String,

    /// Filesystem location of the repository on the cluster nodes.
    /// Defaults to the repository name (resolved against `path.repo`).
    #[serde(default)]
    pub location: Option<String>,
}

impl SnapshotEntry {
    /// The filesystem location to register for the repository.
    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or(&self.repository)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.index.trim().is_empty() {
            return Err("snapshot_indices: index must not be empty".into());
        }
        if self.repository.trim().is_empty() {
            return Err(format!(
                "snapshot_indices ({}): repository must not be empty",
                self.index
            ));
        }
        if let Some(c) = invalid_name_char(&self.repository) {
            return Err(format!(
                "snapshot_indices ({}): repository '{}' contains invalid character {c:?}",
                self.index, self.repository
            ));
        }
        if self.snap_name.trim().is_empty() {
            return Err(format!(
                "snapshot_indices ({}): snap_name must not be empty",
                self.index
            ));
        }
        if let Some(c) = invalid_name_char(&self.snap_name) {
            return Err(format!(
                "snapshot_indices ({}): snap_name '{}' contains invalid character {c:?}",
                self.index, self.snap_name
            ));
        }
        if self.snap_name.chars().any(char::is_uppercase) {
            return Err(format!(
                "snapshot_indices ({}): snap_name '{}' must be lowercase",
                self.index, self.snap_name
            ));
        }
        if self.snap_name.starts_with('_') {
            return Err(format!(
                "snapshot_indices ({}): snap_name '{}' must not start with '_'",
                self.index, self.snap_name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> SnapshotEntry {
        SnapshotEntry {
            index: "logs-*".into(),
            repository: "backup".into(),
            snap_name: "logs".into(),
            location: None,
        }
    }

    #[test]
    fn test_location_defaults_to_repository() {
        assert_eq!(entry().location(), "backup");

        let with_location = SnapshotEntry {
            location: Some("/mnt/backup".into()),
            ..entry()
        };
        assert_eq!(with_location.location(), "/mnt/backup");
    }

    #[test]
    fn test_validate() {
        assert!(entry().validate().is_ok());

        let bad_repo = SnapshotEntry {
            repository: "a/b".into(),
            ..entry()
        };
        assert!(bad_repo.validate().is_err());

        let no_name = SnapshotEntry {
            snap_name: " ".into(),
            ..entry()
        };
        assert!(no_name.validate().unwrap_err().contains("snap_name"));
    }

    #[test]
    fn test_snap_name_must_be_lowercase() {
        let upper = SnapshotEntry {
            snap_name: "Incidents".into(),
            ..entry()
        };
        let err = upper.validate().unwrap_err();
        assert!(err.contains("lowercase"), "{err}");
    }

    #[test]
    fn test_snap_name_rejects_names_elasticsearch_forbids() {
        for snap_name in ["logs daily", "logs\tdaily", "logs#1", "logs?", "a/b", "_logs"] {
            let bad = SnapshotEntry {
                snap_name: snap_name.into(),
                ..entry()
            };
            assert!(bad.validate().is_err(), "{snap_name:?} should be rejected");
        }
    }

    #[test]
    fn test_repository_rejects_whitespace_and_url_characters() {
        for repository in ["back up", "backup\n", "backup#", "backup?x"] {
            let bad = SnapshotEntry {
                repository: repository.into(),
                ..entry()
            };
            assert!(bad.validate().is_err(), "{repository:?} should be rejected");
        }
    }
}
