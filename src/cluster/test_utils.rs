//! In-memory cluster for exercising the jobs without HTTP.
//!
//! `FakeCluster` is both the connector and the per-cycle client. Clones share
//! state, so a test keeps one clone to seed indices, inject failures and
//! inspect the calls the jobs made.

use std::{
    collections::{BTreeSet, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{ClusterClient, ClusterConnector, ClusterError, ClusterInfo, ClusterResult};

#[derive(Debug, Default)]
pub struct FakeState {
    pub indices: BTreeSet<String>,
    pub ping_fails: bool,
    /// List patterns that fail as if the cluster went away.
    pub unreachable_patterns: HashSet<String>,
    /// List patterns that fail with a server error.
    pub failing_patterns: HashSet<String>,
    pub delete_unacknowledged: bool,
    pub repository_fails: bool,
    pub snapshot_rejected: bool,
    pub connects: usize,
    pub list_calls: Vec<String>,
    pub delete_calls: Vec<Vec<String>>,
    pub repositories: Vec<(String, String)>,
    pub snapshots: Vec<(String, String, Vec<String>)>,
}

#[derive(Clone)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
    info: ClusterInfo,
}

impl FakeCluster {
    pub fn with_indices<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = FakeState {
            indices: indices.into_iter().map(Into::into).collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            info: ClusterInfo {
                cluster_name: "fake".into(),
                version: "7.17.0".into(),
            },
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake cluster mutex poisoned")
    }

    pub fn indices(&self) -> Vec<String> {
        self.state().indices.iter().cloned().collect()
    }
}

fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

#[async_trait]
impl ClusterConnector for FakeCluster {
    async fn connect(&self) -> ClusterResult<Box<dyn ClusterClient>> {
        let mut state = self.state();
        state.connects += 1;
        if state.ping_fails {
            return Err(ClusterError::Unreachable {
                url: "http://fake:9200".into(),
                message: "connection refused".into(),
            });
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    fn info(&self) -> &ClusterInfo {
        &self.info
    }

    async fn list_indices(&self, pattern: &str) -> ClusterResult<BTreeSet<String>> {
        let mut state = self.state();
        state.list_calls.push(pattern.to_string());

        if state.unreachable_patterns.contains(pattern) {
            return Err(ClusterError::Unreachable {
                url: "http://fake:9200".into(),
                message: "connection reset".into(),
            });
        }
        if state.failing_patterns.contains(pattern) {
            return Err(ClusterError::Status {
                operation: "list indices",
                status: 500,
                body: "search_phase_execution_exception".into(),
            });
        }

        Ok(state
            .indices
            .iter()
            .filter(|name| matches_pattern(pattern, name))
            .cloned()
            .collect())
    }

    async fn delete_indices(&self, names: &[String]) -> ClusterResult<()> {
        let mut state = self.state();
        state.delete_calls.push(names.to_vec());

        if state.delete_unacknowledged {
            return Err(ClusterError::NotAcknowledged {
                operation: "delete indices",
            });
        }
        for name in names {
            state.indices.remove(name);
        }
        Ok(())
    }

    async fn create_fs_repository(&self, repository: &str, location: &str) -> ClusterResult<()> {
        let mut state = self.state();
        if state.repository_fails {
            return Err(ClusterError::Status {
                operation: "create snapshot repository",
                status: 500,
                body: "repository_verification_exception".into(),
            });
        }
        state
            .repositories
            .push((repository.to_string(), location.to_string()));
        Ok(())
    }

    async fn create_snapshot(
        &self,
        repository: &str,
        snapshot: &str,
        indices: &[String],
    ) -> ClusterResult<()> {
        let mut state = self.state();
        if state.snapshot_rejected {
            return Err(ClusterError::NotAcknowledged {
                operation: "create snapshot",
            });
        }
        state.snapshots.push((
            repository.to_string(),
            snapshot.to_string(),
            indices.to_vec(),
        ));
        Ok(())
    }
}
