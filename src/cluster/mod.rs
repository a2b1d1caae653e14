//! Search cluster boundary.
//!
//! The maintenance jobs only talk to the cluster through the
//! [`ClusterConnector`] and [`ClusterClient`] traits:
//! - Elasticsearch-compatible REST API via `reqwest` (production)
//! - In-memory fake (tests only, see `test_utils`)
//!
//! Errors are reported as [`ClusterError`], independent of the HTTP client
//! library. [`ClusterError::is_connection_failure`] decides whether a failure
//! means the cluster is unreachable (fatal to the cleanup loop) or that a
//! single query failed on a reachable cluster (recoverable).

mod elasticsearch;
#[cfg(test)]
pub(crate) mod test_utils;

use std::collections::BTreeSet;

use async_trait::async_trait;
pub use elasticsearch::{ElasticsearchClient, ElasticsearchConnector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Cluster unreachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Cluster returned HTTP {status} for {operation}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} was not acknowledged by the cluster")]
    NotAcknowledged { operation: &'static str },

    #[error("{operation} request failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
}

impl ClusterError {
    /// True when the cluster could not be reached at all, as opposed to a
    /// reachable cluster rejecting or failing one request.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ClusterError::Unreachable { .. })
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Identity reported by the cluster on ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: String,
}

/// Establishes a cluster handle. Called once per cycle.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    /// Ping the cluster and return a handle for this cycle.
    ///
    /// Any error means the cluster is not usable for this cycle.
    async fn connect(&self) -> ClusterResult<Box<dyn ClusterClient>>;
}

/// Operations the maintenance jobs run against a connected cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Identity captured when the handle was established.
    fn info(&self) -> &ClusterInfo;

    /// Names of all indices matching `pattern` (e.g. `logs*`).
    async fn list_indices(&self, pattern: &str) -> ClusterResult<BTreeSet<String>>;

    /// Delete all `names` in one request.
    ///
    /// Returns an error if the cluster does not acknowledge the deletion.
    async fn delete_indices(&self, names: &[String]) -> ClusterResult<()>;

    /// Register (or update) a shared-filesystem snapshot repository.
    async fn create_fs_repository(&self, repository: &str, location: &str) -> ClusterResult<()>;

    /// Start a snapshot of `indices` into `repository`.
    ///
    /// Returns an error if the cluster does not accept the snapshot.
    async fn create_snapshot(
        &self,
        repository: &str,
        snapshot: &str,
        indices: &[String],
    ) -> ClusterResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unreachable_is_connection_failure() {
        let unreachable = ClusterError::Unreachable {
            url: "http://localhost:9200".into(),
            message: "connection refused".into(),
        };
        assert!(unreachable.is_connection_failure());

        let status = ClusterError::Status {
            operation: "list indices",
            status: 500,
            body: "boom".into(),
        };
        assert!(!status.is_connection_failure());

        let nack = ClusterError::NotAcknowledged {
            operation: "delete indices",
        };
        assert!(!nack.is_connection_failure());
        assert_eq!(
            nack.to_string(),
            "delete indices was not acknowledged by the cluster"
        );
    }
}
