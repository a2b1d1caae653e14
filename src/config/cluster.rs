//! Cluster connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to reach the search cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// Base URL of the cluster's REST API.
    /// Default: `http://elasticsearch:9200`
    #[serde(default = "default_url")]
    pub url: String,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Basic auth user name.
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password. Use `${VAR}` to read it from the environment.
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            username: None,
            password: None,
        }
    }
}

fn default_url() -> String {
    "http://elasticsearch:9200".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ClusterConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| format!("cluster.url '{}' is not a valid URL: {e}", self.url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!(
                "cluster.url '{}' must use http or https",
                self.url
            ));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err("cluster timeouts must be greater than 0".into());
        }
        if self.password.is_some() && self.username.is_none() {
            return Err("cluster.password is set without cluster.username".into());
        }
        Ok(())
    }
}
