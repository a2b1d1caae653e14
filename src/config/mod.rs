//! Configuration module for indexkeeper.
//!
//! The tool is configured via a TOML file (or JSON when the file name ends in
//! `.json`), with support for environment variable interpolation using
//! `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! check_interval = 86400
//!
//! [[clean_indices]]
//! index = "logs"
//! time_series = 7
//!
//! [cluster]
//! url = "http://elasticsearch:9200"
//! password = "${ES_PASSWORD}"
//! ```

mod cluster;
mod observability;
mod retention;
mod snapshot;

use std::{num::NonZeroU32, path::Path, str::FromStr as _, time::Duration};

use cron::Schedule;

pub use cluster::*;
pub use observability::*;
pub use retention::*;
use serde::{Deserialize, Serialize};
pub use snapshot::*;

use crate::retention::RetentionRule;

/// Root configuration for indexkeeper.
///
/// Every section is optional with sensible defaults; a cleanup deployment
/// only needs `clean_indices`, a snapshot deployment only `snapshot_indices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeeperConfig {
    /// Seconds to sleep between cleanup cycles.
    /// Default: 86400 (once per day)
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// If true, log what would be deleted without deleting anything.
    #[serde(default)]
    pub dry_run: bool,

    /// Clock used to decide which day is "today" when naming kept indices.
    #[serde(default)]
    pub timezone: DateBasis,

    /// Retention rules, evaluated in order on every cycle.
    #[serde(default)]
    pub clean_indices: Vec<CleanIndexEntry>,

    /// Seconds to sleep between snapshot runs.
    /// Default: 86400 (once per day)
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u64,

    /// Cron expression for snapshot runs, with a leading seconds field
    /// (`sec min hour day month weekday [year]`), read on the `timezone`
    /// clock. Takes precedence over `snapshot_interval` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    /// Snapshot rules, evaluated in order on every snapshot run.
    #[serde(default)]
    pub snapshot_indices: Vec<SnapshotEntry>,

    /// Cluster connection settings.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prometheus metrics exporter.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            dry_run: false,
            timezone: DateBasis::default(),
            clean_indices: Vec::new(),
            snapshot_interval: default_snapshot_interval(),
            cron: None,
            snapshot_indices: Vec::new(),
            cluster: ClusterConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

fn default_check_interval() -> u64 {
    86_400
}

fn default_snapshot_interval() -> u64 {
    86_400
}

impl KeeperConfig {
    /// Load configuration from a file.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    /// Environment variables in the format `${VAR_NAME}` are expanded first.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(e, path.to_path_buf()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_str(&contents)
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents, CommentSyntax::Hash)?;
        let config: KeeperConfig = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents, CommentSyntax::None)?;
        let config: KeeperConfig = serde_json::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval == 0 {
            return Err(ConfigError::Validation(
                "check_interval must be greater than 0".into(),
            ));
        }
        if self.snapshot_interval == 0 {
            return Err(ConfigError::Validation(
                "snapshot_interval must be greater than 0".into(),
            ));
        }

        self.snapshot_schedule()?;

        // Building the rules runs the per-entry checks.
        self.retention_rules()?;
        for entry in &self.snapshot_indices {
            entry.validate().map_err(ConfigError::Validation)?;
        }

        self.cluster.validate().map_err(ConfigError::Validation)?;
        self.metrics.validate().map_err(ConfigError::Validation)?;

        Ok(())
    }

    /// The immutable retention rule list, in configuration order.
    pub fn retention_rules(&self) -> Result<Vec<RetentionRule>, ConfigError> {
        self.clean_indices
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let retain_days = NonZeroU32::new(entry.time_series).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "clean_indices[{position}] ({}): time_series must be at least 1",
                        entry.index
                    ))
                })?;
                RetentionRule::new(entry.index.clone(), retain_days).map_err(|e| {
                    ConfigError::Validation(format!("clean_indices[{position}]: {e}"))
                })
            })
            .collect()
    }

    /// Get the cleanup interval as a Duration.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    /// Get the snapshot interval as a Duration.
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval)
    }

    /// The parsed `cron` schedule, or `None` when snapshots run on
    /// `snapshot_interval`.
    pub fn snapshot_schedule(&self) -> Result<Option<Schedule>, ConfigError> {
        let Some(expr) = self.cron.as_deref() else {
            return Ok(None);
        };
        Schedule::from_str(expr.trim())
            .map(Some)
            .map_err(|e| ConfigError::Validation(format!("cron {expr:?}: {e}")))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// How comments are written in the file being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentSyntax {
    /// TOML: `#` starts a comment running to the end of the line.
    Hash,
    /// JSON: no comments, so `#` is ordinary text.
    None,
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// With [`CommentSyntax::Hash`], references after a `#` on the same line are
/// left untouched.
fn expand_env_vars(input: &str, comments: CommentSyntax) -> Result<String, ConfigError> {
    let re = env_var_pattern();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = match comments {
            CommentSyntax::Hash => line.find('#'),
            CommentSyntax::None => None,
        };

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

fn env_var_pattern() -> &'static regex::Regex {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"))
}
