//! Index retention: purges daily indices that fall outside a retention window.
//!
//! Each cycle, for every configured rule in order:
//! 1. Computes the kept set: `<prefix>-YYYY.MM.DD` for today and the
//!    preceding `retain_days - 1` days
//! 2. Lists the live indices matching `<prefix>*`
//! 3. Diffs live against kept to get the deletion set
//! 4. Deletes the whole deletion set in a single acknowledged request
//!
//! Per-rule failures are logged and skipped. A cluster that cannot be
//! reached stops the worker.

mod cycle;
mod deleter;
mod diff;
mod window;
mod worker;

use std::{collections::BTreeSet, fmt, num::NonZeroU32};

pub use cycle::{CycleReport, RuleOutcome, RuleReport, run_one_cycle};
pub use deleter::{DeleteOutcome, delete_indices};
pub use diff::diff;
pub use window::compute_kept_set;
pub use worker::{CleanupError, CleanupSettings, start_retention_worker};

/// Characters Elasticsearch never allows in an index name. Any of them in a
/// prefix would either widen the listing pattern or change the request path.
const FORBIDDEN_INDEX_CHARS: &[char] = &['\\', '/', '?', '"', '<', '>', '|', ',', '#', ':'];

/// One cleanup policy: keep the newest `retain_days` daily indices of a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionRule {
    index_prefix: String,
    retain_days: NonZeroU32,
}

impl RetentionRule {
    /// Build a rule, rejecting prefixes that would widen the listing pattern
    /// or split the bulk delete path.
    pub fn new(index_prefix: impl Into<String>, retain_days: NonZeroU32) -> Result<Self, String> {
        let index_prefix = index_prefix.into();
        if index_prefix.trim().is_empty() {
            return Err("index prefix must not be empty".into());
        }
        if index_prefix.contains('*') {
            return Err(format!(
                "index prefix '{index_prefix}' must not contain a wildcard"
            ));
        }
        if let Some(c) = index_prefix
            .chars()
            .find(|c| FORBIDDEN_INDEX_CHARS.contains(c) || c.is_whitespace())
        {
            return Err(format!(
                "index prefix {index_prefix:?} contains invalid character {c:?}"
            ));
        }
        if index_prefix.chars().any(char::is_uppercase) {
            return Err(format!(
                "index prefix '{index_prefix}' must be lowercase"
            ));
        }
        if index_prefix.starts_with(['-', '_', '+']) || index_prefix == "." || index_prefix == ".." {
            return Err(format!(
                "index prefix '{index_prefix}' is not a valid index name start"
            ));
        }
        Ok(Self {
            index_prefix,
            retain_days,
        })
    }

    pub fn index_prefix(&self) -> &str {
        &self.index_prefix
    }

    pub fn retain_days(&self) -> NonZeroU32 {
        self.retain_days
    }

    /// Pattern used to list this rule's live indices.
    pub fn list_pattern(&self) -> String {
        format!("{}*", self.index_prefix)
    }
}

impl fmt::Display for RetentionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (keep {} days)", self.index_prefix, self.retain_days)
    }
}

/// Index names that must survive a purge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeptSet(BTreeSet<String>);

impl KeptSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl FromIterator<String> for KeptSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Live indices that are not in the kept set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSet(BTreeSet<String>);

impl DeletionSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Names in sorted order, ready for a bulk request.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<String> for DeletionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Comma-separated rendering for log lines.
pub(crate) fn join_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    names.map(String::as_str).collect::<Vec<_>>().join(", ")
}
