//! Scheduled index retention and snapshot backups for Elasticsearch-compatible
//! clusters.
//!
//! Daily indices are expected to be named `<prefix>-YYYY.MM.DD`. For every
//! retention rule the cleanup worker keeps the names for today and the
//! preceding `retain_days - 1` days and deletes every other index that
//! matches `<prefix>*`.

pub mod cluster;
pub mod config;
pub mod jobs;
pub mod observability;
pub mod retention;
pub mod snapshot;

#[cfg(test)]
mod tests;
