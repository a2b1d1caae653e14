//! Observability module providing logging and metrics.
//!
//! This module initializes and configures:
//! - Structured logging with configurable formats (pretty, compact, JSON)
//! - Prometheus metrics for the maintenance jobs

pub mod metrics;
mod tracing_init;

pub use tracing_init::*;
