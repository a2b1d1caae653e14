//! Scheduling infrastructure shared by the background workers.
//!
//! Workers follow a consistent pattern:
//! 1. Settings built once from the validated configuration
//! 2. Worker function that loops until shutdown or a fatal error
//! 3. Run function that performs a single pass and returns a report
//! 4. A [`Ticker`] that paces the loop and owns cancellation

mod ticker;

pub use ticker::Ticker;
