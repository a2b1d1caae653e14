//! End-to-end tests driving the jobs through the real HTTP client against a
//! mock cluster.
