//! Common utilities used across the sleipnir workspace.
//!
//! This crate holds the small helpers shared by the VM and its tests: hex
//! encoding, signed integer reinterpretation and a deadline-bounded thread pool.

/// General utility functions.
pub mod utils;
