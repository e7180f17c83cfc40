//! Utility functions module
//!
//! Human-readable formatting of sizes, speeds and durations, and size
//! parsing for the command line.

pub mod units;

pub use units::{format_bytes, format_nanos, format_speed, parse_size};
