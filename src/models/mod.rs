//! Data models module
//!
//! Device capabilities, per-phase measurements and the final report.

pub mod result;

pub use result::{BenchmarkResult, BlockDeviceInfo, Report, SeekResult, SequentialReadResult};
