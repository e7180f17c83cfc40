//! Benchmark engine module
//!
//! The sequential read and random access measurements, and the orchestrator
//! that runs them in order against one device.

pub mod progress;
pub mod random;
pub mod runner;
pub mod sequential;

pub use progress::{ProgressSender, ProgressUpdate};
pub use random::{average_seek_ns, RandomSeekBenchmark};
pub use runner::{run_benchmarks, BenchmarkOrchestrator};
pub use sequential::SequentialReadBenchmark;
