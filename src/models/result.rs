//! Benchmark result data models
//!
//! Raw byte and nanosecond counts produced by the benchmarks. Turning them
//! into human units is left to [`crate::report`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Capabilities of the device under test, fixed once probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDeviceInfo {
    /// Total addressable bytes
    pub device_size_bytes: u64,
    /// `device_size_bytes / physical_block_size`
    pub block_count: u64,
    /// Native block size reported by the device
    pub physical_block_size: u32,
    /// Byte alignment required for unbuffered transfers (buffer address and
    /// size)
    pub required_alignment: usize,
}

/// Outcome of the sequential read phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialReadResult {
    /// Bytes read across every probe
    pub bytes_read: u64,
    /// Time spent reading across every probe
    pub duration_ns: u64,
    /// Average time to read one physical block
    pub block_read_duration_ns: u64,
    /// Number of fixed-size probes taken (1 unless autodetecting)
    pub iterations: u32,
}

/// Outcome of the random access phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekResult {
    /// Random reads performed across every probe
    pub seek_count: u32,
    /// Wall time of all random reads, seeks and transfers together
    pub total_random_access_duration_ns: u64,
    /// Share of the total attributed to data transfer
    pub estimated_reading_duration_ns: u64,
    pub average_seek_duration_ns: u64,
    /// Number of fixed-count probes taken (1 unless autodetecting)
    pub iterations: u32,
}

/// Everything measured in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub sequential_bytes_read: u64,
    pub sequential_duration_ns: u64,
    pub block_read_duration_ns: u64,
    pub seek_count: u32,
    pub total_random_access_duration_ns: u64,
    pub estimated_reading_duration_ns: u64,
    pub average_seek_duration_ns: u64,
}

impl BenchmarkResult {
    pub fn new(sequential: &SequentialReadResult, seek: &SeekResult) -> Self {
        Self {
            sequential_bytes_read: sequential.bytes_read,
            sequential_duration_ns: sequential.duration_ns,
            block_read_duration_ns: sequential.block_read_duration_ns,
            seek_count: seek.seek_count,
            total_random_access_duration_ns: seek.total_random_access_duration_ns,
            estimated_reading_duration_ns: seek.estimated_reading_duration_ns,
            average_seek_duration_ns: seek.average_seek_duration_ns,
        }
    }

    /// Sequential read throughput, `None` if the reads took no measurable time
    pub fn sequential_bytes_per_sec(&self) -> Option<f64> {
        if self.sequential_duration_ns == 0 {
            return None;
        }
        Some(self.sequential_bytes_read as f64 * NANOS_PER_SEC / self.sequential_duration_ns as f64)
    }

    /// Part of the random access time not explained by data transfer
    pub fn estimated_seeking_duration_ns(&self) -> u64 {
        self.total_random_access_duration_ns
            .saturating_sub(self.estimated_reading_duration_ns)
    }

    /// `None` when the average seek time came out as zero
    pub fn seeks_per_second(&self) -> Option<f64> {
        if self.average_seek_duration_ns == 0 {
            return None;
        }
        Some(NANOS_PER_SEC / self.average_seek_duration_ns as f64)
    }
}

/// What gets handed to the report renderer at the end of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    pub device: PathBuf,
    pub device_info: BlockDeviceInfo,
    pub result: BenchmarkResult,
    /// +/- error bound of any single timed interval
    pub measurement_tolerance_ns: u64,
    /// Seed the random offsets were drawn with
    pub seed: u64,
}
