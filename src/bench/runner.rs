//! Benchmark orchestration
//!
//! Runs the phases strictly in order: probe, sequential read, seed the
//! random generator, random access. The seek phase needs the block read
//! time the sequential phase produced.

use chrono::Utc;
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::bench::progress::{ProgressSender, ProgressUpdate};
use crate::bench::random::RandomSeekBenchmark;
use crate::bench::sequential::SequentialReadBenchmark;
use crate::config::BenchmarkConfig;
use crate::io::clock::{Clock, MonotonicClock};
use crate::io::device::{probe, BlockDevice, RawBlockDevice};
use crate::models::{BenchmarkResult, Report};
use crate::Result;

/// Seed derived from the current wall-clock time, in whole seconds
pub fn wall_clock_seed() -> u64 {
    Utc::now().timestamp() as u64
}

pub struct BenchmarkOrchestrator<'a> {
    config: &'a BenchmarkConfig,
    clock: &'a dyn Clock,
    progress: ProgressSender,
}

impl<'a> BenchmarkOrchestrator<'a> {
    pub fn new(config: &'a BenchmarkConfig, clock: &'a dyn Clock) -> Self {
        Self {
            config,
            clock,
            progress: ProgressSender::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Run every phase against an already opened device
    pub fn run(&self, device: &mut dyn BlockDevice) -> Result<Report> {
        self.config.validate()?;

        let device_info = probe(device)?;
        self.progress.send(ProgressUpdate::Probed(device_info));

        info!("Starting sequential read phase");
        let sequential = SequentialReadBenchmark::new(&device_info, self.clock, &self.progress)
            .with_tuning(self.config.sequential)
            .run(device, self.config.requested_read_size())?;
        debug!("Sequential phase: {:?}", sequential);

        let seed = self.config.seed.unwrap_or_else(wall_clock_seed);
        debug!("Seeding random offsets with {}", seed);
        let mut rng = SmallRng::seed_from_u64(seed);

        info!("Starting random access phase");
        let seek = RandomSeekBenchmark::new(
            &device_info,
            self.clock,
            &self.progress,
            sequential.block_read_duration_ns,
        )
        .with_tuning(self.config.seek)
        .run(device, &mut rng, self.config.requested_seek_count())?;
        debug!("Random access phase: {:?}", seek);

        Ok(Report {
            timestamp: Utc::now(),
            device: self.config.device.clone(),
            device_info,
            result: BenchmarkResult::new(&sequential, &seek),
            measurement_tolerance_ns: self.clock.measurement_tolerance_ns()?,
            seed,
        })
    }
}

/// Open the configured device, benchmark it with the system's monotonic
/// clock, and close it again on every exit path
pub fn run_benchmarks(config: &BenchmarkConfig, progress: ProgressSender) -> Result<Report> {
    config.validate()?;

    let mut device = RawBlockDevice::open(&config.device)?;
    let clock = MonotonicClock::new();
    info!("Benchmarking {}", device.path().display());

    BenchmarkOrchestrator::new(config, &clock)
        .with_progress(progress)
        .run(&mut device)
}
