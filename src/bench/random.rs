//! Random access (seek) benchmark
//!
//! Times many single-block reads at uniformly random block offsets, then
//! subtracts the transfer time predicted by the sequential phase to leave an
//! estimate of pure seek latency.

use log::debug;
use rand::Rng;

use crate::bench::progress::{ProgressSender, ProgressUpdate};
use crate::config::SeekTuning;
use crate::io::buffer::AlignedBuffer;
use crate::io::clock::{elapsed_ns, Clock};
use crate::io::device::BlockDevice;
use crate::models::{BlockDeviceInfo, SeekResult};
use crate::Result;

/// Average seek time once the estimated reading time is taken out.
///
/// The estimate can exceed what was measured when seeks are nearly free
/// (solid-state media), so the difference is floored at zero.
pub fn average_seek_ns(measured_ns: u64, estimated_reading_ns: u64, count: u64) -> u64 {
    if count == 0 || measured_ns <= estimated_reading_ns {
        return 0;
    }
    (measured_ns - estimated_reading_ns) / count
}

/// Byte offset of a uniformly chosen block
pub fn random_block_offset<R: Rng + ?Sized>(rng: &mut R, info: &BlockDeviceInfo) -> u64 {
    let index = rng.gen_range(0..info.block_count);
    index * u64::from(info.physical_block_size)
}

/// Random access benchmark executor
pub struct RandomSeekBenchmark<'a> {
    info: &'a BlockDeviceInfo,
    clock: &'a dyn Clock,
    progress: &'a ProgressSender,
    tuning: SeekTuning,
    block_read_ns: u64,
}

impl<'a> RandomSeekBenchmark<'a> {
    /// `block_read_ns` is the average time to read one physical block, as
    /// measured by the sequential benchmark
    pub fn new(
        info: &'a BlockDeviceInfo,
        clock: &'a dyn Clock,
        progress: &'a ProgressSender,
        block_read_ns: u64,
    ) -> Self {
        Self {
            info,
            clock,
            progress,
            tuning: SeekTuning::default(),
            block_read_ns,
        }
    }

    pub fn with_tuning(mut self, tuning: SeekTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Measure with `seek_count` random reads, or autodetect a count when it
    /// is `None` or zero. `rng` must already be seeded.
    pub fn run<R: Rng + ?Sized>(
        &self,
        device: &mut dyn BlockDevice,
        rng: &mut R,
        seek_count: Option<u32>,
    ) -> Result<SeekResult> {
        match seek_count.filter(|&count| count != 0) {
            Some(count) => self.measure_fixed(device, rng, count),
            None => self.autodetect(device, rng),
        }
    }

    /// Time `seek_count` one-block reads as a single interval
    pub fn measure_fixed<R: Rng + ?Sized>(
        &self,
        device: &mut dyn BlockDevice,
        rng: &mut R,
        seek_count: u32,
    ) -> Result<SeekResult> {
        let measured = self.timed_random_reads(device, rng, seek_count)?;
        Ok(self.summarize(seek_count, measured, 1))
    }

    /// Repeat [`measure_fixed`](Self::measure_fixed) with doubling seek
    /// counts until enough time has been spent or the count ceiling is
    /// reached, then average over every read performed
    pub fn autodetect<R: Rng + ?Sized>(
        &self,
        device: &mut dyn BlockDevice,
        rng: &mut R,
    ) -> Result<SeekResult> {
        let min_ns = self.tuning.min_duration.as_nanos().min(u128::from(u64::MAX)) as u64;
        let mut seek_count = self.tuning.initial_count;
        let mut total_seeks = 0u32;
        let mut total_ns = 0u64;
        let mut iterations = 0u32;

        while total_ns < min_ns && seek_count <= self.tuning.max_count {
            let measured = self.timed_random_reads(device, rng, seek_count)?;
            total_seeks = total_seeks.saturating_add(seek_count);
            total_ns += measured;
            iterations += 1;

            debug!(
                "Seek probe {}: {} reads in {} ns (totals: {} reads, {} ns)",
                iterations, seek_count, measured, total_seeks, total_ns
            );

            seek_count = match seek_count.checked_mul(2) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(self.summarize(total_seeks, total_ns, iterations))
    }

    fn timed_random_reads<R: Rng + ?Sized>(
        &self,
        device: &mut dyn BlockDevice,
        rng: &mut R,
        seek_count: u32,
    ) -> Result<u64> {
        self.progress
            .send(ProgressUpdate::RandomReads { count: seek_count });

        let mut buffer = AlignedBuffer::allocate(
            self.info.required_alignment,
            self.info.physical_block_size as usize,
        )?;

        let start = self.clock.now()?;
        for _ in 0..seek_count {
            let offset = random_block_offset(rng, self.info);
            device.read_at(buffer.as_mut_slice(), offset)?;
        }
        let end = self.clock.now()?;

        Ok(elapsed_ns(start, end))
    }

    fn summarize(&self, seek_count: u32, measured_ns: u64, iterations: u32) -> SeekResult {
        let estimated = self.block_read_ns.saturating_mul(u64::from(seek_count));

        SeekResult {
            seek_count,
            total_random_access_duration_ns: measured_ns,
            estimated_reading_duration_ns: estimated,
            average_seek_duration_ns: average_seek_ns(
                measured_ns,
                estimated,
                u64::from(seek_count),
            ),
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::clock::SteppingClock;
    use crate::io::device::probe;
    use crate::io::simulated::SimulatedDevice;
    use crate::ErrorKind;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn device_with_blocks(blocks: u64) -> SimulatedDevice {
        SimulatedDevice::new(blocks * 512, 512)
    }

    #[test]
    fn test_average_seek_underflow_guard() {
        assert_eq!(average_seek_ns(500_000, 600_000, 10), 0);
        assert_eq!(average_seek_ns(600_000, 600_000, 10), 0);
        assert_eq!(average_seek_ns(1_000_000, 400_000, 10), 60_000);
        assert_eq!(average_seek_ns(1_000_000, 0, 0), 0);
    }

    #[test]
    fn test_average_seek_never_underflows() {
        for measured in (0..5_000_000u64).step_by(250_001) {
            for estimated in (0..5_000_000u64).step_by(333_333) {
                for count in 1..5u64 {
                    let avg = average_seek_ns(measured, estimated, count);
                    if measured <= estimated {
                        assert_eq!(avg, 0);
                    } else {
                        assert_eq!(avg, (measured - estimated) / count);
                    }
                }
            }
        }
    }

    #[test]
    fn test_fixed_count() {
        let mut device = device_with_blocks(1000);
        let info = probe(&device).unwrap();
        let clock = SteppingClock::new(1_000_000);
        let progress = ProgressSender::silent();
        let mut rng = SmallRng::seed_from_u64(7);

        let bench = RandomSeekBenchmark::new(&info, &clock, &progress, 1_000);
        let result = bench.run(&mut device, &mut rng, Some(100)).unwrap();

        assert_eq!(device.reads().len(), 100);
        for read in device.reads() {
            assert_eq!(read.len, 512);
            assert_eq!(read.offset % 512, 0);
            assert!(read.offset < 1000 * 512);
        }
        assert_eq!(result.seek_count, 100);
        assert_eq!(result.total_random_access_duration_ns, 1_000_000);
        assert_eq!(result.estimated_reading_duration_ns, 100_000);
        assert_eq!(result.average_seek_duration_ns, 9_000);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_estimate_larger_than_measurement() {
        let mut device = device_with_blocks(1000);
        let info = probe(&device).unwrap();
        let clock = SteppingClock::new(500_000);
        let progress = ProgressSender::silent();
        let mut rng = SmallRng::seed_from_u64(1);

        let bench = RandomSeekBenchmark::new(&info, &clock, &progress, 60_000);
        let result = bench.run(&mut device, &mut rng, Some(10)).unwrap();

        assert_eq!(result.total_random_access_duration_ns, 500_000);
        assert_eq!(result.estimated_reading_duration_ns, 600_000);
        assert_eq!(result.average_seek_duration_ns, 0);
    }

    #[test]
    fn test_autodetect_bounded_by_max_count() {
        let mut device = device_with_blocks(1000);
        let info = probe(&device).unwrap();
        let clock = SteppingClock::new(1_000);
        let progress = ProgressSender::silent();
        let mut rng = SmallRng::seed_from_u64(3);

        let bench = RandomSeekBenchmark::new(&info, &clock, &progress, 0);
        let result = bench.run(&mut device, &mut rng, None).unwrap();

        // 200, 400, ..., 25600
        assert_eq!(result.iterations, 8);
        assert_eq!(result.seek_count, 51_000);
        assert_eq!(device.reads().len(), 51_000);
        assert_eq!(result.total_random_access_duration_ns, 8_000);
        assert_eq!(result.average_seek_duration_ns, 0);
    }

    #[test]
    fn test_autodetect_stops_at_min_duration() {
        let mut device = device_with_blocks(1000);
        let info = probe(&device).unwrap();
        let clock = SteppingClock::new(600_000_000);
        let progress = ProgressSender::silent();
        let mut rng = SmallRng::seed_from_u64(3);

        let bench = RandomSeekBenchmark::new(&info, &clock, &progress, 100);
        let result = bench.run(&mut device, &mut rng, Some(0)).unwrap();

        assert_eq!(result.iterations, 2);
        assert_eq!(result.seek_count, 600);
        assert_eq!(result.total_random_access_duration_ns, 1_200_000_000);
        assert_eq!(result.estimated_reading_duration_ns, 60_000);
        assert_eq!(
            result.average_seek_duration_ns,
            (1_200_000_000 - 60_000) / 600
        );
    }

    #[test]
    fn test_autodetect_custom_tuning() {
        let mut device = device_with_blocks(64);
        let info = probe(&device).unwrap();
        let clock = SteppingClock::new(10);
        let progress = ProgressSender::silent();
        let mut rng = SmallRng::seed_from_u64(11);

        let tuning = SeekTuning {
            initial_count: 5,
            max_count: 20,
            min_duration: Duration::from_secs(1),
        };
        let bench = RandomSeekBenchmark::new(&info, &clock, &progress, 0).with_tuning(tuning);
        let result = bench.run(&mut device, &mut rng, None).unwrap();

        assert_eq!(result.iterations, 3);
        assert_eq!(result.seek_count, 35);
    }

    #[test]
    fn test_same_seed_same_offsets() {
        let info = probe(&device_with_blocks(1_000_000)).unwrap();
        let mut a = SmallRng::seed_from_u64(99);
        let mut b = SmallRng::seed_from_u64(99);

        for _ in 0..100 {
            assert_eq!(
                random_block_offset(&mut a, &info),
                random_block_offset(&mut b, &info)
            );
        }
    }

    #[test]
    fn test_random_index_is_uniform_across_seeds() {
        let info = probe(&device_with_blocks(1000)).unwrap();
        let mut buckets = [0u32; 10];
        let runs = 20_000u64;

        for seed in 0..runs {
            let mut rng = SmallRng::seed_from_u64(seed);
            let index = random_block_offset(&mut rng, &info) / 512;
            assert!(index < 1000);
            buckets[(index / 100) as usize] += 1;
        }

        // Expected 2000 per bucket, standard deviation about 42
        for count in buckets {
            assert!((1700..=2300).contains(&count), "bucket count {}", count);
        }
    }

    #[test]
    fn test_read_failure_aborts() {
        let mut device = device_with_blocks(1000).fail_after(5);
        let info = probe(&device).unwrap();
        let clock = SteppingClock::new(1_000);
        let progress = ProgressSender::silent();
        let mut rng = SmallRng::seed_from_u64(5);

        let bench = RandomSeekBenchmark::new(&info, &clock, &progress, 0);
        let err = bench.run(&mut device, &mut rng, Some(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(device.reads().len(), 5);
    }
}
