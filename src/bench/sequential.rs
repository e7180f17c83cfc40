//! Sequential read benchmark
//!
//! Estimates the average time to read one physical block by timing large
//! aligned reads at the logical start and end of the device.

use log::debug;

use crate::bench::progress::{ProgressSender, ProgressUpdate};
use crate::config::SequentialTuning;
use crate::io::buffer::{align_ceil, align_floor, AlignedBuffer};
use crate::io::clock::{elapsed_ns, Clock};
use crate::io::device::BlockDevice;
use crate::models::{BlockDeviceInfo, SequentialReadResult};
use crate::{BlkBenchError, Result};

/// Average time per physical block for `bytes` read in `elapsed` ns. Reads
/// shorter than one block count as one block.
pub fn block_read_ns(elapsed: u64, bytes: u64, physical_block_size: u32) -> u64 {
    let blocks = bytes / u64::from(physical_block_size.max(1));
    elapsed / blocks.max(1)
}

/// Sequential read benchmark executor
pub struct SequentialReadBenchmark<'a> {
    info: &'a BlockDeviceInfo,
    clock: &'a dyn Clock,
    progress: &'a ProgressSender,
    tuning: SequentialTuning,
}

impl<'a> SequentialReadBenchmark<'a> {
    pub fn new(
        info: &'a BlockDeviceInfo,
        clock: &'a dyn Clock,
        progress: &'a ProgressSender,
    ) -> Self {
        Self {
            info,
            clock,
            progress,
            tuning: SequentialTuning::default(),
        }
    }

    pub fn with_tuning(mut self, tuning: SequentialTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Measure with `read_size` bytes per read, or autodetect a read size
    /// when it is `None` or zero
    pub fn run(
        &self,
        device: &mut dyn BlockDevice,
        read_size: Option<u64>,
    ) -> Result<SequentialReadResult> {
        match read_size.filter(|&size| size != 0) {
            Some(size) => self.measure_fixed(device, size),
            None => self.autodetect(device),
        }
    }

    /// The read size actually used for a requested size: rounded up to the
    /// required alignment, then clamped to the largest aligned length the
    /// device holds. A device smaller than one alignment unit is read whole.
    pub fn aligned_read_size(&self, read_size: u64) -> Result<u64> {
        let alignment = self.alignment();
        let aligned = align_ceil(read_size, alignment).ok_or_else(|| {
            BlkBenchError::ConfigError(format!(
                "Read size too large: {} bytes cannot be aligned to {} bytes",
                read_size, alignment
            ))
        })?;

        let device_size = self.info.device_size_bytes;
        let limit = match align_floor(device_size, alignment) {
            0 => device_size,
            limit => limit,
        };
        Ok(aligned.min(limit))
    }

    /// Offset of the read at the logical end of the device, rounded down to
    /// the required alignment
    pub fn end_offset(&self, aligned_size: u64) -> u64 {
        align_floor(self.info.device_size_bytes - aligned_size, self.alignment())
    }

    fn alignment(&self) -> u64 {
        (self.info.required_alignment as u64).max(1)
    }

    /// Two reads of one aligned size, at offset 0 and at the end of the
    /// device, timed together
    pub fn measure_fixed(
        &self,
        device: &mut dyn BlockDevice,
        read_size: u64,
    ) -> Result<SequentialReadResult> {
        let aligned_size = self.aligned_read_size(read_size)?;
        let buffer_len = usize::try_from(aligned_size).map_err(|_| {
            BlkBenchError::ResourceError(format!(
                "Read size of {} bytes does not fit in memory",
                aligned_size
            ))
        })?;
        let total_bytes = aligned_size * 2;

        self.progress
            .send(ProgressUpdate::SequentialRead { total_bytes });

        let elapsed = {
            let mut buffer = AlignedBuffer::allocate(self.info.required_alignment, buffer_len)?;
            let end_offset = self.end_offset(aligned_size);

            let start = self.clock.now()?;
            device.read_at(buffer.as_mut_slice(), 0)?;
            device.read_at(buffer.as_mut_slice(), end_offset)?;
            let end = self.clock.now()?;

            elapsed_ns(start, end)
        };

        Ok(SequentialReadResult {
            bytes_read: total_bytes,
            duration_ns: elapsed,
            block_read_duration_ns: block_read_ns(
                elapsed,
                total_bytes,
                self.info.physical_block_size,
            ),
            iterations: 1,
        })
    }

    /// Repeat [`measure_fixed`](Self::measure_fixed) with doubling read sizes
    /// until enough time has been spent reading or the size ceiling is
    /// reached, then average over every probe taken
    pub fn autodetect(&self, device: &mut dyn BlockDevice) -> Result<SequentialReadResult> {
        let min_ns = self.tuning.min_duration.as_nanos().min(u128::from(u64::MAX)) as u64;
        let mut read_size = self.tuning.initial_read_size;
        let mut total_bytes = 0u64;
        let mut total_ns = 0u64;
        let mut iterations = 0u32;

        while total_ns < min_ns && read_size <= self.tuning.max_read_size {
            let probe = self.measure_fixed(device, read_size)?;
            total_bytes += probe.bytes_read;
            total_ns += probe.duration_ns;
            iterations += 1;

            debug!(
                "Sequential probe {}: {} bytes in {} ns (totals: {} bytes, {} ns)",
                iterations, probe.bytes_read, probe.duration_ns, total_bytes, total_ns
            );

            read_size = match read_size.checked_mul(2) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(SequentialReadResult {
            bytes_read: total_bytes,
            duration_ns: total_ns,
            block_read_duration_ns: block_read_ns(
                total_ns,
                total_bytes,
                self.info.physical_block_size,
            ),
            iterations,
        })
    }
}
