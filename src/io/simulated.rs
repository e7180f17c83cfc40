//! In-memory stand-in for a block device.
//!
//! Reads return zeroes and are recorded so callers can check which offsets
//! and lengths a benchmark actually requested.

use std::io;

use crate::io::device::BlockDevice;
use crate::{BlkBenchError, Result};

/// One recorded read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRecord {
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    size_bytes: u64,
    physical_block_size: u32,
    alignment: Option<usize>,
    fail_after: Option<usize>,
    reads: Vec<ReadRecord>,
}

impl SimulatedDevice {
    /// A device of `size_bytes` with no alignment recommendation
    pub fn new(size_bytes: u64, physical_block_size: u32) -> Self {
        Self {
            size_bytes,
            physical_block_size,
            alignment: None,
            fail_after: None,
            reads: Vec::new(),
        }
    }

    pub fn with_alignment(mut self, alignment: Option<usize>) -> Self {
        self.alignment = alignment;
        self
    }

    /// Make every read after the first `reads` successful ones fail
    pub fn fail_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }

    pub fn reads(&self) -> &[ReadRecord] {
        &self.reads
    }
}

impl BlockDevice for SimulatedDevice {
    fn physical_block_size(&self) -> Result<u32> {
        Ok(self.physical_block_size)
    }

    fn size_bytes(&self) -> Result<u64> {
        Ok(self.size_bytes)
    }

    fn recommended_alignment(&self) -> Result<Option<usize>> {
        Ok(self.alignment)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.reads.len() >= limit) {
            return Err(BlkBenchError::io(
                format!("read at {}", offset),
                io::Error::new(io::ErrorKind::Other, "simulated media error"),
            ));
        }

        let end = offset.checked_add(buf.len() as u64);
        if end.map_or(true, |end| end > self.size_bytes) {
            return Err(BlkBenchError::io(
                format!("read of {} bytes at {}", buf.len(), offset),
                io::Error::from(io::ErrorKind::UnexpectedEof),
            ));
        }

        buf.fill(0);
        self.reads.push(ReadRecord {
            offset,
            len: buf.len(),
        });
        Ok(())
    }
}
