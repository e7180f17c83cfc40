//! Progress notifications from the measurement thread
//!
//! The benchmarks run on a blocking thread and announce what they are about
//! to measure over a tokio channel; the CLI renders the announcements.

use tokio::sync::mpsc;

use crate::models::BlockDeviceInfo;
use crate::util::units::format_bytes;

/// Announcement of the next measurement step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// Device capabilities were probed
    Probed(BlockDeviceInfo),
    /// A sequential probe reading `total_bytes` is about to start
    SequentialRead { total_bytes: u64 },
    /// A random access probe of `count` reads is about to start
    RandomReads { count: u32 },
}

impl ProgressUpdate {
    /// Human-readable description of the step
    pub fn message(&self) -> String {
        match self {
            ProgressUpdate::Probed(info) => format!(
                "Device has {} blocks of {} bytes",
                info.block_count, info.physical_block_size
            ),
            ProgressUpdate::SequentialRead { total_bytes } => format!(
                "Reading {} to determine sequential read time, please wait...",
                format_bytes(*total_bytes)
            ),
            ProgressUpdate::RandomReads { count } => format!(
                "Performing {} random reads, please wait a few seconds...",
                count
            ),
        }
    }
}

/// Sending half used by the benchmarks. A silent sender drops every update.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    tx: Option<mpsc::Sender<ProgressUpdate>>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn silent() -> Self {
        Self { tx: None }
    }

    /// Deliver an update, blocking until the channel has room. Must not be
    /// called from inside an async context.
    pub fn send(&self, update: ProgressUpdate) {
        log::info!("{}", update.message());
        if let Some(tx) = &self.tx {
            // A closed receiver only means nobody is watching.
            let _ = tx.blocking_send(update);
        }
    }
}
