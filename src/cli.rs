//! Command-line front end
//!
//! Parses arguments, runs the measurement on a blocking thread and renders
//! its progress announcements while it works.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use tokio::sync::mpsc;

use crate::bench::progress::{ProgressSender, ProgressUpdate};
use crate::bench::runner::run_benchmarks;
use crate::config::{BenchmarkConfig, TuningFile};
use crate::models::Report;
use crate::report::{render_json, render_text};
use crate::util::units::parse_size;
use crate::{BlkBenchError, Result};

const AFTER_HELP: &str = "\
The SIZE value can be suffixed with an optional unit: KiB, MiB, GiB, TiB,
PiB, EiB (powers of 1024), or KB, MB, GB, TB, PB, EB (powers of 1000).
K, M, G, T, P, E are also accepted, as powers of 1024.

All tests are read-only; any data on the device is left untouched.";

#[derive(Debug, Clone, Parser)]
#[command(name = "blkbench", version)]
#[command(about = "Measure sequential read speed and seek time of a block device")]
#[command(after_help = AFTER_HELP)]
pub struct Args {
    /// Block device to test, such as /dev/sda
    pub device: PathBuf,

    /// Do N random reads in the seek test (default: autodetect)
    #[arg(short = 'c', long = "read-count", value_name = "N",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub read_count: Option<u32>,

    /// Size of read blocks in the sequential test (default: autodetect)
    #[arg(short = 's', long = "read-size", value_name = "SIZE", value_parser = parse_read_size)]
    pub read_size: Option<u64>,

    /// Seed for the random read offsets (default: current time)
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Tuning file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not show progress messages
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show debug diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Default log filter; `RUST_LOG` can still override it
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Error
        } else {
            LevelFilter::Warn
        }
    }

    /// Merge the arguments with the tuning file into a run configuration
    pub fn to_config(&self) -> Result<BenchmarkConfig> {
        let tuning = TuningFile::load(self.config.as_deref())?;

        let mut config = BenchmarkConfig::new(self.device.clone()).with_tuning(tuning);
        config.seek_count = self.read_count;
        config.read_size = self.read_size;
        config.seed = self.seed;
        Ok(config)
    }
}

/// `--read-size` values: a human size of at least one byte
fn parse_read_size(input: &str) -> std::result::Result<u64, String> {
    match parse_size(input) {
        Ok(0) | Err(_) => Err(format!(
            "invalid read block size given (1..{} bytes)",
            usize::MAX
        )),
        Ok(size) => Ok(size),
    }
}

/// Run the benchmarks for `config` on a blocking thread. Progress is shown
/// with a spinner on stderr unless `show_progress` is false.
pub async fn measure(config: BenchmarkConfig, show_progress: bool) -> Result<Report> {
    let (tx, mut rx) = mpsc::channel::<ProgressUpdate>(16);

    let spinner = if show_progress {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    let ui = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            if !matches!(update, ProgressUpdate::Probed(_)) {
                spinner.println(update.message());
            }
            spinner.set_message(update.message());
        }
        spinner.finish_and_clear();
    });

    let outcome =
        tokio::task::spawn_blocking(move || run_benchmarks(&config, ProgressSender::new(tx)))
            .await;
    ui.await.ok();

    outcome.map_err(|e| {
        BlkBenchError::io(
            "Benchmark thread failed",
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        )
    })?
}

/// Everything the binary does: configure, measure, render
pub async fn run(args: &Args) -> Result<String> {
    let config = args.to_config()?;
    config.validate()?;

    let report = measure(config, !args.quiet).await?;

    if args.json {
        render_json(&report)
    } else {
        Ok(render_text(&report))
    }
}
