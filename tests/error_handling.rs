use blkbench::bench::{run_benchmarks, BenchmarkOrchestrator, ProgressSender};
use blkbench::cli::Args;
use blkbench::config::BenchmarkConfig;
use blkbench::io::{SimulatedDevice, SteppingClock};
use blkbench::{error, BlkBenchError, ErrorKind};
use clap::Parser;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_missing_device_is_io_error() {
    let config = BenchmarkConfig::new("/nonexistent/blkbench-test-device");
    let err = run_benchmarks(&config, ProgressSender::silent()).expect_err("open should fail");

    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(error::exit_code(&err), 1);
    assert!(err.to_string().contains("/nonexistent/blkbench-test-device"));
}

#[test]
fn test_regular_file_is_rejected() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(&[0u8; 8192]).expect("write temp file");
    file.flush().expect("flush temp file");

    let config = BenchmarkConfig::new(file.path()).with_seek_count(1);
    let err = run_benchmarks(&config, ProgressSender::silent())
        .expect_err("a regular file is not a block device");

    // tmpfs refuses O_DIRECT at open; other filesystems refuse the ioctls
    assert!(
        matches!(err.kind(), ErrorKind::Io | ErrorKind::Capability),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_config_error_exit_code() {
    let mut config = BenchmarkConfig::new("/dev/sim");
    config.sequential.max_read_size = 1024;
    let clock = SteppingClock::new(1);
    let mut device = SimulatedDevice::new(1 << 20, 512);

    let err = BenchmarkOrchestrator::new(&config, &clock)
        .run(&mut device)
        .expect_err("initial read size above the maximum");
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(error::exit_code(&err), 2);
}

#[test]
fn test_huge_read_size_is_config_error() {
    let args = Args::try_parse_from(["blkbench", "-s", "18446744073709551615", "/dev/sim"])
        .expect("any nonzero size parses");
    assert_eq!(args.read_size, Some(u64::MAX));

    let config = BenchmarkConfig::new(args.device.clone())
        .with_read_size(u64::MAX)
        .with_seek_count(1)
        .with_seed(0);
    config.validate().expect("fits in usize on 64-bit targets");

    let clock = SteppingClock::new(1_000);
    let mut device = SimulatedDevice::new(1 << 20, 512).with_alignment(Some(4096));
    let err = BenchmarkOrchestrator::new(&config, &clock)
        .run(&mut device)
        .expect_err("read size cannot be aligned");

    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(error::exit_code(&err), 2);
    assert!(device.reads().is_empty());
}

#[test]
fn test_mid_run_read_failure_propagates() {
    let config = BenchmarkConfig::new("/dev/sim")
        .with_read_size(4096)
        .with_seek_count(100)
        .with_seed(0);
    let clock = SteppingClock::new(1_000);
    let mut device = SimulatedDevice::new(1 << 20, 512).fail_after(20);

    let err = BenchmarkOrchestrator::new(&config, &clock)
        .run(&mut device)
        .expect_err("reads fail after 20");
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(error::user_friendly_message(&err).contains("simulated media error"));
}

#[test]
fn test_user_friendly_messages() {
    let denied = BlkBenchError::io(
        "open /dev/sda",
        std::io::Error::from(std::io::ErrorKind::PermissionDenied),
    );
    assert!(error::user_friendly_message(&denied).contains("root privileges"));

    let not_block = BlkBenchError::CapabilityError("ioctl(BLKGETSIZE64) on /tmp/x".into());
    assert!(error::user_friendly_message(&not_block).contains("/dev/sda"));

    let clock = BlkBenchError::ClockError(std::io::Error::from(std::io::ErrorKind::Other));
    assert_eq!(error::user_friendly_message(&clock), clock.to_string());
}
