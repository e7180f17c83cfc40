//! blkbench - block device read benchmark
//!
//! Measures sustained sequential read throughput and average seek latency of
//! a block device using direct, uncached reads timed against a monotonic raw
//! clock. Runs once, prints a report, exits.

use std::fmt;

pub mod bench;
pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod report;
pub mod util;

/// Every fatal condition the benchmark can run into
#[derive(Debug)]
pub enum BlkBenchError {
    /// Invalid or out-of-range configuration, detected before any I/O
    ConfigError(String),
    /// A device capability query failed, or the device is unusable
    CapabilityError(String),
    /// Opening, seeking or reading the device failed
    IoError {
        context: String,
        source: std::io::Error,
    },
    /// Aligned buffer allocation failed
    ResourceError(String),
    /// The monotonic time source could not be read
    ClockError(std::io::Error),
}

/// Coarse classification of [`BlkBenchError`], mostly useful in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Capability,
    Io,
    Resource,
    Clock,
}

impl BlkBenchError {
    /// Wrap an I/O error with a short description of what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BlkBenchError::IoError {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BlkBenchError::ConfigError(_) => ErrorKind::Config,
            BlkBenchError::CapabilityError(_) => ErrorKind::Capability,
            BlkBenchError::IoError { .. } => ErrorKind::Io,
            BlkBenchError::ResourceError(_) => ErrorKind::Resource,
            BlkBenchError::ClockError(_) => ErrorKind::Clock,
        }
    }
}

impl fmt::Display for BlkBenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlkBenchError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            BlkBenchError::CapabilityError(msg) => write!(f, "Device capability error: {}", msg),
            BlkBenchError::IoError { context, source } => write!(f, "{}: {}", context, source),
            BlkBenchError::ResourceError(msg) => write!(f, "Resource error: {}", msg),
            BlkBenchError::ClockError(err) => write!(f, "Clock error: {}", err),
        }
    }
}

impl std::error::Error for BlkBenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlkBenchError::IoError { source, .. } => Some(source),
            BlkBenchError::ClockError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BlkBenchError {
    fn from(err: std::io::Error) -> Self {
        BlkBenchError::io("I/O error", err)
    }
}

impl From<serde_json::Error> for BlkBenchError {
    fn from(err: serde_json::Error) -> Self {
        BlkBenchError::ConfigError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for BlkBenchError {
    fn from(err: toml::de::Error) -> Self {
        BlkBenchError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

/// Result type alias for blkbench operations
pub type Result<T> = std::result::Result<T, BlkBenchError>;

/// Error reporting helpers for the top-level handler
pub mod error {
    use super::{BlkBenchError, ErrorKind};

    /// Process exit status for a fatal error. Configuration mistakes use the
    /// conventional usage-error status.
    pub fn exit_code(error: &BlkBenchError) -> i32 {
        match error.kind() {
            ErrorKind::Config => 2,
            _ => 1,
        }
    }

    /// Convert error to a message with a hint where one is known to help
    pub fn user_friendly_message(error: &BlkBenchError) -> String {
        match error {
            BlkBenchError::IoError { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                format!(
                    "{}. Reading a raw block device usually requires root privileges.",
                    error
                )
            }
            BlkBenchError::IoError { source, .. }
                if source.raw_os_error() == Some(libc_einval()) =>
            {
                format!(
                    "{}. The device or filesystem may not support direct (O_DIRECT) I/O.",
                    error
                )
            }
            BlkBenchError::CapabilityError(msg) if msg.contains("ioctl") => format!(
                "{}. Pass a block device such as /dev/sda, not a regular file.",
                error
            ),
            _ => error.to_string(),
        }
    }

    #[cfg(unix)]
    fn libc_einval() -> i32 {
        libc::EINVAL
    }

    #[cfg(not(unix))]
    fn libc_einval() -> i32 {
        22
    }
}

pub const APP_NAME: &str = "blkbench";
pub const CONFIG_FILE: &str = "blkbench.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_and_exit_codes() {
        let config = BlkBenchError::ConfigError("bad".into());
        assert_eq!(config.kind(), ErrorKind::Config);
        assert_eq!(error::exit_code(&config), 2);

        let io = BlkBenchError::io(
            "open /dev/null",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(io.kind(), ErrorKind::Io);
        assert_eq!(error::exit_code(&io), 1);
        assert!(io.to_string().starts_with("open /dev/null: "));
        assert!(std::error::Error::source(&io).is_some());
    }

    #[test]
    fn test_user_friendly_message_hints() {
        let denied = BlkBenchError::io(
            "open",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(error::user_friendly_message(&denied).contains("root"));

        let capability = BlkBenchError::CapabilityError("ioctl(BLKPBSZGET): bad".into());
        assert!(error::user_friendly_message(&capability).contains("block device"));

        let resource = BlkBenchError::ResourceError("oom".into());
        assert_eq!(error::user_friendly_message(&resource), resource.to_string());
    }
}
