//! Configuration management module
//!
//! Run parameters for one benchmark, the autodetection tuning knobs, and the
//! optional TOML file the tuning can be loaded from.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BlkBenchError, Result, APP_NAME, CONFIG_FILE};

const MIB: u64 = 1024 * 1024;

/// Autodetection bounds for the sequential read phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialTuning {
    /// Read size of the first probe
    pub initial_read_size: u64,
    /// No probe is started with a read size above this
    pub max_read_size: u64,
    /// Stop probing once this much time has been spent reading
    #[serde(with = "duration_serde")]
    pub min_duration: Duration,
}

impl Default for SequentialTuning {
    fn default() -> Self {
        Self {
            initial_read_size: 64 * MIB,
            max_read_size: 1024 * MIB,
            min_duration: Duration::from_secs(2),
        }
    }
}

/// Autodetection bounds for the random access phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekTuning {
    /// Seek count of the first probe
    pub initial_count: u32,
    /// No probe is started with a seek count above this
    pub max_count: u32,
    /// Stop probing once this much time has been spent seeking
    #[serde(with = "duration_serde")]
    pub min_duration: Duration,
}

impl Default for SeekTuning {
    fn default() -> Self {
        Self {
            initial_count: 200,
            max_count: 25_600,
            min_duration: Duration::from_secs(1),
        }
    }
}

/// Contents of `blkbench.toml`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningFile {
    pub sequential: SequentialTuning,
    pub seek: SeekTuning,
}

impl TuningFile {
    /// Load tuning from `path`, or from the standard location when `path` is
    /// `None`. A missing file at the standard location yields the defaults;
    /// an explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::config_file_path() {
                Ok(path) => (path, false),
                Err(_) => return Ok(Self::default()),
            },
        };

        if !config_path.exists() {
            if required {
                return Err(BlkBenchError::ConfigError(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            BlkBenchError::ConfigError(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            BlkBenchError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `$CONFIG_HOME/blkbench/blkbench.toml`
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            BlkBenchError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

/// Parameters of a single benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Block device to measure
    pub device: PathBuf,
    /// Random reads in the seek test; `None` or 0 autodetects
    pub seek_count: Option<u32>,
    /// Bytes per sequential read; `None` or 0 autodetects
    pub read_size: Option<u64>,
    /// Seed for the random offsets; `None` seeds from the wall clock
    pub seed: Option<u64>,
    pub sequential: SequentialTuning,
    pub seek: SeekTuning,
}

impl BenchmarkConfig {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            seek_count: None,
            read_size: None,
            seed: None,
            sequential: SequentialTuning::default(),
            seek: SeekTuning::default(),
        }
    }

    pub fn with_seek_count(mut self, count: u32) -> Self {
        self.seek_count = Some(count);
        self
    }

    pub fn with_read_size(mut self, size: u64) -> Self {
        self.read_size = Some(size);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_tuning(mut self, tuning: TuningFile) -> Self {
        self.sequential = tuning.sequential;
        self.seek = tuning.seek;
        self
    }

    /// Requested read size, `None` meaning autodetect
    pub fn requested_read_size(&self) -> Option<u64> {
        self.read_size.filter(|&size| size != 0)
    }

    /// Requested seek count, `None` meaning autodetect
    pub fn requested_seek_count(&self) -> Option<u32> {
        self.seek_count.filter(|&count| count != 0)
    }

    /// Check everything that can be checked before touching the device
    pub fn validate(&self) -> Result<()> {
        if self.device.as_os_str().is_empty() {
            return Err(BlkBenchError::ConfigError(
                "Device path must not be empty".to_string(),
            ));
        }

        if let Some(size) = self.requested_read_size() {
            if usize::try_from(size).is_err() {
                return Err(BlkBenchError::ConfigError(format!(
                    "Read size too large: {} bytes (max: {} bytes)",
                    size,
                    usize::MAX
                )));
            }
        }

        let sequential = &self.sequential;
        if sequential.initial_read_size == 0 {
            return Err(BlkBenchError::ConfigError(
                "Initial sequential read size must be greater than 0".to_string(),
            ));
        }
        if sequential.initial_read_size > sequential.max_read_size {
            return Err(BlkBenchError::ConfigError(format!(
                "Initial sequential read size ({}) exceeds the maximum ({})",
                sequential.initial_read_size, sequential.max_read_size
            )));
        }
        if usize::try_from(sequential.max_read_size).is_err() {
            return Err(BlkBenchError::ConfigError(format!(
                "Maximum sequential read size too large: {} bytes",
                sequential.max_read_size
            )));
        }
        if sequential.min_duration.is_zero() {
            return Err(BlkBenchError::ConfigError(
                "Minimum sequential read time must be greater than 0".to_string(),
            ));
        }

        let seek = &self.seek;
        if seek.initial_count == 0 {
            return Err(BlkBenchError::ConfigError(
                "Initial seek count must be greater than 0".to_string(),
            ));
        }
        if seek.initial_count > seek.max_count {
            return Err(BlkBenchError::ConfigError(format!(
                "Initial seek count ({}) exceeds the maximum ({})",
                seek.initial_count, seek.max_count
            )));
        }
        if seek.min_duration.is_zero() {
            return Err(BlkBenchError::ConfigError(
                "Minimum random access time must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Durations as human strings ("2s", "1500ms") in config files
mod duration_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(de::Error::custom)
    }
}
