//! Staging engine configuration
//!
//! The core recognizes only two externally supplied options: the sample rate
//! used for all time math, and the chunk size used for silence materialization
//! and backpressure granularity. The underrun watchdog interval is derived
//! from the two (one chunk's playback duration).

use crate::timing::BYTES_PER_SAMPLE;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default sample rate (samples/sec)
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default silence/backpressure chunk size in bytes
pub const DEFAULT_CHUNK_BYTES: usize = 8192;

/// Configuration for a staging queue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagerConfig {
    /// Sample rate used for all time math (samples/sec)
    pub sample_rate: u32,

    /// Silence materialization and backpressure granularity (bytes)
    pub chunk_bytes: usize,
}

impl Default for StagerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

impl StagerConfig {
    /// Create a configuration, validating the supplied values
    pub fn new(sample_rate: u32, chunk_bytes: usize) -> Result<Self> {
        let config = Self {
            sample_rate,
            chunk_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be non-zero".to_string()));
        }
        if self.chunk_bytes == 0 {
            return Err(Error::Config("chunk_bytes must be non-zero".to_string()));
        }
        if self.chunk_bytes % BYTES_PER_SAMPLE as usize != 0 {
            return Err(Error::Config(format!(
                "chunk_bytes must be a multiple of the sample size ({} bytes)",
                BYTES_PER_SAMPLE
            )));
        }
        Ok(())
    }

    /// Bytes per sample (mono 16-bit PCM)
    pub fn bytes_per_sample(&self) -> usize {
        BYTES_PER_SAMPLE as usize
    }

    /// Playback duration of one chunk in seconds
    pub fn chunk_seconds(&self) -> f64 {
        self.chunk_bytes as f64 / BYTES_PER_SAMPLE as f64 / self.sample_rate as f64
    }

    /// Underrun watchdog interval: one chunk's playback duration
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_seconds())
    }
}
