//! Configuration for emberkv
//!
//! One explicit value, built once and handed to the engine. Nothing here is
//! global; two engines in the same process can run with different settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EmberError, Result};
use crate::record::{MAX_HEADER_SIZE, MIN_HEADER_SIZE};

/// Main configuration for an emberkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── active.log       (append-only record log)
    pub data_dir: PathBuf,

    /// Size of every record header in bytes. Fixed for the life of a log file;
    /// reopening a log with a different value makes every record unreadable.
    pub header_size: u32,

    // -------------------------------------------------------------------------
    // Flush Policy
    // -------------------------------------------------------------------------
    /// Flush the write buffer once it holds at least this many bytes
    pub batch_size: usize,

    /// Flush the write buffer once this many seconds passed since the last flush
    pub sync_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./emberkv_data"),
            header_size: MIN_HEADER_SIZE,
            batch_size: 4 * 1024, // 4 KB
            sync_interval_secs: 5,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Sync interval as a [`Duration`]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Check the settings before anything touches the disk
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(EmberError::Config("data_dir must not be empty".to_string()));
        }
        if self.header_size < MIN_HEADER_SIZE || self.header_size > MAX_HEADER_SIZE {
            return Err(EmberError::Config(format!(
                "header_size must be between {} and {} bytes, got {}",
                MIN_HEADER_SIZE, MAX_HEADER_SIZE, self.header_size
            )));
        }
        if self.batch_size == 0 {
            return Err(EmberError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the record header size (in bytes)
    pub fn header_size(mut self, size: u32) -> Self {
        self.config.header_size = size;
        self
    }

    /// Set the buffered-bytes flush threshold
    pub fn batch_size(mut self, bytes: usize) -> Self {
        self.config.batch_size = bytes;
        self
    }

    /// Set the time-based flush threshold (in seconds)
    pub fn sync_interval_secs(mut self, secs: u64) -> Self {
        self.config.sync_interval_secs = secs;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
