//! Configuration for nodestore
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, StoreError};

/// Main configuration shared by the table store and the value store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Size of a physical block in the table data file (bytes)
    pub block_size: usize,

    /// Record size as a power of two (4 => 16-byte records)
    pub record_power: u32,

    /// Number of block buffers kept in memory per table
    pub buffers: usize,

    /// Fraction of a freshly allocated block that a splitting insert fills.
    /// Values below 1.0 leave room for later in-place inserts.
    pub fill_factor: f64,

    // -------------------------------------------------------------------------
    // Value Store Configuration
    // -------------------------------------------------------------------------
    /// Size of the value store's sliding window (bytes)
    pub window_size: usize,

    // -------------------------------------------------------------------------
    // Access Mode
    // -------------------------------------------------------------------------
    /// Open files read-only; every mutating call fails with `Unsupported`
    pub read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: 4096,
            record_power: 4,
            buffers: 4,
            fill_factor: 1.0,
            window_size: 4096,
            read_only: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Record size in bytes
    pub fn record_size(&self) -> usize {
        1 << self.record_power
    }

    /// Number of records that fit in one block
    pub fn records_per_block(&self) -> usize {
        self.block_size >> self.record_power
    }

    /// Number of records a splitting insert writes into a new block
    pub fn fill_records(&self) -> usize {
        let fill = (self.records_per_block() as f64 * self.fill_factor).floor() as usize;
        fill.clamp(1, self.records_per_block())
    }

    /// Check that the settings describe a usable layout
    pub fn validate(&self) -> Result<()> {
        if self.record_power > 16 {
            return Err(StoreError::Config(format!(
                "record power {} is too large",
                self.record_power
            )));
        }
        let record_size = self.record_size();
        if self.block_size < record_size || self.block_size % record_size != 0 {
            return Err(StoreError::Config(format!(
                "block size {} is not a positive multiple of the record size {}",
                self.block_size, record_size
            )));
        }
        if self.buffers == 0 {
            return Err(StoreError::Config("at least one buffer is required".to_string()));
        }
        if !(self.fill_factor > 0.0 && self.fill_factor <= 1.0) {
            return Err(StoreError::Config(format!(
                "fill factor {} is outside (0, 1]",
                self.fill_factor
            )));
        }
        if self.window_size == 0 {
            return Err(StoreError::Config("window size must not be zero".to_string()));
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
    /// Set the block size (in bytes)
    pub fn block_size(mut self, bytes: usize) -> Self {
        self.config.block_size = bytes;
        self
    }

    /// Set the record size as a power of two
    pub fn record_power(mut self, power: u32) -> Self {
        self.config.record_power = power;
        self
    }

    /// Set the number of block buffers
    pub fn buffers(mut self, count: usize) -> Self {
        self.config.buffers = count;
        self
    }

    /// Set the fill factor for blocks created by splitting inserts
    pub fn fill_factor(mut self, factor: f64) -> Self {
        self.config.fill_factor = factor;
        self
    }

    /// Set the value store window size (in bytes)
    pub fn window_size(mut self, bytes: usize) -> Self {
        self.config.window_size = bytes;
        self
    }

    /// Open stores read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
