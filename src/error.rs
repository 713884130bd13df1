//! Error types for nodestore
//!
//! Provides a unified error type for all storage operations.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for table and value store operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Unexpected State
    // -------------------------------------------------------------------------
    /// A key that no indexed block covers. Either the caller passed an
    /// out-of-range key or the index is out of sync with the data file.
    #[error("Data access out of bounds: key {key}, size {size}")]
    OutOfBounds { key: usize, size: usize },

    #[error("Corrupt storage: {0}")]
    Corrupt(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
