//! Error types for emberkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for emberkv operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O failure on the log file, with the operation and offset involved
    #[error("log {op} failed at offset {offset}: {source}")]
    LogIo {
        op: &'static str,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("key not found: {0}")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Record Codec Errors
    // -------------------------------------------------------------------------
    #[error("record too short for header: got {actual} bytes, need {expected}")]
    ShortHeader { expected: usize, actual: usize },

    #[error("record too short for body: got {actual} bytes, need {expected}")]
    ShortBody { expected: usize, actual: usize },

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    // -------------------------------------------------------------------------
    // Recovery Errors
    // -------------------------------------------------------------------------
    /// A fully readable record failed to decode during replay
    #[error("recovery aborted at offset {offset}: {source}")]
    Recovery {
        offset: u64,
        #[source]
        source: Box<EmberError>,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

impl EmberError {
    /// True for errors that mean the bytes on disk cannot be trusted
    pub fn is_corruption(&self) -> bool {
        match self {
            EmberError::ChecksumMismatch { .. }
            | EmberError::ShortHeader { .. }
            | EmberError::ShortBody { .. }
            | EmberError::InvalidRecord(_) => true,
            EmberError::Recovery { source, .. } => source.is_corruption(),
            _ => false,
        }
    }
}
