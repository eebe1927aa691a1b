//! Error types for the query resolution core

use crate::query::error::QueryError;
use crate::types::Timestamp;
use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Planning or execution of a query batch failed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Storage errors
///
/// Raised by chunk writes and by point sources. Reads that simply find
/// less data than requested are not errors: short results are valid.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Point is not newer than the last point in the chunk
    #[error("Point must be newer than already added points: ts {ts}, last ts {last_ts}")]
    OutOfOrder {
        /// Timestamp of the rejected point
        ts: Timestamp,
        /// Last timestamp accepted by the chunk
        last_ts: Timestamp,
    },

    /// Chunk has been finished and accepts no more points
    #[error("Chunk starting at {t0} is closed")]
    ChunkClosed {
        /// Start of the closed chunk
        t0: Timestamp,
    },

    /// Tier index not known to the store
    #[error("Unknown tier: {0}")]
    UnknownTier(usize),

    /// Backend could not serve the read
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Validation errors
///
/// Error type for configuration validation
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value is out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name being validated
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Invalid format
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat {
        /// Field name being validated
        field: String,
        /// Description of the format error
        message: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    Failed(String),
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::OutOfOrder { ts: 10, last_ts: 20 };
        let display = err.to_string();
        assert!(display.contains("ts 10"));
        assert!(display.contains("last ts 20"));
    }

    #[test]
    fn test_validation_error_converts_to_configuration() {
        let err: Error = ValidationError::Failed("tiers not ascending".into()).into();
        match err {
            Error::Configuration(msg) => assert!(msg.contains("tiers not ascending")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_query_error_wraps() {
        let err: Error = QueryError::invalid_window(20, 10).into();
        assert!(err.to_string().contains("InvalidWindow"));
    }
}
