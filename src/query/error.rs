//! Query error types
//!
//! Provides structured error handling for request validation, planning and
//! the fetch phase of a query batch. Regularization and consolidation never
//! fail: gaps travel through the pipeline as missing values instead.

use std::fmt;

use crate::types::Timestamp;

/// Query error with context
#[derive(Debug)]
pub struct QueryError {
    /// Error kind for programmatic handling
    pub kind: QueryErrorKind,
    /// Human-readable message
    pub message: String,
    /// Optional source error
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    /// Create a new query error
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add source error for error chaining
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Window is empty or reversed (`to <= from`)
    pub fn invalid_window(from: Timestamp, to: Timestamp) -> Self {
        Self::new(
            QueryErrorKind::InvalidWindow,
            format!("to ({}) must be greater than from ({})", to, from),
        )
    }

    /// Point budget is malformed
    pub fn invalid_budget(min_points: u32, max_points: u32) -> Self {
        Self::new(
            QueryErrorKind::InvalidBudget,
            format!(
                "invalid point budget: min {} max {} (max must be >= 1 and >= min)",
                min_points, max_points
            ),
        )
    }

    /// Raw interval of a series is zero
    pub fn invalid_interval(key: &str) -> Self {
        Self::new(
            QueryErrorKind::InvalidInterval,
            format!("series '{}' has a raw interval of 0", key),
        )
    }

    /// The fetch collaborator could not provide data for a series
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::InsufficientData, message)
    }

    /// Whether this error was caused by caller input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind,
            QueryErrorKind::InvalidWindow
                | QueryErrorKind::InvalidBudget
                | QueryErrorKind::InvalidInterval
        )
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Categories of query errors for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Request window has `to <= from`
    InvalidWindow,
    /// Point budget has `max < 1` or `min > max`
    InvalidBudget,
    /// Series has a zero raw interval
    InvalidInterval,
    /// Storage could not serve the points of a series
    InsufficientData,
    /// Internal error (bug, unexpected state)
    Internal,
}

impl QueryErrorKind {
    /// Label used in metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryErrorKind::InvalidWindow => "invalid_window",
            QueryErrorKind::InvalidBudget => "invalid_budget",
            QueryErrorKind::InvalidInterval => "invalid_interval",
            QueryErrorKind::InsufficientData => "insufficient_data",
            QueryErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::InvalidWindow => write!(f, "InvalidWindow"),
            QueryErrorKind::InvalidBudget => write!(f, "InvalidBudget"),
            QueryErrorKind::InvalidInterval => write!(f, "InvalidInterval"),
            QueryErrorKind::InsufficientData => write!(f, "InsufficientData"),
            QueryErrorKind::Internal => write!(f, "Internal"),
        }
    }
}

/// Result type alias for query operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;
