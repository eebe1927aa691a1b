//! Kuba Rollup - query resolution core for a tiered time-series store
//!
//! This library decides where the points of a query come from and how they
//! are reshaped before they leave the store:
//! - Tier selection between raw samples and pre-aggregated rollups,
//!   minimising reads that have to go to durable storage
//! - Runtime consolidation onto an output interval shared by every series
//!   in a request batch
//! - Regularization of sparse or misaligned points onto an epoch-aligned grid
//! - Graphite-compatible consolidation functions and rounding

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Prometheus metrics and telemetry
pub mod metrics;

/// Consolidation functions, rounding and series transforms
pub mod aggregation;

/// Storage read interface, in-memory chunks and the memory-resident store
pub mod storage;

/// Ingestion-side signals consumed by the query path (consumer lag)
pub mod ingestion;

/// Alignment planner, regularizer, reducer and the batch executor
pub mod query;

// Re-export main types
pub use aggregation::Consolidator;
pub use error::{Error, Result};
pub use query::{AlignmentPlanner, QueryError, QueryErrorKind, Request};
pub use types::{Point, Timestamp, TierDescriptor, TierSet};
