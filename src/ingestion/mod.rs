//! Ingestion-side signals consumed by the query path
//!
//! # Components
//!
//! - **Lag**: per-partition consumer lag and the derived catch-up priority

pub mod lag;

pub use lag::{LagLogger, LagMonitor, UNKNOWN_PRIORITY};
