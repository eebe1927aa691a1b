//! Consolidation functions and series transforms
//!
//! - **Consolidator**: the named aggregations (avg, sum, min, max, last, cnt)
//!   shared by rollup generation and runtime consolidation
//! - **round_half_up**: Graphite-compatible fixed-precision rounding
//! - **functions**: transforms over consolidated output (highestX/lowestX,
//!   scaleToSeconds)

pub mod consolidator;
pub mod functions;

pub use consolidator::{round_half_up, Consolidator, UnknownConsolidator, AVG_DECIMAL_PLACES};
pub use functions::{highest_lowest, scale_to_seconds};
