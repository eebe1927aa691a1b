//! Query resolution: from a batch of series requests to aligned series
//!
//! # Architecture
//!
//! ```text
//! Requests (key, window, point budget, consolidator)
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Plan      │  tier per request, output interval per window
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Fetch     │  memory / durable point sources
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Fix       │  regular native grid, gaps as missing
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Consolidate │  runtime reduction to the output interval
//! └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use kuba_rollup::query::{AlignmentPlanner, Request};
//! use kuba_rollup::{Consolidator, TierSet};
//!
//! let planner = AlignmentPlanner::new(TierSet::raw_only(2400));
//! let planned = planner
//!     .plan(vec![
//!         Request::new("a", 0, 2400, 20, 100, Consolidator::Avg, 10),
//!         Request::new("b", 0, 2400, 20, 100, Consolidator::Avg, 60),
//!     ])
//!     .unwrap();
//!
//! assert!(planned.iter().all(|r| r.out_interval == 60));
//! assert_eq!(planned[0].agg_num, 6);
//! ```

pub mod divisor;
pub mod error;
pub mod executor;
pub mod operators;
pub mod planner;
pub mod result;

// Re-export main types
pub use divisor::agg_every;
pub use error::{QueryError, QueryErrorKind};
pub use executor::{ExecutorConfig, QueryExecutor};
pub use planner::{align_requests, AlignmentPlanner, Plan, Request, TierCost};
pub use result::{QueryResponse, ResultFormat, ResultMetadata, Series};
