//! Storage read interface
//!
//! The query executor reads series through [`PointSource`]. A deployment
//! has two of them: a memory-resident source holding the most recent chunks
//! of every tier, and a durable source holding everything older.
//!
//! ```text
//!              fetch_from            oldest resident           fetch_to
//!                  │───── durable ──────────│────── memory ───────│
//! ```
//!
//! # Key Components
//!
//! - **Chunk**: points of one series and tier within one chunk span
//! - **MemoryStore**: memory-resident chunks with bounded retention

pub mod chunk;
pub mod memory;

pub use chunk::Chunk;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{Point, TierIndex, Timestamp};

/// Source of stored points
///
/// Implementations return points in ascending timestamp order with
/// timestamps in `[from, to)`. Returning fewer points than the window could
/// hold, or none at all, is not an error.
#[async_trait]
pub trait PointSource: Send + Sync + 'static {
    /// Read the points of `key` at `tier` within `[from, to)`
    async fn fetch(
        &self,
        key: &str,
        tier: TierIndex,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Point>, StorageError>;

    /// First timestamp still held for `key` at `tier`
    ///
    /// `None` means the source makes no residency claim.
    fn oldest_resident(&self, _key: &str, _tier: TierIndex) -> Option<Timestamp> {
        None
    }

    /// Short name used in logs and metrics
    fn name(&self) -> &'static str;
}
