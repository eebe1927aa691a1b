//! Core data types shared by the planner, the operators and the storage layer
//!
//! # Key Types
//!
//! - **`Point`**: a single `(value, timestamp)` sample, possibly missing
//! - **`TierDescriptor`**: one pre-aggregated rollup tier of a metric family
//! - **`TierSet`**: the immutable tier configuration handed to the planner
//!
//! # Example
//!
//! ```rust
//! use kuba_rollup::types::{Point, TierDescriptor, TierSet};
//!
//! let p = Point::new(42.5, 1_000);
//! assert!(!p.is_missing());
//! assert!(Point::missing(1_010).is_missing());
//!
//! let tiers = TierSet::new(2400, vec![TierDescriptor::new(60, 600, 2)]);
//! assert_eq!(tiers.resident_span(1), 1200);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in seconds
///
/// Signed so that grid arithmetic around the epoch never underflows.
pub type Timestamp = i64;

/// Identifier of a series, e.g. `some.host.cpu.user`
pub type SeriesKey = String;

/// Index of a storage tier: 0 is raw, 1..=N are rollups in ascending coarseness
pub type TierIndex = usize;

/// Index of the raw tier
pub const RAW_TIER: TierIndex = 0;

/// A single sample
///
/// A value of NaN is the missing-value sentinel: "no sample for this slot",
/// which is distinct from a legitimate zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    /// Sample value, NaN when missing
    pub value: f64,

    /// Unix timestamp in seconds
    pub timestamp: Timestamp,
}

impl Point {
    /// Create a new point
    pub fn new(value: f64, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }

    /// Create a missing-value point at the given timestamp
    pub fn missing(timestamp: Timestamp) -> Self {
        Self {
            value: f64::NAN,
            timestamp,
        }
    }

    /// Whether this point carries the missing-value sentinel
    pub fn is_missing(&self) -> bool {
        self.value.is_nan()
    }
}

/// Missing points compare equal to each other at the same timestamp.
impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && (self.value == other.value || (self.is_missing() && other.is_missing()))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_missing() {
            write!(f, "(null, {})", self.timestamp)
        } else {
            write!(f, "({}, {})", self.value, self.timestamp)
        }
    }
}

/// One pre-aggregated rollup tier
///
/// Supplied by configuration and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDescriptor {
    /// Native sample interval in seconds
    pub interval: u32,

    /// Span of a single storage chunk in seconds
    pub chunk_span: u32,

    /// Number of most recent chunks guaranteed resident in memory
    pub resident_chunks: u32,
}

impl TierDescriptor {
    /// Create a new tier descriptor
    pub fn new(interval: u32, chunk_span: u32, resident_chunks: u32) -> Self {
        Self {
            interval,
            chunk_span,
            resident_chunks,
        }
    }

    /// Span of time guaranteed to be served from memory
    pub fn resident_span(&self) -> u64 {
        self.chunk_span as u64 * self.resident_chunks as u64
    }
}

/// Tier configuration of one metric family
///
/// Passed by value into the planner so that planning is a pure function of
/// its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSet {
    /// Span of raw data retained in memory, in seconds
    pub raw_resident_span: u32,

    /// Rollup tiers, ascending by interval
    pub rollups: Vec<TierDescriptor>,
}

impl TierSet {
    /// Create a tier set
    pub fn new(raw_resident_span: u32, rollups: Vec<TierDescriptor>) -> Self {
        Self {
            raw_resident_span,
            rollups,
        }
    }

    /// Tier set with only the raw tier
    pub fn raw_only(raw_resident_span: u32) -> Self {
        Self::new(raw_resident_span, Vec::new())
    }

    /// Number of tiers including raw
    pub fn len(&self) -> usize {
        self.rollups.len() + 1
    }

    /// Always false: the raw tier is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Rollup descriptor for a tier index (None for raw or out of range)
    pub fn rollup(&self, tier: TierIndex) -> Option<&TierDescriptor> {
        if tier == RAW_TIER {
            return None;
        }
        self.rollups.get(tier - 1)
    }

    /// Resident span for a tier index; 0 for unknown tiers
    pub fn resident_span(&self, tier: TierIndex) -> u64 {
        if tier == RAW_TIER {
            return self.raw_resident_span as u64;
        }
        self.rollup(tier).map(|t| t.resident_span()).unwrap_or(0)
    }
}

/// Round `value` up to the next multiple of `interval` (relative to epoch 0)
pub fn align_up(value: Timestamp, interval: u32) -> Timestamp {
    let interval = interval as i64;
    let rem = value.rem_euclid(interval);
    if rem == 0 {
        value
    } else {
        value + interval - rem
    }
}

/// Round `value` down to the previous multiple of `interval` (relative to epoch 0)
pub fn align_down(value: Timestamp, interval: u32) -> Timestamp {
    value - value.rem_euclid(interval as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_points_compare_equal() {
        assert_eq!(Point::missing(10), Point::missing(10));
        assert_ne!(Point::missing(10), Point::missing(20));
        assert_ne!(Point::missing(10), Point::new(0.0, 10));
        assert_eq!(Point::new(1.5, 10), Point::new(1.5, 10));
    }

    #[test]
    fn test_point_display() {
        assert_eq!(Point::new(2.0, 20).to_string(), "(2, 20)");
        assert_eq!(Point::missing(20).to_string(), "(null, 20)");
    }

    #[test]
    fn test_tier_set_resident_spans() {
        let tiers = TierSet::new(
            2400,
            vec![TierDescriptor::new(60, 600, 2), TierDescriptor::new(120, 600, 1)],
        );
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers.resident_span(RAW_TIER), 2400);
        assert_eq!(tiers.resident_span(1), 1200);
        assert_eq!(tiers.resident_span(2), 600);
        assert_eq!(tiers.resident_span(3), 0);
        assert!(tiers.rollup(RAW_TIER).is_none());
        assert_eq!(tiers.rollup(2).map(|t| t.interval), Some(120));
    }

    #[test]
    fn test_align_helpers() {
        assert_eq!(align_up(0, 10), 0);
        assert_eq!(align_up(1, 10), 10);
        assert_eq!(align_up(10, 10), 10);
        assert_eq!(align_up(-5, 10), 0);
        assert_eq!(align_up(-15, 10), -10);
        assert_eq!(align_down(19, 10), 10);
        assert_eq!(align_down(-1, 10), -10);
        assert_eq!(align_up(1450242982, 600), 1450243200);
    }
}
