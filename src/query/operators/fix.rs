//! Fix Operator - regularize points onto a fixed-step grid
//!
//! Storage may hand back points that are sparse, slightly off-grid or even
//! duplicated. `fix` turns them into exactly one point per grid slot:
//!
//! - Slots are the multiples of `interval` (relative to the Unix epoch) in
//!   `[from, to)`, so overlapping requests share the same grid
//! - A slot `s` takes a point with timestamp in `(s - interval, s]`,
//!   re-stamped to `s`
//! - Each input point is used at most once; when two points compete for a
//!   slot the earlier one wins and the later one may only fill the next slot
//!   if it is still eligible there
//! - Slots without a point carry the missing-value sentinel
//!
//! ```text
//! interval 10, from 0, to 31
//! in:   (1,10)        (3,30)
//! out:  (null,0) (1,10) (null,20) (3,30)
//! ```

use crate::types::{align_down, align_up, Point, Timestamp};

/// Regularize `points` onto the `interval` grid spanning `[from, to)`
///
/// Never fails: an empty input yields a full series of missing points, and a
/// window too narrow to hold a single slot yields an empty series.
pub fn fix(points: &[Point], from: Timestamp, to: Timestamp, interval: u32) -> Vec<Point> {
    if interval == 0 || to <= from {
        return Vec::new();
    }

    let first = align_up(from, interval);
    let last = align_down(to - 1, interval);
    if last < first {
        return Vec::new();
    }

    let step = interval as i64;
    let mut out = Vec::with_capacity(((last - first) / step + 1) as usize);
    let mut i = 0;
    let mut slot = first;

    while slot <= last {
        // drop points too old for this slot
        while i < points.len() && points[i].timestamp <= slot - step {
            i += 1;
        }

        match points.get(i) {
            Some(p) if p.timestamp <= slot => {
                out.push(Point::new(p.value, slot));
                i += 1;
            },
            _ => out.push(Point::missing(slot)),
        }

        slot += step;
    }

    out
}

/// Number of slots `fix` produces for a window
pub fn slot_count(from: Timestamp, to: Timestamp, interval: u32) -> usize {
    if interval == 0 || to <= from {
        return 0;
    }
    let first = align_up(from, interval);
    let last = align_down(to - 1, interval);
    if last < first {
        0
    } else {
        ((last - first) / interval as i64 + 1) as usize
    }
}

// ============================================================================
// Tests
// ============================================================================
