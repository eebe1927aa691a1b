//! Series transforms applied on top of consolidated query output
//!
//! These functions consume the executor's output: every series handed to
//! them shares one interval and one point count. They are the Graphite
//! functions that depend directly on the consolidation machinery:
//!
//! - `highestX` / `lowestX`: rank series by a consolidation of their points
//! - `scaleToSeconds`: rescale per-interval values to a per-N-seconds rate
//!
//! # Example
//!
//! ```rust,ignore
//! use kuba_rollup::aggregation::functions::{highest_lowest, scale_to_seconds};
//!
//! let top = highest_lowest(series, 3, Consolidator::Max, true);
//! let per_minute = scale_to_seconds(top, 60.0);
//! ```

use std::cmp::Ordering;

use crate::aggregation::consolidator::{round_half_up, Consolidator};
use crate::query::result::Series;

/// Decimal places used by `scale_to_seconds`, matching Graphite
const SCALE_DECIMAL_PLACES: i32 = 6;

// ============================================================================
// HighestX / LowestX
// ============================================================================

/// Keep the `n` series with the highest (or lowest) consolidated value
///
/// Each series is reduced to one value with `consolidator` over all of its
/// points. Series whose points are all missing rank after every other series
/// in both directions. Ties keep their input order.
///
/// # Arguments
/// * `series` - Series to rank
/// * `n` - Number of series to keep (clamped to the number of series)
/// * `consolidator` - Function used to reduce a series to its rank value
/// * `highest` - Rank descending when true, ascending otherwise
pub fn highest_lowest(
    series: Vec<Series>,
    n: usize,
    consolidator: Consolidator,
    highest: bool,
) -> Vec<Series> {
    if series.is_empty() || n == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(f64, Series)> = series
        .into_iter()
        .map(|s| {
            let values: Vec<f64> = s.points.iter().map(|p| p.value).collect();
            (consolidator.aggregate(&values), s)
        })
        .collect();

    ranked.sort_by(|(a, _), (b, _)| match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            if highest {
                ord.reverse()
            } else {
                ord
            }
        },
    });

    ranked.truncate(n);
    ranked.into_iter().map(|(_, s)| s).collect()
}

// ============================================================================
// ScaleToSeconds
// ============================================================================

/// Rescale each value from "per interval" to "per `seconds`"
///
/// Every non-missing value is multiplied by `seconds / interval` and rounded
/// to 6 decimal places. Missing values stay missing. The key of each output
/// series records the transform, e.g. `scaleToSeconds(a.b.c,60)`.
pub fn scale_to_seconds(series: Vec<Series>, seconds: f64) -> Vec<Series> {
    series
        .into_iter()
        .map(|mut s| {
            let factor = if s.interval == 0 {
                f64::NAN
            } else {
                seconds / s.interval as f64
            };
            for p in s.points.iter_mut() {
                if !p.is_missing() {
                    p.value = round_half_up(p.value * factor, SCALE_DECIMAL_PLACES);
                }
            }
            s.key = format!("scaleToSeconds({},{})", s.key, seconds as i64);
            s
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
