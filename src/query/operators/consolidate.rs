//! Consolidate Operator - fixed-size bucket reduction
//!
//! Collapses every `agg_num` consecutive points into one point using a
//! [`Consolidator`]. The same reduction builds rollup tiers ahead of time and
//! performs runtime consolidation when a tier's native resolution still
//! yields too many points.
//!
//! # Timestamps
//!
//! An output point is stamped `first_ts + (agg_num - 1) * interval`: the
//! timestamp of the last slot of its bucket. For a short trailing bucket this
//! is a projected timestamp that may not exist in the input. Every output
//! therefore lands on the same `agg_num * interval` grid, which is what lets
//! several consolidated series be combined point by point.
//!
//! ```text
//! in  (interval 10):  1@131  2@141  3@151 | 4@161
//! out (agg_num 3):            avg=2 @151 | avg=4 @181
//! ```

use crate::aggregation::Consolidator;
use crate::types::Point;

/// Reduce `points` by grouping every `agg_num` of them
///
/// # Arguments
///
/// * `points` - Points at a fixed `interval`, ascending
/// * `interval` - Spacing of the input points in seconds
/// * `agg_num` - Group size; 0 and 1 return the input unchanged
/// * `consolidator` - Aggregation applied to each group's non-missing values
pub fn consolidate(
    points: &[Point],
    interval: u32,
    agg_num: u32,
    consolidator: Consolidator,
) -> Vec<Point> {
    if agg_num <= 1 {
        return points.to_vec();
    }

    let span = (agg_num as i64 - 1) * interval as i64;
    let mut values = Vec::with_capacity(agg_num as usize);

    points
        .chunks(agg_num as usize)
        .map(|group| {
            values.clear();
            values.extend(group.iter().map(|p| p.value));
            Point::new(consolidator.aggregate(&values), group[0].timestamp + span)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1449178131;

    fn four_points() -> Vec<Point> {
        vec![
            Point::new(1.0, T0),
            Point::new(2.0, T0 + 10),
            Point::new(3.0, T0 + 20),
            Point::new(4.0, T0 + 30),
        ]
    }

    fn three_points() -> Vec<Point> {
        four_points()[..3].to_vec()
    }

    #[test]
    fn test_group_of_one_is_identity() {
        assert_eq!(consolidate(&four_points(), 10, 1, Consolidator::Avg), four_points());
        assert_eq!(consolidate(&three_points(), 10, 1, Consolidator::Avg), three_points());
    }

    #[test]
    fn test_odd_alignments() {
        assert_eq!(
            consolidate(&four_points(), 10, 3, Consolidator::Avg),
            vec![Point::new(2.0, T0 + 20), Point::new(4.0, T0 + 50)]
        );
        // short trailing bucket is projected to the next grid slot
        assert_eq!(
            consolidate(&three_points(), 10, 2, Consolidator::Avg),
            vec![Point::new(1.5, T0 + 10), Point::new(3.0, T0 + 30)]
        );
        assert_eq!(
            consolidate(&three_points(), 10, 3, Consolidator::Avg),
            vec![Point::new(2.0, T0 + 20)]
        );
    }

    #[test]
    fn test_consolidation_functions() {
        let cases = [
            (Consolidator::Avg, 1.5, 3.5),
            (Consolidator::Cnt, 2.0, 2.0),
            (Consolidator::Last, 2.0, 4.0),
            (Consolidator::Min, 1.0, 3.0),
            (Consolidator::Max, 2.0, 4.0),
            (Consolidator::Sum, 3.0, 7.0),
        ];
        for (consolidator, first, second) in cases {
            let out = consolidate(&four_points(), 10, 2, consolidator);
            assert_eq!(
                out,
                vec![Point::new(first, T0 + 10), Point::new(second, T0 + 30)],
                "consolidator {}",
                consolidator
            );
        }
    }

    #[test]
    fn test_missing_values_propagate() {
        let input = vec![
            Point::missing(0),
            Point::missing(10),
            Point::new(5.0, 20),
            Point::missing(30),
        ];
        let out = consolidate(&input, 10, 2, Consolidator::Sum);
        assert_eq!(out.len(), 2);
        assert!(out[0].is_missing());
        assert_eq!(out[0].timestamp, 10);
        assert_eq!(out[1], Point::new(5.0, 30));
    }

    #[test]
    fn test_empty_input() {
        assert!(consolidate(&[], 10, 5, Consolidator::Max).is_empty());
    }

    #[test]
    fn test_regrouping_matches_single_pass() {
        let input: Vec<Point> = (0..24).map(|i| Point::new(i as f64, 10 * i)).collect();
        let twice = consolidate(
            &consolidate(&input, 10, 2, Consolidator::Sum),
            20,
            3,
            Consolidator::Sum,
        );
        let once = consolidate(&input, 10, 6, Consolidator::Sum);
        assert_eq!(twice, once);
    }
}
