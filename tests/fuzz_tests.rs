//! Property tests for the divisor, the reducer, the regularizer and the
//! alignment planner.

use proptest::prelude::*;

use kuba_rollup::aggregation::round_half_up;
use kuba_rollup::query::divisor::agg_every;
use kuba_rollup::query::operators::{consolidate, fix, slot_count};
use kuba_rollup::query::{align_requests, Request};
use kuba_rollup::{Consolidator, Point, TierDescriptor, TierSet};

// =============================================================================
// Test Data Strategies
// =============================================================================

fn consolidator() -> impl Strategy<Value = Consolidator> {
    prop::sample::select(Consolidator::ALL.to_vec())
}

/// Regular series at `interval`, some values missing
fn regular_series(max_len: usize) -> impl Strategy<Value = (Vec<Point>, u32)> {
    (
        prop::collection::vec(prop::option::weighted(0.8, -1e6..1e6f64), 0..max_len),
        prop::sample::select(vec![1u32, 10, 30, 60]),
        -1000i64..1000,
    )
        .prop_map(|(values, interval, start)| {
            let start = start * interval as i64;
            let points = values
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let ts = start + i as i64 * interval as i64;
                    v.map_or(Point::missing(ts), |v| Point::new(v, ts))
                })
                .collect();
            (points, interval)
        })
}

/// Strictly increasing, possibly irregular timestamps
fn sparse_points(max_len: usize) -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec((1i64..40, -100.0..100.0f64), 0..max_len).prop_map(|deltas| {
        let mut ts = -200;
        deltas
            .into_iter()
            .map(|(delta, value)| {
                ts += delta;
                Point::new(value, ts)
            })
            .collect()
    })
}

// =============================================================================
// Divisor
// =============================================================================

mod divisor {
    use super::*;

    proptest! {
        /// The factor brings n within m and no smaller factor does
        #[test]
        fn smallest_sufficient_factor(n in 1u32..1_000_000, m in 1u32..10_000) {
            let d = agg_every(n, m);
            prop_assert!(d >= 1);
            prop_assert!(n.div_ceil(d) <= m);
            if d > 1 {
                prop_assert!(n.div_ceil(d - 1) > m);
            }
        }

        /// No reduction when already within budget
        #[test]
        fn identity_within_budget((m, n) in (1u32..10_000).prop_flat_map(|m| (Just(m), 0..=m))) {
            prop_assert_eq!(agg_every(n, m), 1);
        }
    }
}

// =============================================================================
// Reducer
// =============================================================================

mod reducer {
    use super::*;

    proptest! {
        /// Groups of one leave the series unchanged
        #[test]
        fn group_of_one_is_identity((points, interval) in regular_series(200), c in consolidator()) {
            prop_assert_eq!(consolidate(&points, interval, 1, c), points);
        }

        /// Output length is ceil(len / agg_num) and lands on the agg grid
        #[test]
        fn output_length_and_timestamps(
            (points, interval) in regular_series(200),
            agg_num in 2u32..20,
            c in consolidator(),
        ) {
            let out = consolidate(&points, interval, agg_num, c);
            prop_assert_eq!(out.len(), points.len().div_ceil(agg_num as usize));
            let span = agg_num as i64 * interval as i64;
            for pair in out.windows(2) {
                prop_assert_eq!(pair[1].timestamp - pair[0].timestamp, span);
            }
        }

        /// Reducing by a then by b equals reducing by a * b for order-free functions
        #[test]
        fn regrouping(
            (points, interval) in regular_series(200),
            a in 2u32..5,
            b in 2u32..5,
            c in prop::sample::select(vec![Consolidator::Sum, Consolidator::Min, Consolidator::Max]),
        ) {
            let len = points.len() - points.len() % (a * b) as usize;
            let points = &points[..len];
            let twice = consolidate(&consolidate(points, interval, a, c), interval * a, b, c);
            let once = consolidate(points, interval, a * b, c);
            prop_assert_eq!(twice.len(), once.len());
            for (x, y) in twice.iter().zip(&once) {
                prop_assert_eq!(x.timestamp, y.timestamp);
                if x.is_missing() || y.is_missing() {
                    prop_assert!(x.is_missing() && y.is_missing());
                } else {
                    prop_assert!((x.value - y.value).abs() <= 1e-6 * y.value.abs().max(1.0));
                }
            }
        }
    }
}

// =============================================================================
// Regularizer
// =============================================================================

mod regularizer {
    use super::*;

    proptest! {
        /// One point per grid slot, every slot aligned
        #[test]
        fn one_point_per_slot(
            points in sparse_points(100),
            from in -300i64..300,
            len in 0i64..1000,
            interval in prop::sample::select(vec![1u32, 7, 10, 60]),
        ) {
            let to = from + len;
            let out = fix(&points, from, to, interval);
            prop_assert_eq!(out.len(), slot_count(from, to, interval));
            for (i, p) in out.iter().enumerate() {
                prop_assert_eq!(p.timestamp.rem_euclid(interval as i64), 0);
                prop_assert!(p.timestamp >= from && p.timestamp < to);
                if i > 0 {
                    prop_assert_eq!(p.timestamp - out[i - 1].timestamp, interval as i64);
                }
            }
        }

        /// Every non-missing output value comes from an input point at most
        /// one interval earlier
        #[test]
        fn values_come_from_the_slot(
            points in sparse_points(100),
            interval in prop::sample::select(vec![5u32, 10, 30]),
        ) {
            let out = fix(&points, -300, 1000, interval);
            let mut used = 0;
            for p in out.iter().filter(|p| !p.is_missing()) {
                let source = points[used..]
                    .iter()
                    .position(|q| q.value == p.value && q.timestamp <= p.timestamp
                        && q.timestamp > p.timestamp - interval as i64);
                prop_assert!(source.is_some(), "no source for {}", p);
                used += source.unwrap_or(0) + 1;
            }
        }

        /// Regular input already on the grid passes through
        #[test]
        fn regular_input_is_unchanged((points, interval) in regular_series(100)) {
            prop_assume!(!points.is_empty());
            let from = points[0].timestamp;
            let to = points[points.len() - 1].timestamp + 1;
            prop_assert_eq!(fix(&points, from, to, interval), points);
        }
    }
}

// =============================================================================
// Planner
// =============================================================================

mod planner {
    use super::*;

    fn tiers() -> TierSet {
        TierSet::new(
            21600,
            vec![
                TierDescriptor::new(600, 21600, 1),
                TierDescriptor::new(7200, 21600, 1),
            ],
        )
    }

    proptest! {
        /// Every series of a window shares the output interval, which is a
        /// multiple of its native interval
        #[test]
        fn shared_output_interval(
            window in 60i64..(86400 * 14),
            raws in prop::collection::vec(prop::sample::select(vec![1u32, 10, 15, 30, 60]), 1..6),
            min in 1u32..200,
            extra in 0u32..2000,
        ) {
            let reqs: Vec<Request> = raws
                .iter()
                .enumerate()
                .map(|(i, &raw)| Request::new(format!("s{}", i), 0, window, min, min + extra, Consolidator::Avg, raw))
                .collect();
            let out = align_requests(reqs, &tiers()).unwrap();
            let x = out[0].out_interval;
            for r in &out {
                prop_assert_eq!(r.out_interval, x);
                prop_assert_eq!(r.native_interval * r.agg_num, x);
                prop_assert!(window as u64 / x as u64 <= r.max_points as u64);
            }
        }
    }
}

// =============================================================================
// Rounding
// =============================================================================

mod rounding {
    use super::*;

    proptest! {
        /// Rounding non-negative values is idempotent and moves them by at
        /// most half a unit
        #[test]
        fn idempotent_and_close(v in 0.0..1e6f64, places in 0i32..7) {
            let once = round_half_up(v, places);
            prop_assert_eq!(round_half_up(once, places), once);
            prop_assert!((once - v).abs() <= 0.5 / 10f64.powi(places) + 1e-9);
        }

        /// Negative values never round up and move by less than one unit
        #[test]
        fn negative_values_round_down(v in -1e6..0.0f64, places in 0i32..7) {
            let once = round_half_up(v, places);
            prop_assert!(once <= v + 1e-9);
            prop_assert!(v - once < 1.0 / 10f64.powi(places) + 1e-9);
        }

        /// Finite input always gives finite output
        #[test]
        fn finite_stays_finite(v in prop::num::f64::NORMAL, places in 0i32..7) {
            prop_assert!(round_half_up(v, places).is_finite());
        }
    }
}
