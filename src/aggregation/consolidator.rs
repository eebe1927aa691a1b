//! Consolidation functions and Graphite-compatible rounding
//!
//! A [`Consolidator`] turns a bucket of values into one value. The same
//! functions are used to build rollup tiers ahead of time and to consolidate
//! at query time, so both paths produce identical numbers.
//!
//! Missing values (NaN) never take part in a consolidation: they are
//! excluded, not treated as zero. A bucket holding only missing values
//! consolidates to missing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of decimal places averages are rounded to
pub const AVG_DECIMAL_PLACES: i32 = 6;

/// Named aggregation applied to a bucket of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consolidator {
    /// Arithmetic mean, rounded to 6 decimal places
    #[default]
    Avg,

    /// Sum of values
    Sum,

    /// Minimum value
    Min,

    /// Maximum value
    Max,

    /// Last value in the bucket
    Last,

    /// Number of non-missing values
    Cnt,
}

impl Consolidator {
    /// All consolidators, in declaration order
    pub const ALL: [Consolidator; 6] = [
        Consolidator::Avg,
        Consolidator::Sum,
        Consolidator::Min,
        Consolidator::Max,
        Consolidator::Last,
        Consolidator::Cnt,
    ];

    /// Apply this consolidator to a bucket of values
    ///
    /// Returns NaN when the bucket has no non-missing value.
    pub fn aggregate(&self, values: &[f64]) -> f64 {
        let mut present = values.iter().copied().filter(|v| !v.is_nan());
        let first = match present.next() {
            Some(v) => v,
            None => return f64::NAN,
        };

        match self {
            Consolidator::Avg => {
                let (sum, count) = present.fold((first, 1u64), |(s, c), v| (s + v, c + 1));
                round_half_up(sum / count as f64, AVG_DECIMAL_PLACES)
            },
            Consolidator::Sum => present.fold(first, |s, v| s + v),
            Consolidator::Min => present.fold(first, f64::min),
            Consolidator::Max => present.fold(first, f64::max),
            Consolidator::Last => present.last().unwrap_or(first),
            Consolidator::Cnt => (present.count() + 1) as f64,
        }
    }

    /// Canonical lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Consolidator::Avg => "avg",
            Consolidator::Sum => "sum",
            Consolidator::Min => "min",
            Consolidator::Max => "max",
            Consolidator::Last => "last",
            Consolidator::Cnt => "cnt",
        }
    }
}

impl fmt::Display for Consolidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown consolidator name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConsolidator(pub String);

impl fmt::Display for UnknownConsolidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown consolidation function '{}'", self.0)
    }
}

impl std::error::Error for UnknownConsolidator {}

/// Accepts both the short names and Graphite's `consolidateBy` spellings.
impl FromStr for Consolidator {
    type Err = UnknownConsolidator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avg" | "average" => Ok(Consolidator::Avg),
            "sum" | "total" => Ok(Consolidator::Sum),
            "min" => Ok(Consolidator::Min),
            "max" => Ok(Consolidator::Max),
            "last" => Ok(Consolidator::Last),
            "cnt" | "count" => Ok(Consolidator::Cnt),
            _ => Err(UnknownConsolidator(s.to_string())),
        }
    }
}

/// Round to `places` decimal places, halves toward the ceiling
///
/// The value is scaled by `10^places`. When the signed fractional part of the
/// scaled value is at least 0.5 it is rounded up, otherwise down, so negative
/// values always move toward negative infinity (`-1.5` and `-1.2` both give
/// `-2`). This reproduces the output of Graphite's renderer and does not
/// depend on float formatting.
///
/// NaN and infinities are returned unchanged, as is any value whose scaled
/// form is too large to carry a fractional part.
pub fn round_half_up(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let pow = 10f64.powi(places);
    let scaled = value * pow;
    if !scaled.is_finite() || scaled.abs() >= MAX_EXACT_INTEGER {
        return value;
    }

    let rounded = if scaled - scaled.trunc() >= 0.5 {
        scaled.ceil()
    } else {
        scaled.floor()
    };
    rounded / pow
}

/// 2^53: above this every f64 is an integer
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    #[test]
    fn test_aggregate_functions() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(Consolidator::Avg.aggregate(&values), 2.5);
        assert_eq!(Consolidator::Sum.aggregate(&values), 10.0);
        assert_eq!(Consolidator::Min.aggregate(&values), 1.0);
        assert_eq!(Consolidator::Max.aggregate(&values), 4.0);
        assert_eq!(Consolidator::Last.aggregate(&values), 4.0);
        assert_eq!(Consolidator::Cnt.aggregate(&values), 4.0);
    }

    #[test]
    fn test_missing_values_are_excluded() {
        let values = [NAN, 2.0, NAN, 4.0, NAN];
        assert_eq!(Consolidator::Avg.aggregate(&values), 3.0);
        assert_eq!(Consolidator::Sum.aggregate(&values), 6.0);
        assert_eq!(Consolidator::Min.aggregate(&values), 2.0);
        assert_eq!(Consolidator::Last.aggregate(&values), 4.0);
        assert_eq!(Consolidator::Cnt.aggregate(&values), 2.0);
    }

    #[test]
    fn test_all_missing_yields_missing() {
        for c in Consolidator::ALL {
            assert!(c.aggregate(&[NAN, NAN]).is_nan(), "{} should be missing", c);
            assert!(c.aggregate(&[]).is_nan(), "{} should be missing", c);
        }
    }

    #[test]
    fn test_average_is_rounded() {
        assert_eq!(Consolidator::Avg.aggregate(&[1.0, 1.0, 2.0]), 1.333333);
        assert_eq!(Consolidator::Avg.aggregate(&[2.0, 2.0, 1.0]), 1.666667);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(1.5, 0), 2.0);
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(2.4, 0), 2.0);
        assert_eq!(round_half_up(0.1234567, 6), 0.123457);
        assert_eq!(round_half_up(0.1234564, 6), 0.123456);
        assert!(round_half_up(NAN, 6).is_nan());
        assert_eq!(round_half_up(f64::INFINITY, 6), f64::INFINITY);
    }

    #[test]
    fn test_round_negative_values_floor() {
        assert_eq!(round_half_up(-1.5, 0), -2.0);
        assert_eq!(round_half_up(-1.2, 0), -2.0);
        assert_eq!(round_half_up(-2.0, 0), -2.0);
        assert_eq!(round_half_up(-0.1234564, 6), -0.123457);
        assert_eq!(round_half_up(-0.5, 6), -0.5);
        assert_eq!(Consolidator::Avg.aggregate(&[-1.0, -1.0, -2.0]), -1.333334);
    }

    #[test]
    fn test_round_huge_values_unchanged() {
        assert_eq!(round_half_up(1e303, 6), 1e303);
        assert_eq!(round_half_up(-1e303, 6), -1e303);
        assert_eq!(round_half_up(1e12 + 0.5, 6), 1e12 + 0.5);
        assert_eq!(Consolidator::Avg.aggregate(&[1e303, 1e303]), 1e303);
        assert_eq!(Consolidator::Avg.aggregate(&[f64::MAX, f64::MAX]), f64::INFINITY);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("avg".parse::<Consolidator>(), Ok(Consolidator::Avg));
        assert_eq!("average".parse::<Consolidator>(), Ok(Consolidator::Avg));
        assert_eq!("SUM".parse::<Consolidator>(), Ok(Consolidator::Sum));
        assert_eq!("count".parse::<Consolidator>(), Ok(Consolidator::Cnt));
        assert!("median".parse::<Consolidator>().is_err());

        for c in Consolidator::ALL {
            assert_eq!(c.as_str().parse::<Consolidator>(), Ok(c));
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Consolidator::Cnt).unwrap();
        assert_eq!(json, "\"cnt\"");
        let back: Consolidator = serde_json::from_str("\"max\"").unwrap();
        assert_eq!(back, Consolidator::Max);
    }
}
