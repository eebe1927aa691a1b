//! Query result types and formatters
//!
//! Series are rendered in the Graphite render format:
//!
//! ```text
//! [{"target": "a.b.c", "datapoints": [[1.5, 60], [null, 120]]}]
//! ```
//!
//! Missing values serialize as `null`.

use std::fmt;
use std::time::Duration;

use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::aggregation::Consolidator;
use crate::types::{Point, SeriesKey, TierIndex};

// ============================================================================
// Series
// ============================================================================

/// One resolved series
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Series key, possibly rewritten by transforms
    pub key: SeriesKey,
    /// Spacing of the points in seconds
    pub interval: u32,
    /// Consolidation function applied at runtime
    pub consolidator: Consolidator,
    /// Tier the points were read from
    pub tier: TierIndex,
    /// Points, one per interval
    pub points: Vec<Point>,
}

impl Series {
    /// Create a series
    pub fn new(
        key: impl Into<SeriesKey>,
        interval: u32,
        consolidator: Consolidator,
        tier: TierIndex,
        points: Vec<Point>,
    ) -> Self {
        Self {
            key: key.into(),
            interval,
            consolidator,
            tier,
            points,
        }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// `[value|null, ts]`
struct Datapoint<'a>(&'a Point);

impl Serialize for Datapoint<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        if self.0.is_missing() {
            seq.serialize_element(&Option::<f64>::None)?;
        } else {
            seq.serialize_element(&self.0.value)?;
        }
        seq.serialize_element(&self.0.timestamp)?;
        seq.end()
    }
}

struct Datapoints<'a>(&'a [Point]);

impl Serialize for Datapoints<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(Datapoint))
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Series", 2)?;
        state.serialize_field("target", &self.key)?;
        state.serialize_field("datapoints", &Datapoints(&self.points))?;
        state.end()
    }
}

// ============================================================================
// Query Response
// ============================================================================

/// Output of one executed batch
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// Resolved series, in request order
    pub series: Vec<Series>,
    /// Execution metadata
    #[serde(skip)]
    pub metadata: ResultMetadata,
}

impl QueryResponse {
    /// Create a response from series
    pub fn from_series(series: Vec<Series>) -> Self {
        let point_count = series.iter().map(|s| s.points.len()).sum();
        Self {
            metadata: ResultMetadata {
                series_count: series.len(),
                point_count,
                ..Default::default()
            },
            series,
        }
    }

    /// Set execution time metadata
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.metadata.execution_time_us = duration.as_micros() as u64;
        self
    }

    /// Check if result is empty
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Format result to string
    pub fn format(&self, format: ResultFormat) -> String {
        match format {
            ResultFormat::Json => self.to_json(),
            ResultFormat::JsonPretty => self.to_json_pretty(),
            ResultFormat::Csv => self.to_csv(),
        }
    }

    /// Render the series as a Graphite JSON array
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.series).unwrap_or_else(|_| "[]".to_string())
    }

    /// Render the series as pretty-printed Graphite JSON
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.series).unwrap_or_else(|_| "[]".to_string())
    }

    /// Render as `target,timestamp,value` rows, missing values left empty
    pub fn to_csv(&self) -> String {
        let mut output = String::from("target,timestamp,value\n");
        for s in &self.series {
            for p in &s.points {
                if p.is_missing() {
                    output.push_str(&format!("{},{},\n", s.key, p.timestamp));
                } else {
                    output.push_str(&format!("{},{},{}\n", s.key, p.timestamp, p.value));
                }
            }
        }
        output
    }
}

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFormat {
    /// Compact Graphite JSON
    #[default]
    Json,
    /// Indented Graphite JSON
    JsonPretty,
    /// Comma separated rows
    Csv,
}

// ============================================================================
// Result Metadata
// ============================================================================

/// Execution metadata of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultMetadata {
    /// Number of series returned
    pub series_count: usize,

    /// Total number of points returned
    pub point_count: usize,

    /// Wall time of the batch in microseconds
    pub execution_time_us: u64,

    /// Points read from the memory source
    pub memory_points: usize,

    /// Points read from the durable source
    pub durable_points: usize,

    /// Ingestion lag priority observed when the batch ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag_priority: Option<i64>,

    /// Ingestion lag exceeded the configured threshold; the newest points
    /// may be missing
    pub ingest_lagging: bool,
}

impl fmt::Display for ResultMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} series, {} points ({} memory, {} durable) in {:.3}ms",
            self.series_count,
            self.point_count,
            self.memory_points,
            self.durable_points,
            self.execution_time_us as f64 / 1000.0
        )?;
        if self.ingest_lagging {
            write!(f, " [ingest lagging]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueryResponse {
        QueryResponse::from_series(vec![
            Series::new(
                "a.b",
                60,
                Consolidator::Avg,
                0,
                vec![Point::new(1.5, 60), Point::missing(120)],
            ),
            Series::new("c.d", 60, Consolidator::Avg, 1, vec![Point::new(-2.0, 60)]),
        ])
    }

    #[test]
    fn test_graphite_json() {
        assert_eq!(
            sample().to_json(),
            r#"[{"target":"a.b","datapoints":[[1.5,60],[null,120]]},{"target":"c.d","datapoints":[[-2.0,60]]}]"#
        );
    }

    #[test]
    fn test_csv() {
        assert_eq!(
            sample().format(ResultFormat::Csv),
            "target,timestamp,value\na.b,60,1.5\na.b,120,\nc.d,60,-2\n"
        );
    }

    #[test]
    fn test_metadata_counts() {
        let resp = sample().with_execution_time(Duration::from_millis(3));
        assert_eq!(resp.metadata.series_count, 2);
        assert_eq!(resp.metadata.point_count, 3);
        assert_eq!(resp.metadata.execution_time_us, 3000);
        assert!(resp.metadata.to_string().contains("2 series, 3 points"));
    }

    #[test]
    fn test_empty_response() {
        let resp = QueryResponse::from_series(Vec::new());
        assert!(resp.is_empty());
        assert_eq!(resp.to_json(), "[]");
    }
}
