//! In-memory chunk of a single series
//!
//! A chunk holds the points of one `[t0, t0 + chunk_span)` slice of a
//! series at one tier. Points must arrive in strictly increasing timestamp
//! order; once finished the chunk is read-only.

use crate::error::StorageError;
use crate::types::{Point, Timestamp};

/// Points of one series and tier, starting at `t0`
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Start of the chunk, aligned on the chunk span
    pub t0: Timestamp,
    /// Timestamp of the most recent point
    pub last_ts: Timestamp,
    /// Number of points in the chunk
    pub num_points: u32,
    /// No point has been pushed yet
    pub first: bool,
    /// Chunk accepts no more points
    pub closed: bool,
    points: Vec<Point>,
}

impl Chunk {
    /// Create an empty chunk starting at `t0`
    pub fn new(t0: Timestamp) -> Self {
        Self {
            t0,
            last_ts: 0,
            num_points: 0,
            first: true,
            closed: false,
            points: Vec::new(),
        }
    }

    /// Append a point
    ///
    /// # Errors
    ///
    /// * `ChunkClosed` - the chunk was finished
    /// * `OutOfOrder` - `ts` is not newer than the last point
    pub fn push(&mut self, ts: Timestamp, value: f64) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::ChunkClosed { t0: self.t0 });
        }
        if !self.first && ts <= self.last_ts {
            return Err(StorageError::OutOfOrder {
                ts,
                last_ts: self.last_ts,
            });
        }

        self.points.push(Point::new(value, ts));
        self.last_ts = ts;
        self.num_points += 1;
        self.first = false;
        Ok(())
    }

    /// Mark the chunk read-only
    pub fn finish(&mut self) {
        self.closed = true;
    }

    /// Points with timestamps in `[from, to)`
    pub fn range(&self, from: Timestamp, to: Timestamp) -> &[Point] {
        let start = self.points.partition_point(|p| p.timestamp < from);
        let end = self.points.partition_point(|p| p.timestamp < to);
        if start >= end {
            &[]
        } else {
            &self.points[start..end]
        }
    }

    /// All points of the chunk
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Whether the chunk holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
