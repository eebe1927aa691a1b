//! Consumer lag tracking
//!
//! The memory-resident tail of every series is fed by a partitioned
//! consumer. When the consumer falls behind, the newest points are not in
//! memory yet and query results may be incomplete at the end of the window.
//!
//! `LagLogger` keeps the last few lag measurements of one partition and the
//! production rate observed at the high-water mark. `LagMonitor` turns them
//! into a priority: the estimated number of seconds needed to catch up.
//!
//! ```text
//! priority = min(recent lags) / production rate
//! ```
//!
//! Using the minimum of the recent lags keeps short processing pauses (GC,
//! a slow flush) from producing a large estimate.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::metrics;

/// Priority reported for a partition without measurements
pub const UNKNOWN_PRIORITY: i64 = 10_000;

/// Production rate at the high-water mark of a partition
#[derive(Debug, Default)]
struct RateLogger {
    last: Option<(i64, Instant)>,
    rate: i64,
}

impl RateLogger {
    fn store(&mut self, high_water_mark: i64, ts: Instant) {
        let Some((last_hwm, last_ts)) = self.last else {
            self.last = Some((high_water_mark, ts));
            return;
        };

        // clock went backwards
        let Some(elapsed) = ts.checked_duration_since(last_ts) else {
            return;
        };
        let secs = elapsed.as_secs() as i64;
        if secs == 0 {
            return;
        }

        let produced = high_water_mark - last_hwm;
        if produced >= 0 {
            self.rate = produced / secs;
        }
        self.last = Some((high_water_mark, ts));
    }
}

/// Recent lag measurements of one partition
#[derive(Debug)]
pub struct LagLogger {
    size: usize,
    measurements: VecDeque<i64>,
    rate: RateLogger,
}

impl LagLogger {
    /// Keep the last `size` measurements
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            measurements: VecDeque::with_capacity(size),
            rate: RateLogger::default(),
        }
    }

    /// Record the consumer offset and the partition's high-water mark
    ///
    /// A negative lag is an inconsistent reading and is discarded entirely.
    pub fn store(&mut self, offset: i64, high_water_mark: i64, ts: Instant) {
        let lag = high_water_mark - offset;
        if lag < 0 {
            return;
        }

        if self.measurements.len() == self.size {
            self.measurements.pop_front();
        }
        self.measurements.push_back(lag);
        self.rate.store(high_water_mark, ts);
    }

    /// Smallest recent lag, or -1 without measurements
    pub fn min(&self) -> i64 {
        self.measurements.iter().copied().min().unwrap_or(-1)
    }

    /// Production rate in messages per second, 0 until it can be computed
    pub fn rate(&self) -> i64 {
        self.rate.rate
    }
}

/// Lag priority across all partitions of a consumer
pub struct LagMonitor {
    loggers: Mutex<HashMap<i32, LagLogger>>,
}

impl LagMonitor {
    /// Monitor `partitions`, keeping `size` measurements per partition
    pub fn new(size: usize, partitions: &[i32]) -> Self {
        let loggers = partitions
            .iter()
            .map(|&p| (p, LagLogger::new(size)))
            .collect();
        Self {
            loggers: Mutex::new(loggers),
        }
    }

    /// Record the consumer offset and newest offset of a partition
    pub fn store_offsets(&self, partition: i32, offset: i64, newest: i64, ts: Instant) {
        let mut loggers = self.loggers.lock();
        match loggers.get_mut(&partition) {
            Some(logger) => logger.store(offset, newest, ts),
            None => debug!(partition, "Ignoring offsets of unmonitored partition"),
        }
    }

    /// Highest priority over all partitions
    ///
    /// A partition without measurements reports [`UNKNOWN_PRIORITY`].
    pub fn metric(&self) -> i64 {
        let loggers = self.loggers.lock();
        let priority = loggers
            .values()
            .map(|logger| {
                let lag = logger.min();
                let rate = logger.rate();
                if lag < 0 {
                    UNKNOWN_PRIORITY
                } else if rate > 0 {
                    lag / rate
                } else {
                    lag
                }
            })
            .max()
            .unwrap_or(0);

        metrics::update_lag_priority(priority);
        priority
    }
}
