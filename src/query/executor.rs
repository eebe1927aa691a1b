//! Query Executor - plan, fetch, regularize, consolidate
//!
//! # Pipeline
//!
//! ```text
//! ┌─────────────────┐
//! │   Planner       │  tier + output interval X per request
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Fetch         │  memory and/or durable source, parallel per wave
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Fix           │  one point per native interval
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Consolidate   │  agg_num native points per output point
//! └─────────────────┘
//! ```
//!
//! # Output Grid
//!
//! All series of a window are labelled on the same grid `F, F+X, ..., L`
//! where `F = align_up(from, X)` and `L = align_down(to - 1, X)`. Output
//! point `T` covers `(T - X, T]`, so each series is fetched and fixed over
//! `[F - X + native, L + 1)`: every bucket is complete and the end-of-bucket
//! timestamp produced by consolidation lands exactly on the grid, whatever
//! the series' native interval.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::ingestion::LagMonitor;
use crate::metrics;
use crate::query::error::{QueryError, QueryResult};
use crate::query::operators::{consolidate, fix};
use crate::query::planner::{AlignmentPlanner, Request};
use crate::query::result::{QueryResponse, Series};
use crate::storage::PointSource;
use crate::types::{align_down, align_up, Point, Timestamp};

// ============================================================================
// Executor Configuration
// ============================================================================

/// Configuration for query execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Maximum number of series fetched concurrently (default: 16)
    pub max_parallel_fetches: usize,

    /// Lag priority above which results are flagged as lagging (default: off)
    pub lag_priority_threshold: Option<i64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel_fetches: 16,
            lag_priority_threshold: None,
        }
    }
}

impl ExecutorConfig {
    /// Create a new executor config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the query section of the configuration
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            max_parallel_fetches: config.max_parallel_fetches.max(1),
            lag_priority_threshold: config.lag_priority_threshold,
        }
    }

    /// Set maximum parallelism
    pub fn with_parallelism(mut self, fetches: usize) -> Self {
        self.max_parallel_fetches = fetches.max(1);
        self
    }

    /// Flag results when the lag priority exceeds `threshold`
    pub fn with_lag_threshold(mut self, threshold: i64) -> Self {
        self.lag_priority_threshold = Some(threshold);
        self
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Points of one series and where they came from
struct Fetched {
    points: Vec<Point>,
    memory_points: usize,
    durable_points: usize,
}

/// Executes request batches against a memory and a durable point source
pub struct QueryExecutor {
    memory: Arc<dyn PointSource>,
    durable: Arc<dyn PointSource>,
    planner: AlignmentPlanner,
    config: ExecutorConfig,
    lag: Option<Arc<LagMonitor>>,
}

impl QueryExecutor {
    /// Create an executor
    pub fn new(
        memory: Arc<dyn PointSource>,
        durable: Arc<dyn PointSource>,
        planner: AlignmentPlanner,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            memory,
            durable,
            planner,
            config,
            lag: None,
        }
    }

    /// Attach the ingestion lag monitor
    pub fn with_lag_monitor(mut self, monitor: Arc<LagMonitor>) -> Self {
        self.lag = Some(monitor);
        self
    }

    /// Planner used by this executor
    pub fn planner(&self) -> &AlignmentPlanner {
        &self.planner
    }

    /// Get configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Plan and resolve a batch of requests
    ///
    /// Series are returned in request order. All series that share a window
    /// have the same interval and the same number of points.
    ///
    /// # Errors
    ///
    /// Planning errors are returned unchanged. A failed fetch for any series
    /// fails the whole batch with `InsufficientData`.
    pub async fn execute(&self, reqs: Vec<Request>) -> QueryResult<QueryResponse> {
        let start = Instant::now();
        let planned = self.planner.plan(reqs)?;

        let lag_priority = self.lag.as_ref().map(|mon| mon.metric());
        let ingest_lagging = match (lag_priority, self.config.lag_priority_threshold) {
            (Some(priority), Some(threshold)) if priority > threshold => {
                warn!(
                    priority,
                    threshold, "Ingestion is lagging, newest points may be missing"
                );
                true
            },
            _ => false,
        };

        let mut series = Vec::with_capacity(planned.len());
        let mut memory_points = 0;
        let mut durable_points = 0;

        for wave in planned.chunks(self.config.max_parallel_fetches.max(1)) {
            let results = join_all(wave.iter().map(|req| self.resolve(req))).await;
            for result in results {
                let (s, fetched) = result?;
                memory_points += fetched.memory_points;
                durable_points += fetched.durable_points;
                series.push(s);
            }
        }

        let mut response = QueryResponse::from_series(series).with_execution_time(start.elapsed());
        response.metadata.memory_points = memory_points;
        response.metadata.durable_points = durable_points;
        response.metadata.lag_priority = lag_priority;
        response.metadata.ingest_lagging = ingest_lagging;

        debug!(metadata = %response.metadata, "Executed batch");
        Ok(response)
    }

    /// Fetch, fix and consolidate one planned request
    async fn resolve(&self, req: &Request) -> QueryResult<(Series, Fetched)> {
        let out = req.out_interval;
        let native = req.native_interval;

        let first = align_up(req.from, out);
        let last = align_down(req.to - 1, out);
        if last < first {
            let empty = Fetched {
                points: Vec::new(),
                memory_points: 0,
                durable_points: 0,
            };
            let s = Series::new(req.key.clone(), out, req.consolidator, req.tier, Vec::new());
            return Ok((s, empty));
        }

        let fetch_from = first - out as i64 + native as i64;
        let fetch_to = last + 1;
        let fetched = self.fetch(req, fetch_from, fetch_to).await?;

        let fixed = fix(&fetched.points, fetch_from, fetch_to, native);
        let points = if req.agg_num > 1 {
            metrics::record_consolidation(req.consolidator);
            consolidate(&fixed, native, req.agg_num, req.consolidator)
        } else {
            fixed
        };

        let s = Series::new(req.key.clone(), out, req.consolidator, req.tier, points);
        Ok((s, fetched))
    }

    /// Read `[from, to)` of a request's tier, splitting at the memory
    /// source's oldest resident point
    async fn fetch(&self, req: &Request, from: Timestamp, to: Timestamp) -> QueryResult<Fetched> {
        match self.memory.oldest_resident(&req.key, req.tier) {
            Some(oldest) if oldest <= from => {
                let points = timed_fetch(self.memory.as_ref(), req, from, to).await?;
                Ok(Fetched {
                    memory_points: points.len(),
                    durable_points: 0,
                    points,
                })
            },
            Some(oldest) if oldest < to => {
                let (old, recent) = tokio::join!(
                    timed_fetch(self.durable.as_ref(), req, from, oldest),
                    timed_fetch(self.memory.as_ref(), req, oldest, to),
                );
                let (mut points, recent) = (old?, recent?);
                let durable_points = points.len();
                let memory_points = recent.len();
                points.extend(recent);
                Ok(Fetched {
                    points,
                    memory_points,
                    durable_points,
                })
            },
            _ => {
                let points = timed_fetch(self.durable.as_ref(), req, from, to).await?;
                Ok(Fetched {
                    memory_points: 0,
                    durable_points: points.len(),
                    points,
                })
            },
        }
    }
}

async fn timed_fetch(
    source: &dyn PointSource,
    req: &Request,
    from: Timestamp,
    to: Timestamp,
) -> QueryResult<Vec<Point>> {
    let start = Instant::now();
    let result = source.fetch(&req.key, req.tier, from, to).await;
    metrics::record_fetch(source.name(), start.elapsed().as_secs_f64(), result.is_ok());

    result.map_err(|e| {
        warn!(
            key = %req.key,
            tier = req.tier,
            from,
            to,
            source = source.name(),
            error = %e,
            "Fetch failed"
        );
        QueryError::insufficient_data(format!(
            "failed to fetch {} tier {} from {} source",
            req.key,
            req.tier,
            source.name()
        ))
        .with_source(e)
    })
}

// ============================================================================
// Tests
// ============================================================================
