//! Alignment Planner - tier selection and batch-wide output intervals
//!
//! Given a batch of requests that share a window and a point budget, the
//! planner decides for every request which storage tier to read (raw or one
//! of the rollups) and which output interval the series must be
//! consolidated to.
//!
//! # Planning Phases
//!
//! ```text
//! Requests
//!     │
//!     ▼
//! ┌──────────────────────┐
//! │  Validate            │  window and budget checks
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │  Pass 1: tier        │  per request, cheapest durable read among
//! │                      │  tiers that meet min_points
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │  Pass 2: interval    │  per window, one output interval that is a
//! │                      │  multiple of every native interval and
//! │                      │  respects the tightest max_points
//! └──────────────────────┘
//! ```
//!
//! # Cost Model
//!
//! For a window of length `W` and a tier with native interval `i` and a
//! memory-resident span `r`, `max(0, W - r) / i` points must come from
//! durable storage and `min(W, r) / i` can be served from memory. The raw
//! tier's resident span is the configured raw retention; a rollup's is
//! `chunk_span * resident_chunks`.
//!
//! Avoiding durable reads dominates: a tier that needs none beats any tier
//! that needs some, even if runtime consolidation is then required to fit
//! the point budget. Ties go to the coarser tier.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregation::Consolidator;
use crate::metrics;
use crate::query::divisor::agg_every;
use crate::query::error::{QueryError, QueryErrorKind, QueryResult};
use crate::types::{SeriesKey, TierIndex, TierSet, Timestamp, RAW_TIER};

// ============================================================================
// Request
// ============================================================================

/// A query for one series
///
/// The first group of fields is supplied by the caller. The planner fills in
/// `tier`, `native_interval`, `out_interval` and `agg_num`; after planning
/// `out_interval == native_interval * agg_num` holds, and `out_interval` is
/// the same for every request of the batch that shares the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Series key
    pub key: SeriesKey,
    /// Window start (inclusive)
    pub from: Timestamp,
    /// Window end (exclusive)
    pub to: Timestamp,
    /// Advisory lower bound on the number of output points
    pub min_points: u32,
    /// Upper bound on the number of output points
    pub max_points: u32,
    /// Consolidation function used for runtime consolidation
    pub consolidator: Consolidator,
    /// Native interval of the raw series
    pub raw_interval: u32,

    /// Selected tier: 0 is raw, 1..=N are rollups
    pub tier: TierIndex,
    /// Native interval of the selected tier
    pub native_interval: u32,
    /// Output interval shared by the batch
    pub out_interval: u32,
    /// Number of native points consolidated into one output point
    pub agg_num: u32,
}

impl Request {
    /// Create an unplanned request
    pub fn new(
        key: impl Into<SeriesKey>,
        from: Timestamp,
        to: Timestamp,
        min_points: u32,
        max_points: u32,
        consolidator: Consolidator,
        raw_interval: u32,
    ) -> Self {
        Self {
            key: key.into(),
            from,
            to,
            min_points,
            max_points,
            consolidator,
            raw_interval,
            tier: RAW_TIER,
            native_interval: 0,
            out_interval: 0,
            agg_num: 0,
        }
    }

    /// Length of the window in seconds (0 for an invalid window)
    pub fn window_len(&self) -> u64 {
        if self.to > self.from {
            self.to.abs_diff(self.from)
        } else {
            0
        }
    }

    /// Whether the planner has resolved this request
    pub fn is_planned(&self) -> bool {
        self.out_interval > 0 && self.agg_num > 0
    }

    /// Resolved plan of this request
    pub fn plan(&self) -> Plan {
        Plan {
            tier: self.tier,
            native_interval: self.native_interval,
            out_interval: self.out_interval,
            agg_num: self.agg_num,
        }
    }

    /// Check window and budget
    fn validate(&self) -> QueryResult<()> {
        if self.to <= self.from {
            return Err(QueryError::invalid_window(self.from, self.to));
        }
        if self.max_points < 1 || self.min_points > self.max_points {
            return Err(QueryError::invalid_budget(self.min_points, self.max_points));
        }
        if self.raw_interval == 0 {
            return Err(QueryError::invalid_interval(&self.key));
        }
        Ok(())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Request {} {}-{} points {}-{} {} raw:{} tier:{} native:{} out:{} agg:{}>",
            self.key,
            self.from,
            self.to,
            self.min_points,
            self.max_points,
            self.consolidator,
            self.raw_interval,
            self.tier,
            self.native_interval,
            self.out_interval,
            self.agg_num
        )
    }
}

/// Resolved fields of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Selected tier
    pub tier: TierIndex,
    /// Native interval of the selected tier
    pub native_interval: u32,
    /// Output interval
    pub out_interval: u32,
    /// Consolidation factor
    pub agg_num: u32,
}

// ============================================================================
// Cost estimation
// ============================================================================

/// Estimated read cost of serving one request from one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierCost {
    /// Tier index
    pub tier: TierIndex,
    /// Native interval of the tier for this request
    pub interval: u32,
    /// Points in the window at the native interval
    pub native_points: u64,
    /// Points that can be served from memory
    pub memory_points: u64,
    /// Points that must be read from durable storage
    pub durable_points: u64,
}

/// Cost of every tier for a request, raw first
pub fn tier_costs(req: &Request, tiers: &TierSet) -> Vec<TierCost> {
    let window = req.window_len();

    let raw = std::iter::once((RAW_TIER, req.raw_interval));
    let rollups = tiers
        .rollups
        .iter()
        .enumerate()
        .map(|(i, t)| (i + 1, t.interval));

    raw.chain(rollups)
        .filter(|(_, interval)| *interval > 0)
        .map(|(tier, interval)| {
            let resident = tiers.resident_span(tier);
            let step = interval as u64;
            TierCost {
                tier,
                interval,
                native_points: window / step,
                memory_points: window.min(resident) / step,
                durable_points: window.saturating_sub(resident) / step,
            }
        })
        .collect()
}

/// Pass 1: choose the tier for a single request
///
/// Tiers delivering at least `min_points` natively are eligible; among them
/// the smallest durable cost wins, ties going to the coarser tier. When no
/// tier is eligible the finest one is used, since it gets closest to the
/// lower bound.
pub fn select_tier(req: &Request, tiers: &TierSet) -> TierCost {
    let costs = tier_costs(req, tiers);

    let cheapest = costs
        .iter()
        .filter(|c| c.native_points >= req.min_points as u64)
        .fold(None, |best: Option<&TierCost>, c| match best {
            Some(b) if b.durable_points < c.durable_points => Some(b),
            _ => Some(c),
        });

    let selected = cheapest.or_else(|| {
        costs.iter().fold(None, |best: Option<&TierCost>, c| match best {
            Some(b) if b.native_points >= c.native_points => Some(b),
            _ => Some(c),
        })
    });

    // raw is always present for a validated request
    selected.copied().unwrap_or(TierCost {
        tier: RAW_TIER,
        interval: req.raw_interval,
        native_points: 0,
        memory_points: 0,
        durable_points: 0,
    })
}

// ============================================================================
// Planner
// ============================================================================

/// Resolve tier and output interval for every request of a batch
///
/// Requests are returned in input order with their plan fields filled in.
///
/// # Errors
///
/// * `InvalidWindow` - a request has `to <= from`
/// * `InvalidBudget` - a request has `max_points < 1` or `min_points > max_points`
/// * `InvalidInterval` - a request has a zero raw interval
pub fn align_requests(mut reqs: Vec<Request>, tiers: &TierSet) -> QueryResult<Vec<Request>> {
    for req in &reqs {
        if let Err(e) = req.validate() {
            metrics::record_plan_error(&e);
            return Err(e);
        }
    }

    // Pass 1: tier per request
    for req in reqs.iter_mut() {
        let cost = select_tier(req, tiers);
        req.tier = cost.tier;
        req.native_interval = cost.interval;

        debug!(
            key = %req.key,
            tier = cost.tier,
            interval = cost.interval,
            native_points = cost.native_points,
            memory_points = cost.memory_points,
            durable_points = cost.durable_points,
            "Selected tier"
        );
        metrics::record_tier_selection(cost.tier, cost.durable_points);
    }

    // Pass 2: one output interval per window
    let mut windows: BTreeMap<(Timestamp, Timestamp), Vec<usize>> = BTreeMap::new();
    for (idx, req) in reqs.iter().enumerate() {
        windows.entry((req.from, req.to)).or_default().push(idx);
    }

    for ((from, to), members) in windows {
        let common = members
            .iter()
            .try_fold(1u64, |acc, &i| {
                lcm(acc, reqs[i].native_interval as u64).filter(|&l| l <= u32::MAX as u64)
            })
            .ok_or_else(|| {
                QueryError::new(
                    QueryErrorKind::Internal,
                    format!("common interval for window {}-{} overflows", from, to),
                )
            })?;
        let max_points = members
            .iter()
            .map(|&i| reqs[i].max_points)
            .min()
            .unwrap_or(1);

        let window = to.abs_diff(from);
        let native_points = u32::try_from(window / common).unwrap_or(u32::MAX);
        let out_interval = u32::try_from(common * agg_every(native_points, max_points) as u64)
            .map_err(|_| {
                QueryError::new(
                    QueryErrorKind::Internal,
                    format!("output interval for window {}-{} overflows", from, to),
                )
            })?;

        for &i in &members {
            let req = &mut reqs[i];
            req.out_interval = out_interval;
            req.agg_num = out_interval / req.native_interval;

            let points = window / out_interval as u64;
            if points < req.min_points as u64 {
                debug!(
                    key = %req.key,
                    points,
                    min_points = req.min_points,
                    "Plan delivers fewer points than requested minimum"
                );
            }
        }

        debug!(
            from,
            to,
            series = members.len(),
            out_interval,
            "Aligned output interval"
        );
    }

    Ok(reqs)
}

/// Planner bound to the tier configuration of one metric family
///
/// The tier set is immutable for the planner's lifetime; planning is a pure
/// computation and the planner can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct AlignmentPlanner {
    tiers: TierSet,
}

impl AlignmentPlanner {
    /// Create a planner for a tier set
    pub fn new(tiers: TierSet) -> Self {
        Self { tiers }
    }

    /// Tier configuration used by this planner
    pub fn tiers(&self) -> &TierSet {
        &self.tiers
    }

    /// Plan a batch of requests
    pub fn plan(&self, reqs: Vec<Request>) -> QueryResult<Vec<Request>> {
        align_requests(reqs, &self.tiers)
    }

    /// Per-tier cost breakdown for a request
    pub fn explain(&self, req: &Request) -> Vec<TierCost> {
        tier_costs(req, &self.tiers)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Least common multiple, `None` on overflow
fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(a.max(b));
    }
    (a / gcd(a, b)).checked_mul(b)
}

// ============================================================================
// Tests
// ============================================================================
