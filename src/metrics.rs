//! Metrics for query planning and execution
//!
//! Prometheus collectors registered in the default registry. The planner,
//! the executor and the lag monitor record through the helpers below;
//! `gather_metrics` renders everything in the text exposition format.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_histogram_vec,
    CounterVec, Encoder, Gauge, Histogram, HistogramVec, TextEncoder,
};

use crate::aggregation::Consolidator;
use crate::query::error::QueryError;
use crate::types::TierIndex;

lazy_static! {
    // === Planning ===

    /// Requests planned, by selected tier
    pub static ref PLANS_TOTAL: CounterVec = register_counter_vec!(
        "kuba_rollup_plans_total",
        "Requests planned by selected tier",
        &["tier"]
    ).unwrap();

    /// Batches rejected by the planner, by error kind
    pub static ref PLAN_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "kuba_rollup_plan_errors_total",
        "Planning errors by kind",
        &["kind"]
    ).unwrap();

    /// Estimated durable-storage points of the selected tier
    pub static ref DURABLE_POINTS: Histogram = register_histogram!(
        "kuba_rollup_durable_points",
        "Estimated points read from durable storage per request",
        vec![0.0, 10.0, 100.0, 1000.0, 10000.0, 100000.0]
    ).unwrap();

    // === Execution ===

    /// Fetch latency, by point source
    pub static ref FETCH_DURATION: HistogramVec = register_histogram_vec!(
        "kuba_rollup_fetch_duration_seconds",
        "Fetch latency in seconds",
        &["source"],
        vec![0.0001, 0.001, 0.01, 0.1, 0.5, 1.0]
    ).unwrap();

    /// Fetch failures, by point source
    pub static ref FETCH_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "kuba_rollup_fetch_errors_total",
        "Fetch failures by source",
        &["source"]
    ).unwrap();

    /// Runtime consolidations, by consolidation function
    pub static ref CONSOLIDATIONS_TOTAL: CounterVec = register_counter_vec!(
        "kuba_rollup_consolidations_total",
        "Runtime consolidations by function",
        &["consolidator"]
    ).unwrap();

    // === Ingestion ===

    /// Consumer lag priority
    pub static ref LAG_PRIORITY: Gauge = register_gauge!(
        "kuba_rollup_lag_priority",
        "Estimated seconds for ingestion to catch up"
    ).unwrap();
}

/// Get metrics in Prometheus text format
///
/// # Returns
///
/// Result containing the formatted metrics string, or an error if encoding fails
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a tier selection
#[inline]
pub fn record_tier_selection(tier: TierIndex, durable_points: u64) {
    PLANS_TOTAL.with_label_values(&[&tier.to_string()]).inc();
    DURABLE_POINTS.observe(durable_points as f64);
}

/// Record a rejected batch
#[inline]
pub fn record_plan_error(err: &QueryError) {
    PLAN_ERRORS_TOTAL
        .with_label_values(&[err.kind.as_str()])
        .inc();
}

/// Record a fetch against a point source
#[inline]
pub fn record_fetch(source: &str, duration_secs: f64, success: bool) {
    FETCH_DURATION
        .with_label_values(&[source])
        .observe(duration_secs);
    if !success {
        FETCH_ERRORS_TOTAL.with_label_values(&[source]).inc();
    }
}

/// Record a runtime consolidation
#[inline]
pub fn record_consolidation(consolidator: Consolidator) {
    CONSOLIDATIONS_TOTAL
        .with_label_values(&[consolidator.as_str()])
        .inc();
}

/// Update the lag priority gauge
#[inline]
pub fn update_lag_priority(priority: i64) {
    LAG_PRIORITY.set(priority as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tier_selection() {
        record_tier_selection(2, 40);
        assert!(PLANS_TOTAL.with_label_values(&["2"]).get() >= 1.0);
        let metrics = gather_metrics().expect("Failed to gather metrics");
        assert!(metrics.contains("kuba_rollup_plans_total"));
    }

    #[test]
    fn test_record_plan_error() {
        record_plan_error(&QueryError::invalid_window(10, 0));
        assert!(PLAN_ERRORS_TOTAL.with_label_values(&["invalid_window"]).get() >= 1.0);
    }

    #[test]
    fn test_record_fetch_failure() {
        record_fetch("durable", 0.01, false);
        assert!(FETCH_ERRORS_TOTAL.with_label_values(&["durable"]).get() >= 1.0);
    }

    #[test]
    fn test_record_consolidation() {
        record_consolidation(Consolidator::Max);
        let metrics = gather_metrics().expect("Failed to gather metrics");
        assert!(metrics.contains("kuba_rollup_consolidations_total"));
    }
}
