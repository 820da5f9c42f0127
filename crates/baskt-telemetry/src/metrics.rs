//! Prometheus metrics for order admission.
//!
//! Covers:
//! - Terminal decisions (accepted / rejected)
//! - Rejections per check and severity
//! - Per-check latency and internal failures
//! - Fee-skew distribution and fail-open events
//! - Price fetch failures and query cache efficiency
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which must crash at startup. These panics only
//! occur during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, register_int_counter,
    CounterVec, Encoder, Histogram, HistogramVec, IntCounter, TextEncoder,
};

use crate::error::TelemetryResult;

/// Terminal decisions.
/// Labels: decision (accepted/rejected)
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "baskt_orders_total",
        "Total orders that reached a terminal decision",
        &["decision"]
    )
    .unwrap()
});

/// Rejections attributed to a check.
pub static REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "baskt_rejections_total",
        "Total rejected orders by check and severity",
        &["check", "severity"]
    )
    .unwrap()
});

/// Wall-clock time of a single risk check.
pub static CHECK_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "baskt_check_latency_ms",
        "Risk check latency in milliseconds",
        &["check"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0]
    )
    .unwrap()
});

/// Checks that returned an error or panicked.
/// Labels: kind (error/panic)
pub static CHECK_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "baskt_check_failures_total",
        "Risk checks that failed internally",
        &["check", "kind"]
    )
    .unwrap()
});

/// End-to-end evaluation time of one order.
pub static DECISION_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "baskt_decision_latency_ms",
        "Order evaluation latency in milliseconds",
        vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// Effective fee of priced opens, in basis points.
pub static FEE_SKEW_BPS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "baskt_fee_skew_bps",
        "Effective fee-skew in basis points",
        &["side"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0]
    )
    .unwrap()
});

pub static PRICE_FETCH_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "baskt_price_fetch_failures_total",
        "Orders rejected because no execution price could be determined"
    )
    .unwrap()
});

/// Internal errors swallowed by a fail-open component.
pub static FAIL_OPEN_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "baskt_fail_open_total",
        "Internal errors that were allowed through",
        &["component"]
    )
    .unwrap()
});

/// Query cache lookups.
/// Labels: result (hit/miss)
pub static CACHE_LOOKUPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "baskt_cache_lookups_total",
        "Query cache lookups",
        &["cache", "result"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn order_accepted() {
        ORDERS_TOTAL.with_label_values(&["accepted"]).inc();
    }

    /// Record a rejection and the check responsible for it.
    pub fn order_rejected(check: &str, severity: &str) {
        ORDERS_TOTAL.with_label_values(&["rejected"]).inc();
        REJECTIONS_TOTAL.with_label_values(&[check, severity]).inc();
    }

    pub fn check_latency(check: &str, latency_ms: f64) {
        CHECK_LATENCY_MS.with_label_values(&[check]).observe(latency_ms);
    }

    pub fn check_error(check: &str) {
        CHECK_FAILURES_TOTAL.with_label_values(&[check, "error"]).inc();
    }

    pub fn check_panic(check: &str) {
        CHECK_FAILURES_TOTAL.with_label_values(&[check, "panic"]).inc();
    }

    pub fn decision_latency(latency_ms: f64) {
        DECISION_LATENCY_MS.observe(latency_ms);
    }

    pub fn fee_skew_observed(is_long: bool, fee_bps: f64) {
        let side = if is_long { "long" } else { "short" };
        FEE_SKEW_BPS.with_label_values(&[side]).observe(fee_bps);
    }

    pub fn price_fetch_failed() {
        PRICE_FETCH_FAILURES_TOTAL.inc();
    }

    pub fn fail_open(component: &str) {
        FAIL_OPEN_TOTAL.with_label_values(&[component]).inc();
    }

    pub fn cache_hit(cache: &str) {
        CACHE_LOOKUPS_TOTAL.with_label_values(&[cache, "hit"]).inc();
    }

    pub fn cache_miss(cache: &str) {
        CACHE_LOOKUPS_TOTAL.with_label_values(&[cache, "miss"]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
