//! Prometheus metrics for the trading loop.
//!
//! This module provides metrics for:
//! - Iteration latency and outcomes
//! - Market data fetch latency
//! - Order placement and cancellation counts

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Full iteration latency metric name.
pub const METRIC_ITERATION_LATENCY: &str = "iteration_latency_ms";
/// Market snapshot fetch latency metric name.
pub const METRIC_SNAPSHOT_FETCH_LATENCY: &str = "snapshot_fetch_latency_ms";
/// Order placement latency metric name.
pub const METRIC_ORDER_PLACE_LATENCY: &str = "order_place_latency_ms";
/// Iterations counter metric name.
pub const METRIC_ITERATIONS: &str = "engine_iterations_total";
/// Failed iterations counter metric name.
pub const METRIC_ITERATION_FAILURES: &str = "engine_iteration_failures_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Orders placed counter metric name.
pub const METRIC_ORDERS_PLACED: &str = "orders_placed_total";
/// Orders failed counter metric name.
pub const METRIC_ORDERS_FAILED: &str = "orders_failed_total";
/// Open-order polls counter metric name.
pub const METRIC_OPEN_ORDER_POLLS: &str = "open_order_polls_total";
/// Forced cancel sweeps counter metric name.
pub const METRIC_FORCED_CANCELS: &str = "forced_cancels_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_ITERATION_LATENCY,
        "Full engine iteration latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SNAPSHOT_FETCH_LATENCY,
        "Market snapshot fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_ORDER_PLACE_LATENCY,
        "Order placement latency in milliseconds"
    );

    // Counters
    describe_counter!(METRIC_ITERATIONS, "Total number of engine iterations");
    describe_counter!(
        METRIC_ITERATION_FAILURES,
        "Total number of engine iterations that ended in an error"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );
    describe_counter!(METRIC_ORDERS_PLACED, "Total number of orders placed");
    describe_counter!(
        METRIC_ORDERS_FAILED,
        "Total number of orders that failed to place"
    );
    describe_counter!(
        METRIC_OPEN_ORDER_POLLS,
        "Total number of open-order status polls"
    );
    describe_counter!(
        METRIC_FORCED_CANCELS,
        "Total number of forced cancel sweeps for stale orders"
    );

    debug!("Metrics initialized");
}

/// Record market snapshot fetch latency.
pub fn record_snapshot_fetch_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_SNAPSHOT_FETCH_LATENCY).record(latency_ms);
}

/// Record order placement latency.
pub fn record_order_place_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_ORDER_PLACE_LATENCY).record(latency_ms);
}

/// Increment iteration counter.
pub fn inc_iterations() {
    counter!(METRIC_ITERATIONS).increment(1);
}

/// Increment failed iteration counter.
pub fn inc_iteration_failures() {
    counter!(METRIC_ITERATION_FAILURES).increment(1);
}

/// Increment opportunities detected counter.
pub fn inc_opportunities_detected() {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(1);
}

/// Increment orders placed counter by the number of accepted legs.
pub fn inc_orders_placed(count: u64) {
    counter!(METRIC_ORDERS_PLACED).increment(count);
}

/// Increment orders failed counter.
pub fn inc_orders_failed() {
    counter!(METRIC_ORDERS_FAILED).increment(1);
}

/// Increment open-order poll counter.
pub fn inc_open_order_polls() {
    counter!(METRIC_OPEN_ORDER_POLLS).increment(1);
}

/// Increment forced cancel sweep counter.
pub fn inc_forced_cancels() {
    counter!(METRIC_FORCED_CANCELS).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a full engine iteration.
pub fn timer_iteration() -> LatencyTimer {
    LatencyTimer::new(METRIC_ITERATION_LATENCY)
}

/// Create a latency timer for a market snapshot fetch.
pub fn timer_snapshot_fetch() -> LatencyTimer {
    LatencyTimer::new(METRIC_SNAPSHOT_FETCH_LATENCY)
}
