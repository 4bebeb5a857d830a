//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming. Descriptions are registered
//! once at startup; the exporter itself is installed by the binary.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all BUD.ai metrics
pub const METRICS_PREFIX: &str = "budai";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s (bulk imports)
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Recommendation metrics
    describe_counter!(
        format!("{}_recommendations_total", METRICS_PREFIX),
        Unit::Count,
        "Recommendation requests by resolution strategy"
    );

    describe_gauge!(
        format!("{}_recommendation_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of strains returned by the last recommendation"
    );

    // Import metrics
    describe_counter!(
        format!("{}_imports_total", METRICS_PREFIX),
        Unit::Count,
        "Imported source URLs by outcome"
    );

    // Store metrics
    describe_histogram!(
        format!("{}_store_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Strain store operation latency in seconds"
    );

    describe_counter!(
        format!("{}_store_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Failed strain store operations"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a resolved recommendation
pub fn record_recommendation(strategy: &str, result_count: usize) {
    counter!(
        format!("{}_recommendations_total", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .increment(1);

    gauge!(format!("{}_recommendation_results_count", METRICS_PREFIX))
        .set(result_count as f64);
}

/// Helper to record one imported URL
pub fn record_import(status: &str) {
    counter!(
        format!("{}_imports_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Helper to record a store round trip
pub fn record_store_query(operation: &'static str, started: Instant, success: bool) {
    histogram!(
        format!("{}_store_query_duration_seconds", METRICS_PREFIX),
        "operation" => operation
    )
    .record(started.elapsed().as_secs_f64());

    if !success {
        counter!(
            format!("{}_store_errors_total", METRICS_PREFIX),
            "operation" => operation
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls must be no-ops
        let metrics = RequestMetrics::start("GET", "/api/strains");
        metrics.finish(200);
        record_recommendation("matched", 3);
        record_import("imported");
        record_store_query("query", Instant::now(), false);
    }
}
