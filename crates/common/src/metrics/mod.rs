//! Metrics and observability utilities
//!
//! Prometheus metrics with latency histograms and standardized naming.
//! The recorder is installed by the binaries; without one these helpers
//! are no-ops.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ReviewerFinder metrics
pub const METRICS_PREFIX: &str = "reviewer_finder";

/// Histogram buckets for request and search latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00, 30.00,
];

/// Buckets for embedding latency (typically slower)
pub const EMBEDDING_BUCKETS: &[f64] = &[
    0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 30.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
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

    // Pipeline
    describe_counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        Unit::Count,
        "Reviewer searches by outcome"
    );
    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end reviewer search latency"
    );
    describe_histogram!(
        format!("{}_stage_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Latency of a single pipeline stage"
    );
    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Reviewers returned by the last search"
    );
    describe_counter!(
        format!("{}_skipped_records_total", METRICS_PREFIX),
        Unit::Count,
        "Index hits dropped because the author record was missing or malformed"
    );
    describe_counter!(
        format!("{}_coi_flags_total", METRICS_PREFIX),
        Unit::Count,
        "Conflict-of-interest flags raised, by type"
    );

    // Embedding
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding requests"
    );
    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );
    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding errors"
    );

    // Enrichment and indexing
    describe_counter!(
        format!("{}_enrichment_lookups_total", METRICS_PREFIX),
        Unit::Count,
        "Contact lookups by source and outcome"
    );
    describe_counter!(
        format!("{}_authors_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Author records written to the vector index"
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

/// Record a finished reviewer search
pub fn record_search(duration_secs: f64, outcome: &str, result_count: usize) {
    counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Record the latency of one pipeline stage
pub fn record_stage(stage: &'static str, duration_secs: f64) {
    histogram!(
        format!("{}_stage_duration_seconds", METRICS_PREFIX),
        "stage" => stage
    )
    .record(duration_secs);
}

/// Record index hits dropped during hydration
pub fn record_skipped_records(count: usize) {
    if count > 0 {
        counter!(format!("{}_skipped_records_total", METRICS_PREFIX)).increment(count as u64);
    }
}

/// Record one raised conflict-of-interest flag
pub fn record_coi_flag(coi_type: &str) {
    counter!(
        format!("{}_coi_flags_total", METRICS_PREFIX),
        "type" => coi_type.to_string()
    )
    .increment(1);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(batch_size as u64);
    }
}

/// Record one contact lookup against an external source
pub fn record_enrichment(source: &str, success: bool) {
    counter!(
        format!("{}_enrichment_lookups_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "status" => if success { "success" } else { "error" }
    )
    .increment(1);
}

/// Record author records written to the index
pub fn record_indexed(count: usize) {
    counter!(format!("{}_authors_indexed_total", METRICS_PREFIX)).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_are_sorted() {
        for buckets in [LATENCY_BUCKETS, EMBEDDING_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
    }

    #[test]
    fn test_helpers_without_recorder() {
        let metrics = RequestMetrics::start("POST", "/v1/reviewers/search");
        metrics.finish(200);
        record_search(0.2, "ok", 10);
        record_stage("scoring", 0.001);
        record_skipped_records(2);
        record_coi_flag("co_authorship");
        record_enrichment("orcid", false);
    }
}
