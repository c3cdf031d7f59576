//! Metric names.
//!
//! Metrics are emitted through the `metrics` facade; without an installed
//! recorder they are no-ops.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `vectorgate_requests_total` | counter | `operation`, `status` |
//! | `vectorgate_request_duration_ms` | histogram | `operation` |
//! | `vectorgate_documents_upserted_total` | counter | |
//! | `vectorgate_filters_compiled_total` | counter | |

/// Client operations, labelled by outcome.
pub const REQUESTS_TOTAL: &str = "vectorgate_requests_total";

/// Client operation latency.
pub const REQUEST_DURATION_MS: &str = "vectorgate_request_duration_ms";

/// Documents written by upsert.
pub const DOCUMENTS_UPSERTED_TOTAL: &str = "vectorgate_documents_upserted_total";

/// Filters compiled.
pub const FILTERS_COMPILED_TOTAL: &str = "vectorgate_filters_compiled_total";

/// Records the outcome and latency of one client operation.
pub fn record_request<T>(
    operation: &'static str,
    started: std::time::Instant,
    result: &crate::Result<T>,
) {
    let status = match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::counter!(REQUESTS_TOTAL, "operation" => operation, "status" => status).increment(1);
    metrics::histogram!(REQUEST_DURATION_MS, "operation" => operation)
        .record(started.elapsed().as_secs_f64() * 1000.0);
}
