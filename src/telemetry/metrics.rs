//! Metric instrument factories for catalog-worker.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("catalog-worker")
}

/// Counter: jobs started.
/// Labels: `method`.
pub fn jobs_started() -> Counter<u64> {
    meter()
        .u64_counter("catalog_worker.jobs.started")
        .with_description("Number of jobs started")
        .build()
}

/// Counter: jobs finished.
/// Labels: `method`, `result` ("ok" | "error").
pub fn jobs_finished() -> Counter<u64> {
    meter()
        .u64_counter("catalog_worker.jobs.finished")
        .with_description("Number of jobs finished")
        .build()
}

/// Counter: outbound HTTP requests.
/// Labels: `method`, `status`.
pub fn http_requests() -> Counter<u64> {
    meter()
        .u64_counter("catalog_worker.http.requests")
        .with_description("Number of HTTP requests sent to the remote API")
        .build()
}

/// Counter: response envelopes written.
/// Labels: `message_type`.
pub fn envelopes_written() -> Counter<u64> {
    meter()
        .u64_counter("catalog_worker.envelopes.written")
        .with_description("Number of response envelopes written")
        .build()
}

/// Histogram: job duration in milliseconds.
/// Labels: `method`.
pub fn job_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("catalog_worker.job.duration_ms")
        .with_description("Job duration in milliseconds")
        .with_unit("ms")
        .build()
}
