//! Request and job span helpers.
//!
//! Provides span creation and state-transition recording for requests and
//! jobs flowing through the engine.

use tracing::Span;

/// Start a span covering one request envelope from dispatch to eof.
pub fn start_request_span(message_id: &str, account: &str, jobs: usize) -> Span {
    tracing::info_span!(
        "request.process",
        "request.message_id" = message_id,
        "request.account" = account,
        "request.jobs" = jobs,
    )
}

/// Start a span for one job executor.
///
/// The `job.state` field is declared empty and can be updated via
/// [`record_state_transition`].
pub fn start_job_span(method: &str, href_slug: &str) -> Span {
    tracing::info_span!(
        "job.execute",
        "job.method" = method,
        "job.href_slug" = href_slug,
        "job.state" = tracing::field::Empty,
    )
}

/// Record a state transition on the given span.
///
/// Updates `job.state` and emits an `info` event scoped to the span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.record("job.state", to);
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
