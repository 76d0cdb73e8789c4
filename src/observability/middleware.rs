use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::{sync::Arc, time::Instant};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{get_current_span_id, get_current_trace_id, Metrics};

/// Endpoint label used when no route matched the request path.
const UNKNOWN_ENDPOINT: &str = "unknown";

/// Request instrumentation middleware: wraps every inbound request in a span,
/// logs the received/completed milestones with correlation ids, and records
/// the request counter, duration histogram, and error counter exactly once
/// per request.
#[instrument(skip_all, fields(
    request_id = %Uuid::new_v4(),
    method = %request.method(),
    uri = %request.uri(),
    endpoint = tracing::field::Empty,
))]
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    // One clock read shared by the completion log and the histogram
    // observation.
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    // Matched route template keeps label cardinality bounded by the set of
    // declared routes.
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_ENDPOINT.to_string());

    tracing::Span::current().record("endpoint", endpoint.as_str());

    info!(
        method = %method,
        path = %path,
        trace_id = get_current_trace_id().as_deref(),
        span_id = get_current_span_id().as_deref(),
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start_time.elapsed();
    let duration_seconds = duration.as_secs_f64();
    let status_code = response.status().as_u16();

    metrics.record_http_request(&method, &endpoint, status_code, duration_seconds);

    if status_code >= 400 {
        error!(
            method = %method,
            path = %path,
            status_code = status_code,
            duration_seconds = duration_seconds,
            trace_id = get_current_trace_id().as_deref(),
            span_id = get_current_span_id().as_deref(),
            "Request completed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status_code = status_code,
            duration_seconds = duration_seconds,
            trace_id = get_current_trace_id().as_deref(),
            span_id = get_current_span_id().as_deref(),
            "Request completed"
        );
    }

    response
}
