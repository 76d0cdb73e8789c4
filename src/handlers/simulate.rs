use axum::{extract::Query, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, instrument, Span};

/// Query parameters for the slow-response simulation.
#[derive(Debug, Deserialize)]
pub struct SimulateSlowQuery {
    pub delay: Option<f64>,
}

/// Force an error span and log record for testing the observability
/// pipeline.
#[instrument(name = "simulate_error", fields(
    error.simulated = true,
    otel.status_code = tracing::field::Empty,
))]
pub async fn simulate_error() -> (StatusCode, Json<Value>) {
    Span::current().record("otel.status_code", "ERROR");
    error!("Simulated error triggered for testing");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "This is a simulated error" })),
    )
}

/// Block the handling worker for the requested number of seconds. Used to
/// exercise latency SLOs; the pipeline deliberately applies no timeout.
#[instrument(name = "simulate_slow_request", skip_all, fields(
    delay.seconds = tracing::field::Empty,
))]
pub async fn simulate_slow(Query(query): Query<SimulateSlowQuery>) -> Json<Value> {
    let delay = query.delay.unwrap_or(2.0).max(0.0);
    Span::current().record("delay.seconds", delay);

    info!("Simulating slow request with {}s delay", delay);
    tokio::time::sleep(Duration::from_secs_f64(delay)).await;

    Json(json!({
        "message": format!("Delayed response after {} seconds", delay)
    }))
}
