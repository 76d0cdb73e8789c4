use axum::response::Json;
use serde_json::{json, Value};
use tracing::instrument;

/// Health check endpoint handler. Reports liveness only; no database check.
#[instrument(name = "health_check", fields(health.status = "healthy"))]
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
