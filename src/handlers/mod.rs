pub mod health;
pub mod metrics;
pub mod simulate;
pub mod tasks;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use simulate::{simulate_error, simulate_slow};
pub use tasks::{create_task, delete_task, get_task, list_tasks, update_task, ApiState};

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::observability::{observability_middleware, Metrics};
use crate::repositories::TaskRepository;

/// Assemble the application router with all routes and the instrumentation
/// middleware wrapped around them.
pub fn create_router(metrics: Arc<Metrics>, repository: Arc<dyn TaskRepository>) -> Router {
    let metrics_for_middleware = metrics.clone();
    let state = ApiState { repository };

    Router::new()
        // Health and metrics endpoints (with metrics state)
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        // Task CRUD and simulation endpoints (with API state)
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/simulate-error", get(simulate_error))
        .route("/api/simulate-slow", get(simulate_slow))
        .with_state(state)
        // Middleware layers (outer to inner)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
