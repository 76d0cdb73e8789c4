use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Span};

use crate::models::{CreateTaskRequest, Task, TaskError, TaskListResponse, UpdateTaskRequest};
use crate::repositories::TaskRepository;

/// Shared application state for the task endpoints.
#[derive(Clone)]
pub struct ApiState {
    pub repository: Arc<dyn TaskRepository>,
}

type ApiError = (StatusCode, Json<Value>);

/// Map a task error to its HTTP response, recording server-side failures on
/// the active span before translating.
fn error_response(err: &TaskError) -> ApiError {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        Span::current().record("otel.status_code", "ERROR");
        error!(error = %err, "Request failed");
    }

    (status, Json(json!({ "error": err.client_message() })))
}

/// Get all tasks
#[instrument(name = "get_all_tasks", skip(state), fields(
    db.result.count = tracing::field::Empty,
    otel.status_code = tracing::field::Empty,
))]
pub async fn list_tasks(
    State(state): State<ApiState>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let tasks = state
        .repository
        .find_all()
        .await
        .map_err(|err| error_response(&err))?;

    Span::current().record("db.result.count", tasks.len());
    info!("Retrieved {} tasks from database", tasks.len());

    let count = tasks.len();
    Ok(Json(TaskListResponse { tasks, count }))
}

/// Get a specific task
#[instrument(name = "get_task_by_id", skip(state), fields(
    task.id = %task_id,
    task.found = tracing::field::Empty,
    otel.status_code = tracing::field::Empty,
))]
pub async fn get_task(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .repository
        .find_by_id(task_id)
        .await
        .map_err(|err| error_response(&err))?;

    match task {
        Some(task) => {
            Span::current().record("task.found", true);
            info!("Retrieved task {}", task_id);
            Ok(Json(task))
        }
        None => {
            Span::current().record("task.found", false);
            warn!("Task {} not found", task_id);
            Err(error_response(&TaskError::NotFound { id: task_id }))
        }
    }
}

/// Create a new task
#[instrument(name = "create_task", skip_all, fields(
    task.id = tracing::field::Empty,
    task.title = tracing::field::Empty,
    validation.failed = tracing::field::Empty,
    otel.status_code = tracing::field::Empty,
))]
pub async fn create_task(
    State(state): State<ApiState>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let new_task = match request.into_new_task() {
        Ok(new_task) => new_task,
        Err(err) => {
            Span::current().record("validation.failed", true);
            warn!("Task creation failed: missing title");
            return Err(error_response(&err));
        }
    };

    Span::current().record("task.title", new_task.title.as_str());

    let task = state
        .repository
        .create(new_task)
        .await
        .map_err(|err| error_response(&err))?;

    Span::current().record("task.id", task.id);
    info!("Created new task {}: {}", task.id, task.title);

    Ok((StatusCode::CREATED, Json(task)))
}

/// Update an existing task
#[instrument(name = "update_task", skip(state, request), fields(
    task.id = %task_id,
    task.completed = tracing::field::Empty,
    otel.status_code = tracing::field::Empty,
))]
pub async fn update_task(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    if let Some(completed) = request.completed {
        Span::current().record("task.completed", completed);
    }

    match state.repository.update(task_id, request.into()).await {
        Ok(task) => {
            info!("Updated task {}", task_id);
            Ok(Json(task))
        }
        Err(err @ TaskError::NotFound { .. }) => {
            warn!("Task {} not found for update", task_id);
            Err(error_response(&err))
        }
        Err(err) => Err(error_response(&err)),
    }
}

/// Delete a task
#[instrument(name = "delete_task", skip(state), fields(
    task.id = %task_id,
    otel.status_code = tracing::field::Empty,
))]
pub async fn delete_task(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    match state.repository.delete(task_id).await {
        Ok(()) => {
            info!("Deleted task {}", task_id);
            Ok(Json(json!({ "message": "Task deleted successfully" })))
        }
        Err(err @ TaskError::NotFound { .. }) => {
            warn!("Task {} not found for deletion", task_id);
            Err(error_response(&err))
        }
        Err(err) => Err(error_response(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{DbQueryTimer, Metrics};
    use crate::repositories::{init_schema, SqliteTaskRepository};
    use axum::{
        body::Body,
        http::{Method, Request},
        routing::get,
        Router,
    };
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();

        let metrics = Arc::new(Metrics::new().unwrap());
        let repository = Arc::new(SqliteTaskRepository::new(
            pool,
            DbQueryTimer::new(metrics),
        ));
        let state = ApiState { repository };

        Router::new()
            .route("/api/tasks", get(list_tasks).post(create_task))
            .route(
                "/api/tasks/:id",
                get(get_task).put(update_task).delete(delete_task),
            )
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/tasks",
                json!({"title": "a", "description": "b"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["title"], "a");
        assert_eq!(created["description"], "b");
        assert_eq!(created["completed"], json!(false));
        let id = created["id"].as_i64().unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/tasks/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["title"], "a");
        assert!(chrono::DateTime::parse_from_rfc3339(
            fetched["created_at"].as_str().unwrap()
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_create_without_title_returns_400() {
        let app = test_app().await;

        let response = app
            .oneshot(json_request(Method::POST, "/api/tasks", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Title is required");
    }

    #[tokio::test]
    async fn test_get_missing_task_returns_404() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tasks/999999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Task not found");
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/tasks",
                json!({"title": "keep", "description": "keep too"}),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/tasks/{id}"),
                json!({"completed": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["title"], "keep");
        assert_eq!(updated["description"], "keep too");
        assert_eq!(updated["completed"], json!(true));
    }

    #[tokio::test]
    async fn test_update_with_null_description_clears_it() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/tasks",
                json!({"title": "keep", "description": "stale notes"}),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/tasks/{id}"),
                json!({"description": null}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["title"], "keep");
        assert_eq!(updated["description"], json!(null));
    }

    #[tokio::test]
    async fn test_update_missing_task_returns_404() {
        let app = test_app().await;

        let response = app
            .oneshot(json_request(
                Method::PUT,
                "/api/tasks/999999",
                json!({"title": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_task() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/tasks",
                json!({"title": "bye"}),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/tasks/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Task deleted successfully");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/tasks/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
