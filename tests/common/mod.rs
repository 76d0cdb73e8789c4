use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

use tasktrack_rs::handlers::create_router;
use tasktrack_rs::observability::DbQueryTimer;
use tasktrack_rs::repositories::{init_schema, SqliteTaskRepository};
use tasktrack_rs::Metrics;

/// A running instance of the full application on an ephemeral port, backed
/// by its own SQLite file and metrics registry.
pub struct TestEnvironment {
    pub client: reqwest::Client,
    pub base_url: String,
    pub metrics: Arc<Metrics>,
    _data_dir: TempDir,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let data_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(data_dir.path().join("tasks.db"))
                    .create_if_missing(true),
            )
            .await
            .expect("Failed to open test database");
        init_schema(&pool).await.expect("Failed to init schema");

        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let repository = Arc::new(SqliteTaskRepository::new(
            pool,
            DbQueryTimer::new(metrics.clone()),
        ));

        let app = create_router(metrics.clone(), repository);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            client: reqwest::Client::new(),
            base_url,
            metrics,
            _data_dir: data_dir,
        }
    }

    pub fn request_count(&self, method: &str, endpoint: &str, status: &str) -> u64 {
        self.metrics
            .http_requests_total
            .get_metric_with_label_values(&[method, endpoint, status])
            .map(|c| c.get() as u64)
            .unwrap_or(0)
    }

    pub fn error_count(&self, method: &str, endpoint: &str, status: &str) -> u64 {
        self.metrics
            .http_errors_total
            .get_metric_with_label_values(&[method, endpoint, status])
            .map(|c| c.get() as u64)
            .unwrap_or(0)
    }

    pub fn duration_sample_count(&self, method: &str, endpoint: &str, status: &str) -> u64 {
        self.metrics
            .http_request_duration_seconds
            .get_metric_with_label_values(&[method, endpoint, status])
            .map(|h| h.get_sample_count())
            .unwrap_or(0)
    }

    pub fn duration_sample_sum(&self, method: &str, endpoint: &str, status: &str) -> f64 {
        self.metrics
            .http_request_duration_seconds
            .get_metric_with_label_values(&[method, endpoint, status])
            .map(|h| h.get_sample_sum())
            .unwrap_or(0.0)
    }

    pub fn db_sample_count(&self, operation: &str) -> u64 {
        self.metrics
            .database_query_duration_seconds
            .get_metric_with_label_values(&[operation, "tasks"])
            .map(|h| h.get_sample_count())
            .unwrap_or(0)
    }

    /// Total requests recorded across every (method, endpoint, status) series.
    pub fn total_request_count(&self) -> u64 {
        self.metrics
            .registry()
            .gather()
            .iter()
            .filter(|family| family.get_name() == "http_requests_total")
            .flat_map(|family| family.get_metric())
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }
}
