use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

/// Bucket boundaries for database statement latency, in seconds
/// (2ms .. 2s).
const DB_DURATION_BUCKETS: &[f64] = &[
    0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0,
];

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

/// Prometheus metrics for the request-observability pipeline.
///
/// This registry is the single source of exported metrics; span attributes
/// carry supplementary detail but are never re-exported as metrics, so no
/// count is ever emitted twice.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_errors_total: CounterVec,

    // Database metrics
    pub database_query_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new metrics instance with all series registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests"),
            &["method", "endpoint", "status_code"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint", "status_code"],
        )?;

        let http_errors_total = CounterVec::new(
            Opts::new("http_errors_total", "Total HTTP errors"),
            &["method", "endpoint", "status_code"],
        )?;

        let database_query_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "database_query_duration_seconds",
                "Database query duration in seconds",
            )
            .buckets(DB_DURATION_BUCKETS.to_vec()),
            &["operation", "table"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(database_query_duration_seconds.clone()))?;

        Ok(Metrics {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_errors_total,
            database_query_duration_seconds,
        })
    }

    /// Get the underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    /// Record the completion of one HTTP request: exactly one counter
    /// increment and one duration observation, plus one error increment
    /// when the status is 4xx/5xx.
    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status_str = status_code.to_string();
        let labels = [method, endpoint, status_str.as_str()];

        self.http_requests_total.with_label_values(&labels).inc();

        self.http_request_duration_seconds
            .with_label_values(&labels)
            .observe(duration_seconds);

        if status_code >= 400 {
            self.http_errors_total.with_label_values(&labels).inc();
        }
    }

    /// Record one database statement execution under its classified
    /// operation kind.
    pub fn record_database_query(&self, operation: &str, table: &str, duration_seconds: f64) {
        self.database_query_duration_seconds
            .with_label_values(&[operation, table])
            .observe(duration_seconds);
    }
}
