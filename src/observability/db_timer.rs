use std::{sync::Arc, time::Instant};
use tracing::{error, instrument, Span};

use super::Metrics;

/// Classify a SQL statement by its leading keyword.
///
/// Matching is case-insensitive and ignores leading/trailing whitespace;
/// anything that is not SELECT/INSERT/UPDATE/DELETE classifies as "other".
pub fn classify_statement(sql: &str) -> &'static str {
    let keyword = sql.trim().split_whitespace().next().unwrap_or("");
    if keyword.eq_ignore_ascii_case("select") {
        "select"
    } else if keyword.eq_ignore_ascii_case("insert") {
        "insert"
    } else if keyword.eq_ignore_ascii_case("update") {
        "update"
    } else if keyword.eq_ignore_ascii_case("delete") {
        "delete"
    } else {
        "other"
    }
}

/// One in-flight statement measurement: start instant plus classified
/// operation kind. Produces exactly one histogram observation when finished.
#[derive(Debug)]
pub struct DbOperationSample {
    started_at: Instant,
    operation: &'static str,
}

impl DbOperationSample {
    /// "Before execute" hook: capture the start instant and classify the
    /// statement.
    pub fn start(sql: &str) -> Self {
        Self {
            started_at: Instant::now(),
            operation: classify_statement(sql),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// "After execute" hook. A missing sample (the before hook never fired)
    /// is a no-op rather than an error.
    pub fn finish(sample: Option<Self>, metrics: &Metrics, table: &str) {
        let Some(sample) = sample else {
            return;
        };
        let duration_seconds = sample.started_at.elapsed().as_secs_f64();
        metrics.record_database_query(sample.operation, table, duration_seconds);
    }
}

/// Timing decorator around the persistence layer's statement execution.
///
/// Wraps each execution future with the before/after sample hooks so every
/// statement issued during a request produces one observation in the
/// database duration histogram, on success and on failure alike.
#[derive(Clone)]
pub struct DbQueryTimer {
    metrics: Arc<Metrics>,
}

impl DbQueryTimer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Execute one statement, observing its latency under the statement's
    /// classified operation kind.
    #[instrument(skip_all, fields(
        db.operation = tracing::field::Empty,
        db.table = %table,
    ))]
    pub async fn execute<F, T, E>(&self, table: &str, sql: &str, future: F) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let sample = DbOperationSample::start(sql);
        Span::current().record("db.operation", sample.operation());

        let result = future.await;
        if let Err(e) = &result {
            error!(error = %e, "Database statement failed");
        }
        DbOperationSample::finish(Some(sample), &self.metrics, table);

        result
    }
}
