pub mod db_timer;
pub mod metrics;
pub mod middleware;
pub mod tracing;

pub use db_timer::{classify_statement, DbOperationSample, DbQueryTimer};
pub use metrics::{Metrics, MetricsError};
pub use middleware::observability_middleware;
pub use tracing::{
    get_current_span_id, get_current_trace_id, init_observability, shutdown_observability,
    ObservabilityError,
};
