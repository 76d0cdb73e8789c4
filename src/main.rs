use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use tasktrack_rs::{
    handlers::create_router,
    init_observability,
    observability::DbQueryTimer,
    repositories::{init_schema, SqliteTaskRepository},
    shutdown_observability, Config, Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (no logging is configured yet)
    let config = Config::from_env().context("Failed to load configuration")?;

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        config.observability.enable_json_logging,
    )?;

    info!("Starting tasktrack-rs service");
    info!(
        "Service: {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!("Database: {}", config.database.path);

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .context("Failed to create database directory")?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&config.database.path)
                .create_if_missing(true),
        )
        .await
        .context("Failed to open database")?;
    init_schema(&pool).await?;
    info!("Database initialized");

    let repository = Arc::new(SqliteTaskRepository::new(
        pool,
        DbQueryTimer::new(metrics.clone()),
    ));

    let app = create_router(metrics, repository);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Shutdown signal received");
        shutdown_observability().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
