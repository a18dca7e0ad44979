//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Build targets and start background tasks (health checks, metrics, reload)
//! - Bind the gateway listener and serve until shutdown

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_config, watcher::ConfigWatcher, ConfigError};
use crate::health::HealthMonitor;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::{logging, metrics::serve_metrics, GatewayMetrics};
use crate::upstream::ForwardError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid target: {0}")]
    Target(#[from] ForwardError),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the gateway described by the config file at `config_path`.
pub async fn start(config_path: &Path) -> Result<(), StartupError> {
    let config = load_config(config_path)?;
    logging::init(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        targets = config.targets.len(),
        "rpc-gateway starting"
    );

    let shutdown = Shutdown::new();
    let signals = spawn_signal_handler(shutdown.clone());

    let (metrics, handle) = GatewayMetrics::from_config(&config.metrics)?;
    if let Some(handle) = handle {
        let listener = bind(&config.metrics.bind_address).await?;
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(listener, handle, rx).await {
                tracing::error!(error = %e, "Metrics endpoint failed");
            }
        });
    }

    let server = HttpServer::new(config.clone(), Arc::new(metrics.clone()))?;

    let monitor = HealthMonitor::new(server.targets(), config.health_checks.clone(), metrics);
    let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

    let (watcher, updates) = ConfigWatcher::new(config_path);
    let _watch_guard = watcher.run()?;

    let listener = bind(&config.proxy.bind_address).await?;
    let served = server.run(listener, updates, shutdown.subscribe()).await;

    // The server may have stopped on its own error.
    shutdown.trigger();
    signals.abort();
    let _ = monitor_task.await;

    tracing::info!("Shutdown complete");
    Ok(served?)
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}
