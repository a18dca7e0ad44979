//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Record one latency/status observation per backend attempt
//! - Count failed-over attempts per target
//! - Export target health from the health monitor
//! - Serve the Prometheus text format on the metrics address
//!
//! # Metrics
//! - `rpc_gateway_request_duration_seconds` (histogram): provider, method
//! - `rpc_gateway_target_response_status_total` (counter): provider, status_code
//! - `rpc_gateway_request_errors_handled_total` (counter): provider, type
//! - `rpc_gateway_target_healthy` (gauge): provider, 1=healthy 0=unhealthy
//! - `rpc_gateway_target_block_number` (gauge): provider
//!
//! # Design Decisions
//! - Recording goes through an injected recorder, never a process-wide global
//! - The routing core only sees the `AttemptRecorder` trait
//! - Metric updates are atomic and infallible; they cannot stall routing

use axum::{http::Method, http::StatusCode, routing::get, Router};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, NoopRecorder,
    Recorder, Unit,
};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::MetricsConfig;

pub const REQUEST_DURATION: &str = "rpc_gateway_request_duration_seconds";
pub const TARGET_RESPONSE_STATUS: &str = "rpc_gateway_target_response_status_total";
pub const REQUEST_ERRORS: &str = "rpc_gateway_request_errors_handled_total";
pub const TARGET_HEALTHY: &str = "rpc_gateway_target_healthy";
pub const TARGET_BLOCK_NUMBER: &str = "rpc_gateway_target_block_number";

/// Outcome label for attempts that triggered failover.
pub const REROUTED: &str = "rerouted";

const LATENCY_BUCKETS: [f64; 13] = [
    0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0,
];

/// What the router reports about one backend attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttemptOutcome<'a> {
    pub target: &'a str,
    pub method: &'a Method,
    pub status: StatusCode,
    pub elapsed: Duration,
    pub failed: bool,
}

/// Sink for per-attempt observations.
pub trait AttemptRecorder: Send + Sync {
    fn record_attempt(&self, outcome: &AttemptOutcome<'_>);
}

/// Gateway instruments bound to an injected `metrics` recorder.
#[derive(Clone)]
pub struct GatewayMetrics {
    recorder: Arc<dyn Recorder + Send + Sync>,
}

impl GatewayMetrics {
    pub fn new(recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        let metrics = Self { recorder };
        metrics.with_recorder(|| {
            describe_histogram!(
                REQUEST_DURATION,
                Unit::Seconds,
                "Histogram of response time for Gateway in seconds"
            );
            describe_counter!(
                TARGET_RESPONSE_STATUS,
                "Total number of responses with a statuscode label"
            );
            describe_counter!(
                REQUEST_ERRORS,
                "The total number of request errors handled by gateway"
            );
            describe_gauge!(TARGET_HEALTHY, "Target health status (1 = healthy, 0 = unhealthy)");
            describe_gauge!(TARGET_BLOCK_NUMBER, "Latest block number reported by the target");
        });
        metrics
    }

    /// Build a Prometheus-backed instance and the handle used to render it.
    pub fn prometheus() -> Result<(Self, PrometheusHandle), BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), &LATENCY_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();
        Ok((Self::new(Arc::new(recorder)), handle))
    }

    /// Instance that drops every observation.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopRecorder))
    }

    /// Prometheus-backed when the endpoint is enabled, no-op otherwise.
    ///
    /// The Prometheus recorder buffers histogram samples until rendered, so it is
    /// only built when something will scrape it.
    pub fn from_config(
        config: &MetricsConfig,
    ) -> Result<(Self, Option<PrometheusHandle>), BuildError> {
        if !config.enabled {
            return Ok((Self::disabled(), None));
        }
        let (metrics, handle) = Self::prometheus()?;
        Ok((metrics, Some(handle)))
    }

    fn with_recorder<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self.recorder.as_ref(), f)
    }

    pub fn record_target_health(&self, target: &str, healthy: bool) {
        self.with_recorder(|| {
            gauge!(TARGET_HEALTHY, "provider" => target.to_string())
                .set(if healthy { 1.0 } else { 0.0 });
        });
    }

    pub fn record_block_number(&self, target: &str, block: u64) {
        self.with_recorder(|| {
            gauge!(TARGET_BLOCK_NUMBER, "provider" => target.to_string()).set(block as f64);
        });
    }
}

impl AttemptRecorder for GatewayMetrics {
    fn record_attempt(&self, outcome: &AttemptOutcome<'_>) {
        self.with_recorder(|| {
            counter!(
                TARGET_RESPONSE_STATUS,
                "provider" => outcome.target.to_string(),
                "status_code" => outcome.status.as_u16().to_string()
            )
            .increment(1);
            histogram!(
                REQUEST_DURATION,
                "provider" => outcome.target.to_string(),
                "method" => outcome.method.to_string()
            )
            .record(outcome.elapsed.as_secs_f64());

            if outcome.failed {
                counter!(
                    REQUEST_ERRORS,
                    "provider" => outcome.target.to_string(),
                    "type" => REROUTED
                )
                .increment(1);
            }
        });
    }
}

/// Serve `GET /metrics` until shutdown.
pub async fn serve_metrics(
    listener: TcpListener,
    handle: PrometheusHandle,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr: SocketAddr = listener.local_addr()?;

    let upkeep = handle.clone();
    let upkeep_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            upkeep.run_upkeep();
        }
    });

    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    tracing::info!(address = %addr, "Metrics endpoint listening");
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await;

    upkeep_task.abort();
    tracing::info!("Metrics endpoint stopped");
    result
}
