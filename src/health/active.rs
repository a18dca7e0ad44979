//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every target with `eth_blockNumber`
//! - Update target health state and latest block number
//! - Export health as gauges

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::state::HealthState;
use crate::observability::GatewayMetrics;
use crate::resilience::timeouts::bounded;
use crate::upstream::{Target, Targets};

const PROBE_BODY: &str = r#"{"jsonrpc":"2.0","id":1,"method":"eth_blockNumber","params":[]}"#;
const MAX_PROBE_RESPONSE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build probe request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("probe timed out")]
    Timeout,

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("failed to read probe response: {0}")]
    Body(#[from] axum::Error),

    #[error("invalid JSON-RPC response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("JSON-RPC response carried no block number")]
    MissingResult,
}

#[derive(Deserialize)]
struct BlockNumberResponse {
    result: Option<String>,
}

pub struct HealthMonitor {
    targets: Arc<Targets>,
    config: HealthCheckConfig,
    metrics: GatewayMetrics,
}

impl HealthMonitor {
    pub fn new(targets: Arc<Targets>, config: HealthCheckConfig, metrics: GatewayMetrics) -> Self {
        Self {
            targets,
            config,
            metrics,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(interval = self.config.interval_secs, "Health monitor starting");

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every target in the live set once.
    pub async fn check_all(&self) {
        let targets = self.targets.snapshot();

        for target in targets.iter() {
            let timeout = Duration::from_secs(self.config.timeout_secs);
            let transition = match probe(target, timeout).await {
                Ok(block) => {
                    target.health().set_block_number(block);
                    self.metrics.record_block_number(target.name(), block);
                    target
                        .health()
                        .mark_success(self.config.success_threshold as usize)
                }
                Err(e) => {
                    tracing::debug!(provider = target.name(), error = %e, "Health check failed");
                    target
                        .health()
                        .mark_failure(self.config.failure_threshold as usize)
                }
            };

            match transition {
                Some(HealthState::Healthy) => {
                    tracing::info!(provider = target.name(), "Target is healthy")
                }
                Some(HealthState::Unhealthy) => {
                    tracing::warn!(provider = target.name(), "Target is unhealthy")
                }
                _ => {}
            }

            self.metrics
                .record_target_health(target.name(), target.health().is_healthy());
        }
    }
}

/// Ask a target for its latest block number through its own pipeline.
pub async fn probe(target: &Target, timeout: Duration) -> Result<u64, ProbeError> {
    let request = Request::post("/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "rpc-gateway-health-check")
        .body(Body::from(PROBE_BODY))?;

    let body = bounded(timeout, async {
        let response = target.upstream().forward(request).await;
        if !response.status().is_success() {
            return Err(ProbeError::Status(response.status()));
        }
        Ok::<_, ProbeError>(axum::body::to_bytes(response.into_body(), MAX_PROBE_RESPONSE).await?)
    })
    .await
    .ok_or(ProbeError::Timeout)??;

    let decoded: BlockNumberResponse = serde_json::from_slice(&body)?;
    decoded
        .result
        .as_deref()
        .and_then(parse_quantity)
        .ok_or(ProbeError::MissingResult)
}

/// Parse a JSON-RPC hex quantity such as `"0x1b4"`.
pub fn parse_quantity(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}
