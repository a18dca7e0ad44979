//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the RPC gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway-wide proxy settings (listener, upstream timeout).
    pub proxy: ProxySettings,

    /// Metrics exposition settings.
    pub metrics: MetricsConfig,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Active health check settings.
    pub health_checks: HealthCheckConfig,

    /// Backend targets, in failover priority order.
    pub targets: Vec<TargetConfig>,
}

/// Listener and per-attempt settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Upper bound for a single backend attempt, in milliseconds.
    pub upstream_timeout_ms: u64,

    /// Largest inbound request body the gateway will capture.
    pub max_body_bytes: usize,
}

impl ProxySettings {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            upstream_timeout_ms: 1_000,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// One backend RPC endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Unique target identifier, used as the `provider` metric label.
    pub name: String,

    /// How to reach the target.
    pub connection: ConnectionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub http: HttpConnectionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConnectionConfig {
    /// Base URL of the endpoint (e.g., "https://mainnet.example.org/v1/key").
    pub url: String,

    /// Whether the target accepts gzip-encoded request bodies.
    #[serde(default)]
    pub compression: bool,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Number of consecutive failures before marking unhealthy.
    pub failure_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub success_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            timeout_secs: 1,
            failure_threshold: 2,
            success_threshold: 1,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the metrics endpoint.
    pub enabled: bool,

    /// Metrics endpoint bind address.
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
