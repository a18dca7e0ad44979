//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check target identity (names present and unique)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one target must be configured")]
    NoTargets,

    #[error("target #{index} has an empty name")]
    EmptyTargetName { index: usize },

    #[error("target name '{0}' is configured more than once")]
    DuplicateTargetName(String),

    #[error("target '{name}' has an invalid url '{url}': {reason}")]
    InvalidTargetUrl { name: String, url: String, reason: String },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} is not a valid socket address: '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "proxy.bind_address", &config.proxy.bind_address);
    if config.proxy.upstream_timeout_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "proxy.upstream_timeout_ms" });
    }
    if config.proxy.max_body_bytes == 0 {
        errors.push(ValidationError::NotPositive { field: "proxy.max_body_bytes" });
    }

    if config.metrics.enabled {
        check_address(&mut errors, "metrics.bind_address", &config.metrics.bind_address);
    }

    let health = &config.health_checks;
    if health.enabled {
        if health.interval_secs == 0 {
            errors.push(ValidationError::NotPositive { field: "health_checks.interval_secs" });
        }
        if health.timeout_secs == 0 {
            errors.push(ValidationError::NotPositive { field: "health_checks.timeout_secs" });
        }
        if health.failure_threshold == 0 {
            errors.push(ValidationError::NotPositive { field: "health_checks.failure_threshold" });
        }
        if health.success_threshold == 0 {
            errors.push(ValidationError::NotPositive { field: "health_checks.success_threshold" });
        }
    }

    if config.targets.is_empty() {
        errors.push(ValidationError::NoTargets);
    }

    let mut seen = HashSet::new();
    for (index, target) in config.targets.iter().enumerate() {
        if target.name.trim().is_empty() {
            errors.push(ValidationError::EmptyTargetName { index });
        } else if !seen.insert(target.name.as_str()) {
            errors.push(ValidationError::DuplicateTargetName(target.name.clone()));
        }

        let raw = &target.connection.http.url;
        if let Err(reason) = check_target_url(raw) {
            errors.push(ValidationError::InvalidTargetUrl {
                name: target.name.clone(),
                url: raw.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_target_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
