//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::io::Write;

    const SAMPLE: &str = r#"
[proxy]
bind_address = "127.0.0.1:3000"
upstream_timeout_ms = 250

[logging]
format = "json"

[[targets]]
name = "infura"
[targets.connection.http]
url = "https://mainnet.infura.io/v3/key"
compression = true

[[targets]]
name = "alchemy"
[targets.connection.http]
url = "https://eth-mainnet.alchemyapi.io/v2/key"
"#;

    #[test]
    fn test_parse_keeps_target_order() {
        let config = parse_config(SAMPLE).unwrap();
        let names: Vec<_> = config.targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["infura", "alchemy"]);
        assert!(config.targets[0].connection.http.compression);
        assert!(!config.targets[1].connection.http.compression);
        assert_eq!(config.proxy.upstream_timeout_ms, 250);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.metrics.bind_address, "0.0.0.0:9090");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.targets.len(), 2);
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config("[proxy]\nupstream_timeout_ms = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert!(errors.len() >= 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = parse_config(include_str!("../../config.toml")).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert!(config.health_checks.enabled);
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(parse_config("targets = 7"), Err(ConfigError::Parse(_))));
    }
}
