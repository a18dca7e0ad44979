//! Backend target abstraction.
//!
//! # Responsibilities
//! - Represent a single configured backend and its forwarding pipeline
//! - Hold the ordered, immutable target set for one config generation
//! - Swap whole target sets on reload without disturbing in-flight requests

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GatewayConfig, TargetConfig};
use crate::health::state::HealthStatus;
use crate::upstream::forwarder::{ForwardError, HttpClient, HttpForwarder, Upstream};

/// A single backend RPC endpoint.
pub struct Target {
    config: TargetConfig,
    upstream: Arc<dyn Upstream>,
    health: HealthStatus,
}

impl Target {
    pub fn new(config: TargetConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config,
            upstream,
            health: HealthStatus::new(),
        }
    }

    /// Build a target that forwards over the shared HTTP client.
    pub fn from_config(config: TargetConfig, client: HttpClient) -> Result<Self, ForwardError> {
        let forwarder = HttpForwarder::new(&config.connection.http.url, client)?;
        Ok(Self::new(config, Arc::new(forwarder)))
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Whether the target accepts gzip request bodies as-is.
    pub fn supports_compression(&self) -> bool {
        self.config.connection.http.compression
    }

    pub fn upstream(&self) -> &Arc<dyn Upstream> {
        &self.upstream
    }

    pub fn health(&self) -> &HealthStatus {
        &self.health
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.config.name)
            .field("url", &self.config.connection.http.url)
            .field("health", &self.health.state())
            .finish()
    }
}

/// The ordered targets of one configuration generation.
///
/// Order is failover priority and never changes after construction.
#[derive(Debug)]
pub struct TargetSet {
    targets: Vec<Arc<Target>>,
    upstream_timeout: Duration,
}

impl TargetSet {
    pub fn new(targets: Vec<Arc<Target>>, upstream_timeout: Duration) -> Self {
        Self {
            targets,
            upstream_timeout,
        }
    }

    pub fn from_config(config: &GatewayConfig, client: &HttpClient) -> Result<Self, ForwardError> {
        let targets = config
            .targets
            .iter()
            .map(|t| Target::from_config(t.clone(), client.clone()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(targets, config.proxy.upstream_timeout()))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Target>> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }
}

/// Copy-on-write holder for the live target set.
#[derive(Debug)]
pub struct Targets {
    current: ArcSwap<TargetSet>,
}

impl Targets {
    pub fn new(set: TargetSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(set),
        }
    }

    /// Snapshot of the live set; unaffected by later replacements.
    pub fn snapshot(&self) -> Arc<TargetSet> {
        self.current.load_full()
    }

    pub fn replace(&self, set: TargetSet) {
        tracing::info!(targets = set.len(), "Target set replaced");
        self.current.store(Arc::new(set));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, HttpConnectionConfig};
    use axum::{body::Body, http::Request, response::Response};
    use futures_util::future::BoxFuture;

    struct Noop;

    impl Upstream for Noop {
        fn forward(&self, _request: Request<Body>) -> BoxFuture<'_, Response> {
            Box::pin(async { Response::new(Body::empty()) })
        }
    }

    fn target(name: &str) -> Arc<Target> {
        let config = TargetConfig {
            name: name.to_string(),
            connection: ConnectionConfig {
                http: HttpConnectionConfig {
                    url: "http://127.0.0.1:1".to_string(),
                    compression: false,
                },
            },
        };
        Arc::new(Target::new(config, Arc::new(Noop)))
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let targets = Targets::new(TargetSet::new(
            vec![target("a"), target("b")],
            Duration::from_secs(1),
        ));

        let before = targets.snapshot();
        targets.replace(TargetSet::new(vec![target("c")], Duration::from_secs(2)));

        let names: Vec<_> = before.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(before.upstream_timeout(), Duration::from_secs(1));

        let after = targets.snapshot();
        assert_eq!(after.len(), 1);
        assert_eq!(after.iter().next().unwrap().name(), "c");
    }
}
