//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use rpc_gateway::config::{
    ConnectionConfig, GatewayConfig, HealthCheckConfig, HttpConnectionConfig, TargetConfig,
};
use rpc_gateway::http::HttpServer;
use rpc_gateway::lifecycle::Shutdown;
use rpc_gateway::observability::GatewayMetrics;

/// What a mock backend answers with.
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(&'static str, String)>,
    pub delay: Duration,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct Backend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(Uri, HeaderMap, Bytes)>>>,
}

impl Backend {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Bodies received so far, in arrival order.
    pub fn bodies(&self) -> Vec<Bytes> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, body)| body.clone())
            .collect()
    }

    /// Request targets (path and query) received so far, in arrival order.
    pub fn uris(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(uri, _, _)| uri.to_string())
            .collect()
    }

    /// Headers received so far, in arrival order.
    pub fn headers(&self) -> Vec<HeaderMap> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, headers, _)| headers.clone())
            .collect()
    }
}

/// Start a backend that always answers with `reply`.
pub async fn start_mock_backend(reply: Reply) -> Backend {
    start_programmable_backend(move |_| {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

/// Start a programmable mock backend. `f` receives the zero-based hit count.
pub async fn start_programmable_backend<F, Fut>(f: F) -> Backend
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let backend = Backend {
        addr,
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let f = Arc::new(f);
    let state = backend.clone();
    let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: Bytes| {
        let f = f.clone();
        let state = state.clone();
        async move {
            let hit = state.hits.fetch_add(1, Ordering::SeqCst);
            state.requests.lock().unwrap().push((uri, headers, body));
            let reply = f(hit).await;
            tokio::time::sleep(reply.delay).await;
            render(reply)
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    backend
}

fn render(reply: Reply) -> Response {
    let mut response = (StatusCode::from_u16(reply.status).unwrap(), reply.body).into_response();
    for (name, value) in reply.headers {
        response
            .headers_mut()
            .append(name, value.parse().unwrap());
    }
    response
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn target(name: &str, url: &str) -> TargetConfig {
    TargetConfig {
        name: name.to_string(),
        connection: ConnectionConfig {
            http: HttpConnectionConfig {
                url: url.to_string(),
                compression: false,
            },
        },
    }
}

pub fn gateway_config(targets: Vec<TargetConfig>, upstream_timeout_ms: u64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.proxy.bind_address = "127.0.0.1:0".to_string();
    config.proxy.upstream_timeout_ms = upstream_timeout_ms;
    config.metrics.enabled = false;
    config.health_checks = HealthCheckConfig {
        enabled: false,
        ..HealthCheckConfig::default()
    };
    config.targets = targets;
    config
}

/// A running gateway plus the handles tests poke at.
pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub reload: mpsc::UnboundedSender<GatewayConfig>,
    pub metrics: metrics_exporter_prometheus::PrometheusHandle,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let (metrics, handle) = GatewayMetrics::prometheus().unwrap();
    let server = HttpServer::new(config, Arc::new(metrics)).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (reload, updates) = mpsc::unbounded_channel();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates, rx).await;
    });

    Gateway {
        addr,
        shutdown,
        reload,
        metrics: handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
