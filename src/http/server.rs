//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing)
//! - Build the target set and failover router from config
//! - Apply hot-reloaded target sets
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::AttemptRecorder;
use crate::routing::FailoverRouter;
use crate::upstream::{build_client, ForwardError, HttpClient, TargetSet, Targets};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<FailoverRouter>,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    targets: Arc<Targets>,
    client: HttpClient,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(
        config: GatewayConfig,
        recorder: Arc<dyn AttemptRecorder>,
    ) -> Result<Self, ForwardError> {
        let client = build_client();
        let targets = Arc::new(Targets::new(TargetSet::from_config(&config, &client)?));
        Ok(Self::with_targets(config, targets, recorder, client))
    }

    /// Create a server over an existing target set.
    pub fn with_targets(
        config: GatewayConfig,
        targets: Arc<Targets>,
        recorder: Arc<dyn AttemptRecorder>,
        client: HttpClient,
    ) -> Self {
        let failover = Arc::new(FailoverRouter::new(
            targets.clone(),
            recorder,
            config.proxy.max_body_bytes,
        ));
        let router = Self::build_router(AppState { router: failover });

        Self {
            router,
            targets,
            client,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Live target set, shared with background tasks such as the health monitor.
    pub fn targets(&self) -> Arc<Targets> {
        self.targets.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            targets = self.targets.snapshot().len(),
            "HTTP server starting"
        );

        let targets = self.targets.clone();
        let client = self.client.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match TargetSet::from_config(&config, &client) {
                    Ok(set) => targets.replace(set),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to apply reloaded config, keeping current targets");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main gateway handler: every method and path goes through failover.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.router.route(request).await
}
