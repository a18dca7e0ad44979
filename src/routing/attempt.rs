//! Single backend attempt.
//!
//! # Responsibilities
//! - Pick the pipeline for this target (plain, or wrapped in `Gunzip`)
//! - Drive it under the upstream timeout into a fresh interceptor
//! - Time the attempt from dispatch to return

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::http::response::ResponseInterceptor;
use crate::resilience::timeouts::bounded;
use crate::upstream::{gunzip, Gunzip, Target, Upstream};

/// Captured result of one (request, target) attempt.
#[derive(Debug)]
pub struct AttemptResult {
    interceptor: ResponseInterceptor,
    elapsed: Duration,
    timed_out: bool,
}

impl AttemptResult {
    pub fn status(&self) -> StatusCode {
        self.interceptor.status()
    }

    pub fn body(&self) -> &[u8] {
        self.interceptor.body()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Build the client response from this attempt.
    pub fn into_response(self) -> Response {
        self.interceptor.commit()
    }
}

/// Runs attempts against targets with a fixed per-attempt deadline.
#[derive(Debug, Clone, Copy)]
pub struct AttemptExecutor {
    upstream_timeout: Duration,
    max_body_bytes: usize,
}

impl AttemptExecutor {
    pub fn new(upstream_timeout: Duration, max_body_bytes: usize) -> Self {
        Self {
            upstream_timeout,
            max_body_bytes,
        }
    }

    pub async fn execute(&self, target: &Target, request: Request<Body>) -> AttemptResult {
        let pipeline = pipeline_for(target, request.headers(), self.max_body_bytes);

        let mut interceptor = ResponseInterceptor::new();
        let start = Instant::now();
        let outcome = bounded(self.upstream_timeout, async {
            let response = pipeline.forward(request).await;
            interceptor.capture(response).await
        })
        .await;
        let elapsed = start.elapsed();

        let timed_out = match outcome {
            Some(Ok(())) => false,
            Some(Err(e)) => {
                tracing::warn!(provider = target.name(), error = %e, "Upstream response body failed");
                interceptor = synthetic(StatusCode::BAD_GATEWAY);
                false
            }
            None => {
                tracing::debug!(
                    provider = target.name(),
                    timeout_ms = self.upstream_timeout.as_millis() as u64,
                    "Upstream attempt timed out"
                );
                interceptor = synthetic(StatusCode::GATEWAY_TIMEOUT);
                true
            }
        };

        AttemptResult {
            interceptor,
            elapsed,
            timed_out,
        }
    }
}

/// Gzip request bodies are inflated only for targets that cannot accept them.
pub fn needs_gunzip(target: &Target, headers: &HeaderMap) -> bool {
    !target.supports_compression() && gunzip::is_gzip(headers)
}

fn pipeline_for(target: &Target, headers: &HeaderMap, max_body_bytes: usize) -> Arc<dyn Upstream> {
    if needs_gunzip(target, headers) {
        Arc::new(Gunzip::new(target.upstream().clone(), max_body_bytes))
    } else {
        target.upstream().clone()
    }
}

fn synthetic(status: StatusCode) -> ResponseInterceptor {
    let mut interceptor = ResponseInterceptor::new();
    interceptor.write_status(status);
    interceptor.write_body(status.canonical_reason().unwrap_or_default().as_bytes());
    interceptor
}
