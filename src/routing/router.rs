//! Failover router.
//!
//! # State Machine
//! ```text
//! capture body ──(read fails)──────────────────────────▶ Unavailable (503)
//!      │
//!      ▼
//! Iterating(i) ──(attempt ok)─────────────────────────▶ Committed
//!      │
//!      └─(attempt failed)─▶ Iterating(i + 1) ──(past end)─▶ Unavailable (503)
//! ```
//!
//! # Design Decisions
//! - Strictly sequential: one attempt at a time, in target order, so a
//!   non-idempotent call is never duplicated by a parallel race
//! - Every attempt is buffered; only the committed one reaches the client
//! - Every attempt is recorded, whatever its outcome
//! - The target set is snapshotted per request, so reloads never reorder or
//!   truncate an in-flight loop

use axum::{body::Body, http::Request, response::Response};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::http::request::{request_id, CapturedRequest};
use crate::http::response::service_unavailable;
use crate::observability::metrics::{AttemptOutcome, AttemptRecorder};
use crate::routing::attempt::AttemptExecutor;
use crate::routing::classifier::is_failure;
use crate::upstream::Targets;

/// Routes one inbound request across the ordered targets.
pub struct FailoverRouter {
    targets: Arc<Targets>,
    recorder: Arc<dyn AttemptRecorder>,
    max_body_bytes: usize,
}

impl FailoverRouter {
    pub fn new(
        targets: Arc<Targets>,
        recorder: Arc<dyn AttemptRecorder>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            targets,
            recorder,
            max_body_bytes,
        }
    }

    /// Deliver `request` to the first target that accepts it.
    pub async fn route(&self, request: Request<Body>) -> Response {
        let request_id = request_id(request.headers()).to_string();

        let captured = match CapturedRequest::capture(request, self.max_body_bytes).await {
            Ok(captured) => captured,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to capture request body");
                return service_unavailable();
            }
        };

        let targets = self.targets.snapshot();
        if targets.is_empty() {
            tracing::warn!(request_id = %request_id, "No targets configured, returning 503");
            return service_unavailable();
        }
        let executor = AttemptExecutor::new(targets.upstream_timeout(), self.max_body_bytes);

        for target in targets.iter() {
            let attempt = executor.execute(target, captured.attempt()).await;
            let status = attempt.status();
            let failed = is_failure(status);

            self.record(&AttemptOutcome {
                target: target.name(),
                method: captured.method(),
                status,
                elapsed: attempt.elapsed(),
                failed,
            });

            if failed {
                tracing::debug!(
                    request_id = %request_id,
                    provider = target.name(),
                    status = status.as_u16(),
                    elapsed_ms = attempt.elapsed().as_millis() as u64,
                    timed_out = attempt.timed_out(),
                    "Target failed, rerouting"
                );
                continue;
            }

            tracing::debug!(
                request_id = %request_id,
                provider = target.name(),
                status = status.as_u16(),
                elapsed_ms = attempt.elapsed().as_millis() as u64,
                "Committing response"
            );
            return attempt.into_response();
        }

        tracing::warn!(
            request_id = %request_id,
            attempted = targets.len(),
            "All targets failed, returning 503"
        );
        service_unavailable()
    }

    fn record(&self, outcome: &AttemptOutcome<'_>) {
        let recorded = catch_unwind(AssertUnwindSafe(|| self.recorder.record_attempt(outcome)));
        if recorded.is_err() {
            tracing::error!(provider = outcome.target, "Metrics recorder panicked; ignoring");
        }
    }
}
