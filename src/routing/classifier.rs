//! Attempt outcome classification.
//!
//! 5xx and 429 mean the target is unhealthy or throttling, so the request moves on
//! to the next target. Every other status, including other 4xx, is the target's
//! answer to this request and is committed as-is.

use axum::http::StatusCode;

/// Whether an attempt with this status should fail over to the next target.
pub fn is_failure(status: StatusCode) -> bool {
    status.as_u16() >= 500 || status == StatusCode::TOO_MANY_REQUESTS
}
