//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap each backend attempt with the configured upstream timeout
//! - Cancel the attempt cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Timed-out attempts are reported as 504 Gateway Timeout by the caller
//! - There is no request-wide deadline beyond the per-attempt bound

use std::future::Future;
use std::time::Duration;

/// Run `fut` to completion or until `limit` elapses.
///
/// Returns `None` if the deadline was hit.
pub async fn bounded<F>(limit: Duration, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::time::timeout(limit, fut).await.ok()
}
