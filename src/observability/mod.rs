//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Routing core and health monitor produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through the access log and per-attempt events
//! - Metrics are cheap (atomic increments) and injected, not global

pub mod logging;
pub mod metrics;

pub use metrics::{AttemptOutcome, AttemptRecorder, GatewayMetrics};
