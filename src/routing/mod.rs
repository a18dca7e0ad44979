//! Failover routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request
//!     → router.rs (capture body, snapshot target set)
//!     → for each target in order:
//!         attempt.rs (pipeline + timeout → buffered AttemptResult)
//!         classifier.rs (failure or acceptable?)
//!         metrics (one observation per attempt)
//!     → first acceptable attempt committed, or 503 when exhausted
//! ```
//!
//! # Design Decisions
//! - Target order is fixed; no weighting, no fan-out
//! - The same target is never retried within a request
//! - Deterministic: same backend behavior always yields the same winner

pub mod attempt;
pub mod classifier;
pub mod router;

pub use attempt::{AttemptExecutor, AttemptResult};
pub use classifier::is_failure;
pub use router::FailoverRouter;
