//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against one target:
//!     → timeouts.rs (bound the forwarding call + body capture)
//!     → expired: synthetic 504, router fails over to the next target
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend attempt has a deadline
//! - The same target is never retried; failover moves down the target list

pub mod timeouts;
