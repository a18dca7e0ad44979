//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → eth_blockNumber probe through each target's pipeline
//!     → Update state.rs, export gauges
//!
//! State machine (state.rs):
//!     Unknown → Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Health is observational; the failover loop keeps its fixed target order
//! - State transitions require consecutive successes/failures
//! - Health state is per-target and resets when a reload builds new targets

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::{HealthState, HealthStatus};
