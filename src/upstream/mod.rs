//! Upstream target subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayConfig.targets (ordered)
//!     → target.rs (Target per entry, TargetSet per config generation)
//!     → forwarder.rs (HttpForwarder over the shared pooled client)
//!     → gunzip.rs (optional wrapper, chosen per attempt)
//!     → Response handed back to the routing core
//! ```
//!
//! # Design Decisions
//! - Target order is the failover priority; nothing here re-ranks it
//! - A TargetSet is immutable; reloads swap in a whole new set
//! - Forwarding never fails outright; errors surface as 502 responses

pub mod forwarder;
pub mod gunzip;
pub mod target;

pub use forwarder::{build_client, ForwardError, HttpClient, HttpForwarder, Upstream};
pub use gunzip::Gunzip;
pub use target::{Target, TargetSet, Targets};
