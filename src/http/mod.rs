//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID + trace layers)
//!     → request.rs (capture body once, replay per attempt)
//!     → [failover router drives attempts]
//!     → response.rs (intercept each attempt, commit the winner)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{CapturedBody, CapturedRequest, X_REQUEST_ID};
pub use response::ResponseInterceptor;
pub use server::HttpServer;
