//! Request capture and identification.
//!
//! # Responsibilities
//! - Assign an `x-request-id` (UUID v4) to requests that arrive without one
//! - Read the inbound body to completion exactly once
//! - Hand every backend attempt its own fresh copy of the request
//!
//! # Design Decisions
//! - The body is held as `Bytes`; each snapshot is a cheap refcounted view, so
//!   consuming one attempt's body never disturbs another's
//! - A failed or oversized read is fatal for the request (the buffer cannot be
//!   trusted), and happens before any backend is contacted

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, Method, Request, Uri, Version},
};
use thiserror::Error;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer that sets `x-request-id` on requests lacking one.
pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::x_request_id(UuidRequestId)
}

/// Layer that echoes `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Extract the request id header, if any.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(#[from] axum::Error),
}

/// The inbound body, read once and replayable any number of times.
#[derive(Debug, Clone)]
pub struct CapturedBody {
    bytes: Bytes,
}

impl CapturedBody {
    /// Read `body` to completion, failing if it exceeds `limit` bytes.
    pub async fn read(body: Body, limit: usize) -> Result<Self, BodyError> {
        let bytes = axum::body::to_bytes(body, limit).await?;
        Ok(Self { bytes })
    }

    /// A new, independently consumable body over the captured bytes.
    pub fn snapshot(&self) -> Body {
        Body::from(self.bytes.clone())
    }
}

/// Request head plus captured body, used to build one request per attempt.
#[derive(Debug)]
pub struct CapturedRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: CapturedBody,
}

impl CapturedRequest {
    pub async fn capture(request: Request<Body>, limit: usize) -> Result<Self, BodyError> {
        let (parts, body) = request.into_parts();
        let body = CapturedBody::read(body, limit).await?;

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Build a fresh request for one backend attempt.
    pub fn attempt(&self) -> Request<Body> {
        let mut request = Request::new(self.body.snapshot());
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        request
    }
}
