//! Gzip decoding wrapper for targets that cannot take compressed bodies.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use flate2::read::GzDecoder;
use futures_util::future::BoxFuture;
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;

use crate::upstream::forwarder::{bad_gateway, Upstream};

/// Cap on an inflated upstream response.
pub const DEFAULT_RESPONSE_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
enum InflateError {
    #[error("failed to read body: {0}")]
    Read(#[from] axum::Error),

    #[error("invalid gzip stream: {0}")]
    Decode(#[from] std::io::Error),

    #[error("inflated body exceeds {0} bytes")]
    TooLarge(usize),
}

/// Wraps a forwarding pipeline so gzip bodies are decoded on the way through.
///
/// The request body is inflated before it reaches the target. A gzip-encoded
/// response is inflated before it reaches the caller. Both are bounded: an
/// oversized request is rejected with 413, an oversized response becomes 502.
pub struct Gunzip {
    inner: Arc<dyn Upstream>,
    request_limit: usize,
    response_limit: usize,
}

impl Gunzip {
    pub fn new(inner: Arc<dyn Upstream>, request_limit: usize) -> Self {
        Self {
            inner,
            request_limit,
            response_limit: DEFAULT_RESPONSE_LIMIT,
        }
    }

    pub fn with_response_limit(mut self, limit: usize) -> Self {
        self.response_limit = limit;
        self
    }
}

impl Upstream for Gunzip {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let (mut parts, body) = request.into_parts();

            let decoded = match inflate_body(body, self.request_limit).await {
                Ok(decoded) => decoded,
                Err(InflateError::TooLarge(limit)) => {
                    tracing::debug!(limit, "Rejecting gzip request body that inflates past the limit");
                    return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Rejecting undecodable gzip request body");
                    return (StatusCode::BAD_REQUEST, "Invalid gzip request body").into_response();
                }
            };
            set_identity_length(&mut parts.headers, decoded.len());

            let response = self
                .inner
                .forward(Request::from_parts(parts, Body::from(decoded)))
                .await;

            if !is_gzip(response.headers()) {
                return response;
            }

            let (mut parts, body) = response.into_parts();
            match inflate_body(body, self.response_limit).await {
                Ok(inflated) => {
                    set_identity_length(&mut parts.headers, inflated.len());
                    Response::from_parts(parts, Body::from(inflated))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Upstream sent undecodable gzip response");
                    bad_gateway()
                }
            }
        })
    }
}

/// Whether the headers declare a gzip content encoding.
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("gzip"))
}

fn set_identity_length(headers: &mut HeaderMap, len: usize) {
    headers.remove(header::CONTENT_ENCODING);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
}

/// Read and inflate `body`, bounding both the compressed and inflated sizes by `limit`.
async fn inflate_body(body: Body, limit: usize) -> Result<Vec<u8>, InflateError> {
    let bytes = axum::body::to_bytes(body, limit).await?;
    inflate(&bytes, limit)
}

fn inflate(bytes: &Bytes, limit: usize) -> Result<Vec<u8>, InflateError> {
    let mut decoded = Vec::new();
    GzDecoder::new(bytes.as_ref())
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut decoded)?;
    if decoded.len() > limit {
        return Err(InflateError::TooLarge(limit));
    }
    Ok(decoded)
}
