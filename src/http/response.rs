//! Response interception and commit.
//!
//! # Responsibilities
//! - Buffer one backend attempt's status, headers and body off the wire
//! - Build the client response from the winning attempt
//! - Build the synthetic responses the gateway manufactures itself
//!
//! # Design Decisions
//! - Nothing reaches the client until the router has classified the attempt,
//!   so a failed attempt can never leak a partial response
//! - Multi-value headers collapse to their first value on commit

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

/// In-memory response sink for a single backend attempt.
///
/// Created fresh per attempt and never reused.
#[derive(Debug, Default)]
pub struct ResponseInterceptor {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any earlier value for the same name.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Record an additional value for a header.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Set the status code. Only the first write takes effect.
    pub fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Append body bytes, implicitly committing a 200 status if none was written.
    pub fn write_body(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(chunk);
    }

    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Drain a backend response into the interceptor.
    ///
    /// A body that fails mid-stream is reported as an error; the caller decides
    /// how to classify it.
    pub async fn capture(&mut self, response: Response) -> Result<(), axum::Error> {
        let (parts, body) = response.into_parts();

        let mut last: Option<HeaderName> = None;
        for (name, value) in parts.headers {
            // HeaderMap yields the name only for the first value of each header.
            if let Some(name) = name {
                last = Some(name);
            }
            if let Some(name) = last.clone() {
                self.append_header(name, value);
            }
        }
        self.write_status(parts.status);

        let mut stream = body.into_data_stream();
        while let Some(chunk) = stream.next().await {
            self.write_body(&chunk?);
        }
        Ok(())
    }

    /// Turn the captured attempt into the client response.
    pub fn commit(self) -> Response {
        let mut response = Response::new(Body::from(Bytes::from(self.body)));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        copy_headers(response.headers_mut(), &self.headers);
        response
    }
}

/// Set each source header on `dst` using only its first value.
pub fn copy_headers(dst: &mut HeaderMap, src: &HeaderMap) {
    for name in src.keys() {
        if let Some(value) = src.get(name) {
            dst.insert(name.clone(), value.clone());
        }
    }
}

/// A plain-text error response carrying the status's canonical reason.
///
/// Shaped like a standard HTTP error page: newline-terminated text, never sniffed.
pub fn status_response(status: StatusCode) -> Response {
    (
        status,
        [(header::X_CONTENT_TYPE_OPTIONS, "nosniff")],
        format!("{}\n", status.canonical_reason().unwrap_or_default()),
    )
        .into_response()
}

/// The response sent when no backend produced an acceptable result.
pub fn service_unavailable() -> Response {
    status_response(StatusCode::SERVICE_UNAVAILABLE)
}
