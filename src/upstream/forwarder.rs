//! Forwarding pipeline to a single target.
//!
//! # Responsibilities
//! - Define the `Upstream` seam the routing core calls through
//! - Rewrite inbound requests onto the target URL
//! - Strip hop-by-hop headers in both directions
//! - Map transport failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - `forward` is infallible: like a reverse-proxy handler it always produces a
//!   response, and transport errors become synthetic 502s the router can classify
//! - One pooled client is shared by every target

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

/// Shared pooled HTTP(S) client used by every forwarder.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Errors raised while building or sending an outbound request.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid target url '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("invalid upstream uri: {0}")]
    Uri(#[from] axum::http::uri::InvalidUri),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),
}

/// Something that can deliver a request to a backend and produce its response.
pub trait Upstream: Send + Sync {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Response>;
}

/// Build the pooled client shared by all targets.
pub fn build_client() -> HttpClient {
    let connector = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();

    Client::builder(TokioExecutor::new()).build(connector)
}

/// Reverse-proxy style forwarder for one target URL.
pub struct HttpForwarder {
    base: Url,
    client: HttpClient,
}

impl HttpForwarder {
    pub fn new(url: &str, client: HttpClient) -> Result<Self, ForwardError> {
        let base = Url::parse(url).map_err(|e| ForwardError::InvalidUrl(url.to_string(), e))?;
        Ok(Self { base, client })
    }

    fn outbound(&self, request: Request<Body>) -> Result<Request<Body>, ForwardError> {
        let (parts, body) = request.into_parts();
        let uri = rewrite_uri(&self.base, &parts.uri)?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        // The client derives Host from the rewritten URI.
        headers.remove(header::HOST);

        let mut outbound = Request::builder().method(parts.method).uri(uri).body(body)?;
        *outbound.headers_mut() = headers;
        Ok(outbound)
    }

    async fn send(&self, request: Request<Body>) -> Result<Response, ForwardError> {
        let outbound = self.outbound(request)?;
        let response: Response<hyper::body::Incoming> = self.client.request(outbound).await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Upstream for HttpForwarder {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            match self.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(target_url = %self.base, error = %e, "Upstream error");
                    bad_gateway()
                }
            }
        })
    }
}

pub(crate) fn bad_gateway() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        StatusCode::BAD_GATEWAY.canonical_reason().unwrap_or_default(),
    )
        .into_response()
}

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("proxy-connection");
}

/// Map an inbound URI onto the target's base URL.
///
/// The target path prefixes the inbound path; a bare `/` keeps the target path
/// untouched. Queries from both are kept, target first.
pub fn rewrite_uri(base: &Url, inbound: &Uri) -> Result<Uri, ForwardError> {
    let mut url = base.clone();

    let path = inbound.path();
    if !path.is_empty() && path != "/" {
        url.set_path(&join_paths(base.path(), path));
    }

    let query = match (base.query().filter(|q| !q.is_empty()), inbound.query()) {
        (Some(a), Some(b)) => Some(format!("{}&{}", a, b)),
        (Some(a), None) => Some(a.to_string()),
        (None, b) => b.map(str::to_string),
    };
    url.set_query(query.as_deref());

    Ok(url.as_str().parse::<Uri>()?)
}

fn join_paths(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}
