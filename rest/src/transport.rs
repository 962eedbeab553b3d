//! The abstract HTTP transport underneath the REST client.
use std::time::Duration;

use futures::future::BoxFuture;
use http::{HeaderMap, Method, StatusCode};

use glint_model::{Error, ErrorKind, Result};

/// A fully assembled request handed to the transport.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Whole-request deadline; on expiry the transport returns a timeout.
    pub timeout: Duration,
}

/// The response a transport hands back.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// The callable that actually performs HTTP.
///
/// Production wires this to a reqwest-backed client; tests inject scripted
/// implementations.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>>;
}

/// The production transport, backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Network, "failed to build HTTP client", e))?;
        Ok(Self { http })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        Box::pin(async move {
            let mut builder = self
                .http
                .request(request.method, request.url.as_str())
                .timeout(request.timeout)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }
            let response = builder.send().await.map_err(from_reqwest)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(from_reqwest)?.to_vec();
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}

fn from_reqwest(err: reqwest::Error) -> Error {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() || err.is_body() || err.is_request() {
        ErrorKind::Network
    } else {
        ErrorKind::Http
    };
    Error::with_source(kind, err.to_string(), err)
}
