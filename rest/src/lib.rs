//! The glint REST client: a rate-limit-aware request pipeline over an
//! abstract HTTP transport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ::http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use ::http::{HeaderMap, Method};
use log::{debug, warn};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use glint_model::{status_from_http, ApiError, Error, ErrorKind, Result};

pub use crate::http::{AuthType, BoolSpelling, RateLimitHeaders, RateLimitScope};
pub use crate::multipart::Multipart;
pub use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub mod http;
pub mod multipart;
mod ratelimit;
pub mod routes;
pub mod transport;

use crate::http::{
    canonical_url, content_type_is_allowed, format_authorization, format_bool, parse_error_body,
    parse_rate_limit_body, user_agent_is_valid, validate_json,
};
use crate::ratelimit::{ceil_millis, RateLimiter};
use crate::routes::route_key;

/// The User-Agent used when the caller does not configure one.
pub const DEFAULT_USER_AGENT: &str = "DiscordBot (https://github.com/glint-rs/glint, 0.1.0) glint";

/// Configuration for the REST client.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// The bot or bearer token, without its scheme prefix.
    pub token: String,
    /// The authorization scheme to send.
    pub auth_type: AuthType,
    /// The User-Agent header; must satisfy Discord's format.
    pub user_agent: String,
    /// Whole-request deadline applied to every transport call.
    pub timeout: Duration,
    /// How many times a recoverable failure is retried.
    pub max_retries: u32,
    /// Base delay of the exponential backoff.
    pub backoff_base: Duration,
    /// Upper bound on a single backoff delay.
    pub backoff_cap: Duration,
    /// Requests allowed per global window.
    pub global_rate_limit: u32,
    /// Length of the global window.
    pub global_window: Duration,
    /// 401/403/429 responses tolerated per invalid-request window before the
    /// client refuses further calls.
    pub invalid_request_limit: u32,
    /// Length of the invalid-request window.
    pub invalid_request_window: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            auth_type: AuthType::Bot,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(15),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(30),
            global_rate_limit: 50,
            global_window: Duration::from_secs(1),
            invalid_request_limit: 10_000,
            invalid_request_window: Duration::from_secs(600),
        }
    }
}

/// A structure representing a Discord API endpoint, in the context of an
/// HTTP request.
#[derive(Debug)]
pub struct Endpoint {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Body>,
}

#[derive(Debug)]
enum Body {
    Json(Vec<u8>),
    Multipart {
        bytes: Vec<u8>,
        content_type: String,
    },
}

impl Endpoint {
    /// Creates a new endpoint from an HTTP method and an API path beginning
    /// with `/`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Attaches a JSON body to the request.
    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        self.body = Some(Body::Json(serde_json::to_vec(payload)?));
        Ok(self)
    }

    /// Attaches an already serialized JSON body.
    pub fn raw_json(mut self, bytes: Vec<u8>) -> Self {
        self.body = Some(Body::Json(bytes));
        self
    }

    /// Attaches a multipart form, finalizing it.
    pub fn multipart(mut self, form: Multipart) -> Self {
        let (bytes, content_type) = form.finish();
        self.body = Some(Body::Multipart {
            bytes,
            content_type,
        });
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Appends a boolean query parameter with the given spelling.
    pub fn query_bool(mut self, key: &str, value: bool, spelling: BoolSpelling) -> Self {
        self.query
            .push((key.to_owned(), format_bool(value, spelling).to_owned()));
        self
    }

    fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.query {
            serializer.append_pair(key, value);
        }
        format!("{}?{}", self.path, serializer.finish())
    }
}

/// The main client used to interface with the Discord REST API.
///
/// One request runs through: canonical URL assembly, route-key derivation,
/// global and per-route bucket waits, the invalid-request ceiling, the
/// transport call, and retry handling for 429s and recoverable failures.
pub struct RestClient {
    config: RestConfig,
    transport: Arc<dyn Transport>,
    ratelimiter: RateLimiter,
}

impl RestClient {
    /// Creates a REST client backed by the production HTTP transport.
    pub fn new(config: RestConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Creates a REST client over a caller-provided transport.
    pub fn with_transport(config: RestConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        if config.token.is_empty() {
            return Err(Error::new(ErrorKind::InvalidParam, "token must not be empty"));
        }
        if !user_agent_is_valid(&config.user_agent) {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                format!("malformed User-Agent {:?}", config.user_agent),
            ));
        }
        let ratelimiter = RateLimiter::new(
            config.global_rate_limit,
            config.global_window,
            config.invalid_request_limit,
            config.invalid_request_window,
        );
        Ok(Self {
            config,
            transport,
            ratelimiter,
        })
    }

    /// Executes a request and deserializes the response body.
    pub async fn request<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T> {
        let response = self.execute(endpoint).await?;
        serde_json::from_slice(&response.body).map_err(Error::from)
    }

    /// Executes a request, returning the raw response on any 2xx/3xx status.
    pub async fn execute(&self, endpoint: Endpoint) -> Result<HttpResponse> {
        let url = canonical_url(&endpoint.path_and_query())?;
        let route = route_key(&endpoint.method, &endpoint.path);

        let mut attempt: u32 = 0;
        loop {
            self.ratelimiter.acquire(&route).await;
            self.ratelimiter.check_invalid_ceiling()?;

            let request = self.build_request(&endpoint, &url)?;
            let response = match self.transport.execute(request).await {
                Ok(response) => response,
                Err(err) => {
                    if err.is_recoverable() && attempt < self.config.max_retries {
                        let delay = self.backoff_delay(attempt);
                        debug!(
                            "transport failure on {} ({}), retrying in {:?}",
                            route, err, delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            };

            let received = Instant::now();
            let limits = RateLimitHeaders::parse(&response.headers);
            self.ratelimiter.sync_from_headers(&route, &limits, received);

            let status = response.status.as_u16();
            if (200..400).contains(&status) {
                return Ok(response);
            }

            if status == 429 {
                self.ratelimiter.record_invalid();
                let body = parse_rate_limit_body(&response.body);
                // The header wins over the body when both are present.
                let retry_after = limits
                    .retry_after
                    .or_else(|| body.as_ref().map(|b| b.retry_after))
                    .unwrap_or(1.0);
                let is_global = limits.global || body.as_ref().map_or(false, |b| b.global);
                let delay = ceil_millis(Duration::from_secs_f64(retry_after.max(0.0)));
                if is_global {
                    self.ratelimiter.pause_global(delay);
                }
                if attempt < self.config.max_retries {
                    warn!("rate limited on {}, retrying in {:?}", route, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(error_from_response(&response));
            }

            if status == 401 || status == 403 {
                self.ratelimiter.record_invalid();
            }

            let kind = status_from_http(status).unwrap_or(ErrorKind::Http);
            if kind.is_recoverable() && attempt < self.config.max_retries {
                let delay = self.backoff_delay(attempt);
                warn!(
                    "server failure {} on {}, retrying in {:?}",
                    status, route, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }
            return Err(error_from_response(&response));
        }
    }

    /// Whether a bucket hash has been learned from response headers.
    pub fn has_bucket(&self, bucket_key: &str) -> bool {
        self.ratelimiter.has_bucket(bucket_key)
    }

    fn build_request(&self, endpoint: &Endpoint, url: &str) -> Result<HttpRequest> {
        let mut headers = HeaderMap::new();
        let authorization = format_authorization(self.config.auth_type, &self.config.token);
        headers.insert(AUTHORIZATION, header_value(&authorization)?);
        headers.insert(USER_AGENT, header_value(&self.config.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let body = match &endpoint.body {
            Some(Body::Json(bytes)) => {
                validate_json(bytes)?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(bytes.clone())
            }
            Some(Body::Multipart {
                bytes,
                content_type,
            }) => {
                if !content_type_is_allowed(content_type) {
                    return Err(Error::new(
                        ErrorKind::InvalidParam,
                        format!("content type {:?} is not accepted", content_type),
                    ));
                }
                headers.insert(CONTENT_TYPE, header_value(content_type)?);
                Some(bytes.clone())
            }
            None => None,
        };

        Ok(HttpRequest {
            method: endpoint.method.clone(),
            url: url.to_owned(),
            headers,
            body,
            timeout: self.config.timeout,
        })
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let base = self
            .config
            .backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.config.backoff_cap);
        let jitter_ms = rand::thread_rng().gen_range(0..=self.config.backoff_base.as_millis().max(1) as u64);
        base + Duration::from_millis(jitter_ms)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::with_source(ErrorKind::InvalidParam, "malformed header value", e))
}

fn error_from_response(response: &HttpResponse) -> Error {
    let status = response.status.as_u16();
    let kind = status_from_http(status).unwrap_or(ErrorKind::Http);
    let mut err = Error::new(kind, format!("request failed with status {}", status));
    if let Some(body) = parse_error_body(&response.body) {
        if body.code.is_some() || body.message.is_some() {
            err = err.with_api(ApiError {
                code: body.code.unwrap_or_default(),
                message: body.message.unwrap_or_default(),
                errors: body.errors,
            });
        }
    }
    err
}
