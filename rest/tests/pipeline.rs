//! End-to-end pipeline behavior over a scripted transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use parking_lot::Mutex;

use glint_model::{ErrorKind, Result};
use glint_rest::{Endpoint, HttpRequest, HttpResponse, RestClient, RestConfig, Transport};

struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    calls: AtomicUsize,
}

impl MockTransport {
    fn new(responses: Vec<Result<HttpResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn execute(&self, _request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .pop_front()
            .expect("transport called more times than scripted");
        Box::pin(async move { next })
    }
}

fn response(status: u16, headers: &[(&str, &str)], body: &str) -> Result<HttpResponse> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(
            name.parse::<HeaderName>().unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    Ok(HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: map,
        body: body.as_bytes().to_vec(),
    })
}

fn config() -> RestConfig {
    RestConfig {
        token: "xyz".to_owned(),
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn rate_limited_request_is_retried_after_the_header_delay() {
    let transport = MockTransport::new(vec![
        response(
            429,
            &[
                ("retry-after", "0.001"),
                ("x-ratelimit-bucket", "b"),
                ("x-ratelimit-remaining", "0"),
            ],
            r#"{"message":"You are being rate limited.","retry_after":0.001,"global":false}"#,
        ),
        response(200, &[], r#"{"id":"1","channel_id":"123"}"#),
    ]);
    let client = RestClient::with_transport(config(), transport.clone()).unwrap();

    let started = Instant::now();
    let endpoint = Endpoint::new(Method::POST, "/channels/123/messages")
        .json(&serde_json::json!({"content": "x"}))
        .unwrap();
    let resp = client.execute(endpoint).await.unwrap();

    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(transport.calls(), 2);
    assert!(started.elapsed() >= Duration::from_millis(1));
    assert!(client.has_bucket("b"));
}

#[tokio::test]
async fn invalid_request_ceiling_stops_calls_before_the_transport() {
    let transport = MockTransport::new(vec![
        response(401, &[], r#"{"code":0,"message":"401: Unauthorized"}"#),
        response(401, &[], r#"{"code":0,"message":"401: Unauthorized"}"#),
    ]);
    let mut cfg = config();
    cfg.invalid_request_limit = 2;
    let client = RestClient::with_transport(cfg, transport.clone()).unwrap();

    for _ in 0..2 {
        let err = client
            .execute(Endpoint::new(Method::GET, "/users/@me"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    let err = client
        .execute(Endpoint::new(Method::GET, "/users/@me"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(transport.calls(), 2, "third call must not reach the transport");
}

#[tokio::test]
async fn server_errors_back_off_and_retry() {
    let transport = MockTransport::new(vec![
        response(502, &[], ""),
        response(500, &[], ""),
        response(200, &[], r#"{"id":"9"}"#),
    ]);
    let client = RestClient::with_transport(config(), transport.clone()).unwrap();

    let resp = client
        .execute(Endpoint::new(Method::GET, "/gateway/bot"))
        .await
        .unwrap();
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn retries_are_bounded_by_max_retries() {
    let transport = MockTransport::new(vec![
        response(503, &[], ""),
        response(503, &[], ""),
        response(503, &[], ""),
    ]);
    let mut cfg = config();
    cfg.max_retries = 2;
    let client = RestClient::with_transport(cfg, transport.clone()).unwrap();

    let err = client
        .execute(Endpoint::new(Method::GET, "/gateway/bot"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn error_bodies_are_exposed_alongside_the_mapped_kind() {
    let transport = MockTransport::new(vec![response(
        400,
        &[],
        r#"{"code":50035,"message":"Invalid Form Body","errors":{"content":{"_errors":[]}}}"#,
    )]);
    let client = RestClient::with_transport(config(), transport.clone()).unwrap();

    let err = client
        .execute(Endpoint::new(Method::POST, "/channels/1/messages"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    let api = err.api().expect("server body should be attached");
    assert_eq!(api.code, 50035);
    assert_eq!(api.message, "Invalid Form Body");
}

#[tokio::test]
async fn global_429_pauses_every_route() {
    let transport = MockTransport::new(vec![
        response(
            429,
            &[("retry-after", "0.005")],
            r#"{"message":"You are being rate limited.","retry_after":0.005,"global":true}"#,
        ),
        response(200, &[], "{}"),
    ]);
    let mut cfg = config();
    cfg.max_retries = 0;
    let client = RestClient::with_transport(cfg, transport.clone()).unwrap();

    let started = Instant::now();
    let err = client
        .execute(Endpoint::new(Method::GET, "/users/@me"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);

    // the pause set by the global 429 also delays an unrelated route
    client
        .execute(Endpoint::new(Method::GET, "/gateway/bot"))
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(5));
    assert_eq!(transport.calls(), 2);
}
