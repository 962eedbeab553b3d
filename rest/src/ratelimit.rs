//! Client-side rate limit accounting: per-route buckets discovered from
//! response headers, the process-wide global bucket, and the invalid-request
//! safety ceiling.
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use glint_model::{Error, ErrorKind, Result};

use crate::http::{RateLimitHeaders, RateLimitScope};

/// Rounds a duration up to the next whole millisecond.
pub(crate) fn ceil_millis(duration: Duration) -> Duration {
    let nanos = duration.subsec_nanos();
    let remainder = nanos % 1_000_000;
    if remainder == 0 {
        duration
    } else {
        duration + Duration::from_nanos(u64::from(1_000_000 - remainder))
    }
}

/// A rate limiter bucket used for maintaining Discord rate limits.
#[derive(Debug)]
pub struct Bucket {
    /// The bucket hash Discord assigned, from `X-RateLimit-Bucket`.
    pub key: String,
    /// The request limit of this bucket.
    pub limit: i64,
    /// The requests remaining before the bucket resets.
    pub remaining: i64,
    /// When the bucket replenishes.
    pub reset_at: Option<Instant>,
    /// The scope Discord reported for this bucket.
    pub scope: Option<RateLimitScope>,
}

impl Bucket {
    fn new(key: String) -> Self {
        Self {
            key,
            limit: 1,
            remaining: 1,
            reset_at: None,
            scope: None,
        }
    }

    /// How long a caller must wait before using this bucket, if at all.
    fn delay(&self, now: Instant) -> Option<Duration> {
        if self.remaining > 0 {
            return None;
        }
        let reset_at = self.reset_at?;
        if reset_at <= now {
            return None;
        }
        Some(reset_at - now)
    }

    /// Re-syncs the bucket from response headers. Header values always win
    /// over client-side accounting.
    fn sync(&mut self, headers: &RateLimitHeaders, received: Instant) {
        if let Some(limit) = headers.limit {
            self.limit = i64::from(limit);
        }
        if let Some(remaining) = headers.remaining {
            self.remaining = i64::from(remaining);
        }
        if let Some(reset_after) = headers.reset_after {
            self.reset_at = Some(received + Duration::from_secs_f64(reset_after.max(0.0)));
        }
        if let Some(scope) = headers.scope {
            self.scope = Some(scope);
        }
    }

    /// Client-side decrement for responses without rate-limit headers.
    /// Never drops below zero.
    fn consume(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
        }
    }
}

/// The process-wide request budget: `limit` requests per `window`.
#[derive(Debug)]
struct GlobalBucket {
    limit: u32,
    window: Duration,
    window_start: Instant,
    used: u32,
    /// Explicit pause set by a global 429.
    pause_until: Option<Instant>,
}

impl GlobalBucket {
    fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            window_start: Instant::now(),
            used: 0,
            pause_until: None,
        }
    }

    /// Takes a token, or reports how long until one frees up.
    fn acquire(&mut self, now: Instant) -> Option<Duration> {
        if let Some(until) = self.pause_until {
            if now < until {
                return Some(until - now);
            }
            self.pause_until = None;
        }
        if now.duration_since(self.window_start) >= self.window {
            self.window_start = now;
            self.used = 0;
        }
        if self.used < self.limit {
            self.used += 1;
            None
        } else {
            Some(self.window_start + self.window - now)
        }
    }

    fn pause(&mut self, until: Instant) {
        self.pause_until = Some(self.pause_until.map_or(until, |p| p.max(until)));
    }
}

/// The sliding-window count of 401/403/429 responses, used to stop a client
/// before Discord's anti-abuse ceiling does.
#[derive(Debug)]
struct InvalidRequestTracker {
    limit: u32,
    window: Duration,
    hits: VecDeque<Instant>,
}

impl InvalidRequestTracker {
    fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.hits.front() {
            if now.duration_since(front) >= self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    fn at_ceiling(&mut self, now: Instant) -> bool {
        if self.limit == 0 {
            return false;
        }
        self.prune(now);
        self.hits.len() >= self.limit as usize
    }

    fn record(&mut self, now: Instant) {
        self.prune(now);
        self.hits.push_back(now);
    }
}

/// A utility for rate limiting requests made to the Discord API.
pub struct RateLimiter {
    /// Lazily discovered mapping from route key to bucket hash.
    routes: RwLock<HashMap<String, String>>,
    /// Buckets keyed by Discord's bucket hash.
    buckets: RwLock<HashMap<String, Arc<Mutex<Bucket>>>>,
    global: Mutex<GlobalBucket>,
    invalid: Mutex<InvalidRequestTracker>,
}

impl RateLimiter {
    pub fn new(
        global_limit: u32,
        global_window: Duration,
        invalid_limit: u32,
        invalid_window: Duration,
    ) -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            buckets: RwLock::new(HashMap::new()),
            global: Mutex::new(GlobalBucket::new(global_limit, global_window)),
            invalid: Mutex::new(InvalidRequestTracker::new(invalid_limit, invalid_window)),
        }
    }

    fn bucket_for_route(&self, route: &str) -> Option<Arc<Mutex<Bucket>>> {
        let key = self.routes.read().get(route).cloned()?;
        self.buckets.read().get(&key).cloned()
    }

    /// Waits out the global bucket and the route's bucket, if one is known.
    /// Sleeps round up to the next millisecond.
    pub async fn acquire(&self, route: &str) {
        loop {
            let now = Instant::now();
            let delay = self.global.lock().acquire(now);
            match delay {
                Some(delay) => {
                    warn!("global rate limit reached, pausing request to {}", route);
                    tokio::time::sleep(ceil_millis(delay)).await;
                }
                None => break,
            }
        }
        if let Some(bucket) = self.bucket_for_route(route) {
            let delay = bucket.lock().delay(Instant::now());
            if let Some(delay) = delay {
                warn!("bucket limit reached, pausing request to {}", route);
                tokio::time::sleep(ceil_millis(delay)).await;
                let mut bucket = bucket.lock();
                if bucket.remaining <= 0 {
                    bucket.remaining = bucket.limit;
                }
            }
        }
    }

    /// Fails with `invalid_state` once the invalid-request ceiling is hit.
    pub fn check_invalid_ceiling(&self) -> Result<()> {
        if self.invalid.lock().at_ceiling(Instant::now()) {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "invalid request ceiling reached; refusing to call the API",
            ));
        }
        Ok(())
    }

    /// Records a 401, 403 or 429 response against the ceiling.
    pub fn record_invalid(&self) {
        self.invalid.lock().record(Instant::now());
    }

    /// Applies response headers: learns the route→bucket mapping on first
    /// sight and re-syncs the bucket's counters.
    pub fn sync_from_headers(
        &self,
        route: &str,
        headers: &RateLimitHeaders,
        received: Instant,
    ) {
        let Some(bucket_key) = headers.bucket.as_deref() else {
            // No bucket header: fall back to client-side accounting.
            if let Some(bucket) = self.bucket_for_route(route) {
                bucket.lock().consume();
            }
            return;
        };

        {
            let mut routes = self.routes.write();
            match routes.get(route) {
                Some(known) if known == bucket_key => {}
                _ => {
                    debug!("route {} maps to bucket {}", route, bucket_key);
                    routes.insert(route.to_owned(), bucket_key.to_owned());
                }
            }
        }

        let bucket = {
            let mut buckets = self.buckets.write();
            Arc::clone(
                buckets
                    .entry(bucket_key.to_owned())
                    .or_insert_with(|| Arc::new(Mutex::new(Bucket::new(bucket_key.to_owned())))),
            )
        };
        bucket.lock().sync(headers, received);
    }

    /// Pauses every request for `delay` in response to a global 429.
    pub fn pause_global(&self, delay: Duration) {
        self.global.lock().pause(Instant::now() + delay);
    }

    /// Whether a bucket hash has been discovered.
    pub fn has_bucket(&self, bucket_key: &str) -> bool {
        self.buckets.read().contains_key(bucket_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(limit: u32, remaining: u32, reset_after: f64, bucket: &str) -> RateLimitHeaders {
        RateLimitHeaders {
            limit: Some(limit),
            remaining: Some(remaining),
            reset_after: Some(reset_after),
            bucket: Some(bucket.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn learns_route_to_bucket_mapping() {
        let limiter = RateLimiter::new(50, Duration::from_secs(1), 0, Duration::from_secs(600));
        assert!(!limiter.has_bucket("abc"));
        limiter.sync_from_headers("/channels/1/messages", &headers(5, 4, 1.0, "abc"), Instant::now());
        assert!(limiter.has_bucket("abc"));
        let bucket = limiter.bucket_for_route("/channels/1/messages").unwrap();
        assert_eq!(bucket.lock().remaining, 4);
    }

    #[test]
    fn remaining_never_goes_negative_without_headers() {
        let limiter = RateLimiter::new(50, Duration::from_secs(1), 0, Duration::from_secs(600));
        limiter.sync_from_headers("/users/@me", &headers(1, 0, 1.0, "u"), Instant::now());
        let bucket = limiter.bucket_for_route("/users/@me").unwrap();
        // header-less responses decrement client-side, floored at zero
        let empty = RateLimitHeaders::default();
        limiter.sync_from_headers("/users/@me", &empty, Instant::now());
        limiter.sync_from_headers("/users/@me", &empty, Instant::now());
        assert_eq!(bucket.lock().remaining, 0);
    }

    #[test]
    fn invalid_ceiling_trips_after_limit() {
        let limiter = RateLimiter::new(50, Duration::from_secs(1), 2, Duration::from_secs(600));
        assert!(limiter.check_invalid_ceiling().is_ok());
        limiter.record_invalid();
        assert!(limiter.check_invalid_ceiling().is_ok());
        limiter.record_invalid();
        let err = limiter.check_invalid_ceiling().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn ceil_millis_rounds_up() {
        assert_eq!(ceil_millis(Duration::from_micros(1)), Duration::from_millis(1));
        assert_eq!(ceil_millis(Duration::from_millis(3)), Duration::from_millis(3));
        assert_eq!(
            ceil_millis(Duration::from_micros(4500)),
            Duration::from_millis(5)
        );
    }

    #[tokio::test]
    async fn global_bucket_caps_requests_per_window() {
        let limiter = RateLimiter::new(2, Duration::from_millis(30), 0, Duration::from_secs(600));
        let start = Instant::now();
        limiter.acquire("/a").await;
        limiter.acquire("/a").await;
        assert!(start.elapsed() < Duration::from_millis(25));
        limiter.acquire("/a").await;
        assert!(start.elapsed() >= Duration::from_millis(25));
    }
}
