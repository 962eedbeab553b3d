//! Wire-level compliance helpers: canonical URLs, header formats and the
//! rate-limit header grammar.
use http::HeaderMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::value::RawValue;

use glint_model::{Error, ErrorKind, Result};

/// The only API base any request may target.
pub const BASE_URL: &str = "https://discord.com/api/v10";

lazy_static! {
    static ref USER_AGENT_RE: Regex =
        Regex::new(r"^DiscordBot \((\S+), (\S+)\)( \S.*)?$").unwrap();
}

/// Builds the canonical request URL.
///
/// Accepts a path beginning with `/`, or a full URL already rooted at
/// [`BASE_URL`]. Any other scheme, host or API version is rejected.
pub fn canonical_url(path_or_url: &str) -> Result<String> {
    if let Some(rest) = path_or_url.strip_prefix(BASE_URL) {
        if rest.starts_with('/') {
            return Ok(path_or_url.to_owned());
        }
    } else if path_or_url.starts_with('/') {
        return Ok(format!("{}{}", BASE_URL, path_or_url));
    }
    Err(Error::new(
        ErrorKind::InvalidParam,
        format!("request URL must be rooted at {}: {:?}", BASE_URL, path_or_url),
    ))
}

/// Whether a User-Agent satisfies Discord's `DiscordBot (<url>, <version>)`
/// format, optionally followed by a space and additional tokens.
pub fn user_agent_is_valid(user_agent: &str) -> bool {
    USER_AGENT_RE.is_match(user_agent)
}

/// Renders a compliant User-Agent from its pieces.
pub fn format_user_agent(url: &str, version: &str, extra: Option<&str>) -> String {
    match extra {
        Some(extra) if !extra.is_empty() => {
            format!("DiscordBot ({}, {}) {}", url, version, extra)
        }
        _ => format!("DiscordBot ({}, {})", url, version),
    }
}

/// The authentication schemes Discord accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    #[default]
    Bot,
    Bearer,
}

/// Renders the Authorization header value.
pub fn format_authorization(auth: AuthType, token: &str) -> String {
    match auth {
        AuthType::Bot => format!("Bot {}", token),
        AuthType::Bearer => format!("Bearer {}", token),
    }
}

/// Whether a request Content-Type is one Discord accepts.
pub fn content_type_is_allowed(value: &str) -> bool {
    let value = value.trim();
    if let Some(rest) = value.strip_prefix("application/json") {
        let rest = rest.trim_start();
        return rest.is_empty() || rest.starts_with(';');
    }
    if let Some(rest) = value.strip_prefix("multipart/form-data") {
        return rest
            .trim_start()
            .strip_prefix(';')
            .map_or(false, |params| params.contains("boundary="));
    }
    value == "application/x-www-form-urlencoded"
}

/// The two query spellings of a boolean, chosen per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolSpelling {
    TrueFalse,
    OneZero,
}

pub fn format_bool(value: bool, spelling: BoolSpelling) -> &'static str {
    match (spelling, value) {
        (BoolSpelling::TrueFalse, true) => "true",
        (BoolSpelling::TrueFalse, false) => "false",
        (BoolSpelling::OneZero, true) => "1",
        (BoolSpelling::OneZero, false) => "0",
    }
}

/// Rejects a body that is not well-formed JSON before it goes on the wire.
pub fn validate_json(body: &[u8]) -> Result<()> {
    serde_json::from_slice::<serde::de::IgnoredAny>(body)
        .map(|_| ())
        .map_err(|e| Error::with_source(ErrorKind::Json, "request body is not valid JSON", e))
}

/// The scope a rate limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    User,
    Guild,
    Shared,
}

impl RateLimitScope {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(RateLimitScope::User),
            "guild" => Some(RateLimitScope::Guild),
            "shared" => Some(RateLimitScope::Shared),
            _ => None,
        }
    }
}

/// The parsed `X-RateLimit-*` family. Absent headers stay `None`; numeric
/// values tolerate fractional seconds.
#[derive(Debug, Clone, Default)]
pub struct RateLimitHeaders {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset: Option<f64>,
    pub reset_after: Option<f64>,
    pub bucket: Option<String>,
    pub global: bool,
    pub scope: Option<RateLimitScope>,
    pub retry_after: Option<f64>,
}

impl RateLimitHeaders {
    pub fn parse(headers: &HeaderMap) -> Self {
        Self {
            limit: header_num(headers, "x-ratelimit-limit"),
            remaining: header_num(headers, "x-ratelimit-remaining"),
            reset: header_num(headers, "x-ratelimit-reset"),
            reset_after: header_num(headers, "x-ratelimit-reset-after"),
            bucket: header_str(headers, "x-ratelimit-bucket").map(str::to_owned),
            global: header_str(headers, "x-ratelimit-global")
                .map_or(false, |v| v.eq_ignore_ascii_case("true")),
            scope: header_str(headers, "x-ratelimit-scope").and_then(RateLimitScope::parse),
            retry_after: header_num(headers, "retry-after"),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_num<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    header_str(headers, name).and_then(|v| v.trim().parse().ok())
}

/// The error body Discord attaches to failed requests.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Arbitrarily nested field errors, preserved verbatim.
    #[serde(default)]
    pub errors: Option<Box<RawValue>>,
}

pub fn parse_error_body(body: &[u8]) -> Option<ErrorBody> {
    serde_json::from_slice(body).ok()
}

/// The JSON body of a 429 response.
#[derive(Deserialize, Debug)]
pub struct RateLimitBody {
    #[serde(default)]
    pub message: Option<String>,
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub code: Option<i64>,
}

pub fn parse_rate_limit_body(body: &[u8]) -> Option<RateLimitBody> {
    serde_json::from_slice(body).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderName, HeaderValue};

    #[test]
    fn canonical_url_requires_the_api_base() {
        assert_eq!(
            canonical_url("/channels/1/messages").unwrap(),
            "https://discord.com/api/v10/channels/1/messages"
        );
        assert_eq!(
            canonical_url("https://discord.com/api/v10/users/@me").unwrap(),
            "https://discord.com/api/v10/users/@me"
        );

        for input in [
            "https://example.com/api/v10",
            "https://discordapp.com/api/v10",
            "https://discord.com/api",
            "https://discord.com/api/v9",
            "https://discord.com/api/v10",
            "channels/1",
        ] {
            let err = canonical_url(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParam, "input {input:?}");
        }
    }

    #[test]
    fn user_agent_format() {
        assert!(user_agent_is_valid(
            "DiscordBot (https://example.com, 0.1.0) somelib"
        ));
        assert!(user_agent_is_valid("DiscordBot (https://example.com, 0.1.0)"));
        assert!(!user_agent_is_valid("BadBot 1.0"));
        assert!(!user_agent_is_valid(
            "DiscordBot (https://example.com, 0.1.0)bad"
        ));

        let formatted = format_user_agent("https://example.com", "0.1.0", Some("glint"));
        assert!(user_agent_is_valid(&formatted));
        assert_eq!(formatted, "DiscordBot (https://example.com, 0.1.0) glint");
    }

    #[test]
    fn content_type_whitelist() {
        assert!(content_type_is_allowed("application/json"));
        assert!(content_type_is_allowed("application/json; charset=utf-8"));
        assert!(content_type_is_allowed(
            "multipart/form-data; boundary=xyz"
        ));
        assert!(content_type_is_allowed("application/x-www-form-urlencoded"));
        assert!(!content_type_is_allowed("multipart/form-data"));
        assert!(!content_type_is_allowed("text/plain"));
        assert!(!content_type_is_allowed("application/xml"));
    }

    #[test]
    fn rate_limit_headers_tolerate_fractions_and_absence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from_static("5"),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from_static("0"),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-reset-after"),
            HeaderValue::from_static("0.473"),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-bucket"),
            HeaderValue::from_static("abcd1234"),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-scope"),
            HeaderValue::from_static("shared"),
        );

        let parsed = RateLimitHeaders::parse(&headers);
        assert_eq!(parsed.limit, Some(5));
        assert_eq!(parsed.remaining, Some(0));
        assert_eq!(parsed.reset_after, Some(0.473));
        assert_eq!(parsed.bucket.as_deref(), Some("abcd1234"));
        assert_eq!(parsed.scope, Some(RateLimitScope::Shared));
        assert_eq!(parsed.reset, None);
        assert_eq!(parsed.retry_after, None);
        assert!(!parsed.global);
    }

    #[test]
    fn error_body_preserves_nested_errors() {
        let body = br#"{"code":50035,"message":"Invalid Form Body","errors":{"content":{"_errors":[{"code":"BASE_TYPE_REQUIRED"}]}}}"#;
        let parsed = parse_error_body(body).unwrap();
        assert_eq!(parsed.code, Some(50035));
        assert_eq!(parsed.message.as_deref(), Some("Invalid Form Body"));
        assert!(parsed.errors.unwrap().get().contains("BASE_TYPE_REQUIRED"));
    }

    #[test]
    fn json_validator() {
        assert!(validate_json(br#"{"content":"x"}"#).is_ok());
        assert!(validate_json(b"{not json").is_err());
    }
}
