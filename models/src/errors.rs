use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    result::Result as StdResult,
};

use serde_json::value::RawValue;

/// A modified result type which encompasses the global error type.
pub type Result<T> = StdResult<T, Error>;

/// The closed set of error kinds which can occur throughout the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An argument did not satisfy the operation's contract.
    InvalidParam,
    /// A required value was missing.
    NullPointer,
    /// An allocation was refused.
    OutOfMemory,
    /// A caller-provided buffer could not hold the result.
    BufferTooSmall,
    /// A value was structurally malformed.
    InvalidFormat,
    /// A value could not be parsed.
    ParseError,
    /// The transport failed below the protocol layer.
    Network,
    /// An HTTP response outside the mapped status set.
    Http,
    /// The websocket connection failed.
    Websocket,
    /// JSON could not be read or written.
    Json,
    /// The request was rejected by a rate limit.
    RateLimited,
    Unauthorized,
    Forbidden,
    NotFound,
    Timeout,
    NotImplemented,
    Unknown,
    BadRequest,
    NotModified,
    MethodNotAllowed,
    Conflict,
    /// The service is temporarily unavailable (502/503).
    Unavailable,
    /// Any other server-side failure (5xx).
    ServerError,
    /// The client is in a state which forbids the operation.
    InvalidState,
    /// A transient condition; retrying may succeed.
    TryAgain,
}

impl ErrorKind {
    /// Whether an operation failing with this kind may be retried.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network
                | ErrorKind::Timeout
                | ErrorKind::RateLimited
                | ErrorKind::Unavailable
                | ErrorKind::ServerError
                | ErrorKind::TryAgain
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParam => "invalid parameter",
            ErrorKind::NullPointer => "missing value",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::BufferTooSmall => "buffer too small",
            ErrorKind::InvalidFormat => "invalid format",
            ErrorKind::ParseError => "parse error",
            ErrorKind::Network => "network error",
            ErrorKind::Http => "http error",
            ErrorKind::Websocket => "websocket error",
            ErrorKind::Json => "json error",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not found",
            ErrorKind::Timeout => "timed out",
            ErrorKind::NotImplemented => "not implemented",
            ErrorKind::Unknown => "unknown error",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::NotModified => "not modified",
            ErrorKind::MethodNotAllowed => "method not allowed",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unavailable => "service unavailable",
            ErrorKind::ServerError => "server error",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::TryAgain => "try again",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Maps an HTTP status code onto an error kind.
///
/// Returns `None` for the success statuses (200, 201, 202, 204); every other
/// code maps to exactly one kind.
pub fn status_from_http(code: u16) -> Option<ErrorKind> {
    match code {
        200 | 201 | 202 | 204 => None,
        304 => Some(ErrorKind::NotModified),
        400 => Some(ErrorKind::BadRequest),
        401 => Some(ErrorKind::Unauthorized),
        403 => Some(ErrorKind::Forbidden),
        404 => Some(ErrorKind::NotFound),
        405 => Some(ErrorKind::MethodNotAllowed),
        409 => Some(ErrorKind::Conflict),
        429 => Some(ErrorKind::RateLimited),
        502 | 503 => Some(ErrorKind::Unavailable),
        500..=599 => Some(ErrorKind::ServerError),
        _ => Some(ErrorKind::Http),
    }
}

/// The richer error body Discord attaches to failed requests.
#[derive(Debug)]
pub struct ApiError {
    /// The error code returned by Discord.
    pub code: i64,
    /// The error message returned by Discord.
    pub message: String,
    /// The nested `errors` object, preserved verbatim.
    pub errors: Option<Box<RawValue>>,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Represents a global error which can occur throughout the library.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    api: Option<ApiError>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            api: None,
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            api: None,
            source: Some(source.into()),
        }
    }

    /// Attaches the server-provided error body to an HTTP-mapped error.
    pub fn with_api(mut self, api: ApiError) -> Self {
        self.api = Some(api);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The Discord error body, when the server supplied one.
    pub fn api(&self) -> Option<&ApiError> {
        self.api.as_ref()
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }?;
        if let Some(api) = &self.api {
            write!(f, " ({})", api)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json, err.to_string(), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::OutOfMemory => ErrorKind::OutOfMemory,
            _ => ErrorKind::Network,
        };
        Error::with_source(kind, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_total() {
        assert_eq!(status_from_http(200), None);
        assert_eq!(status_from_http(204), None);
        assert_eq!(status_from_http(304), Some(ErrorKind::NotModified));
        assert_eq!(status_from_http(400), Some(ErrorKind::BadRequest));
        assert_eq!(status_from_http(401), Some(ErrorKind::Unauthorized));
        assert_eq!(status_from_http(403), Some(ErrorKind::Forbidden));
        assert_eq!(status_from_http(404), Some(ErrorKind::NotFound));
        assert_eq!(status_from_http(405), Some(ErrorKind::MethodNotAllowed));
        assert_eq!(status_from_http(409), Some(ErrorKind::Conflict));
        assert_eq!(status_from_http(429), Some(ErrorKind::RateLimited));
        assert_eq!(status_from_http(502), Some(ErrorKind::Unavailable));
        assert_eq!(status_from_http(503), Some(ErrorKind::Unavailable));
        assert_eq!(status_from_http(500), Some(ErrorKind::ServerError));
        assert_eq!(status_from_http(599), Some(ErrorKind::ServerError));
        assert_eq!(status_from_http(418), Some(ErrorKind::Http));
        assert_eq!(status_from_http(301), Some(ErrorKind::Http));
    }

    #[test]
    fn recoverable_kinds() {
        for kind in [
            ErrorKind::Network,
            ErrorKind::Timeout,
            ErrorKind::RateLimited,
            ErrorKind::Unavailable,
            ErrorKind::ServerError,
            ErrorKind::TryAgain,
        ] {
            assert!(kind.is_recoverable(), "{kind} should be recoverable");
        }
        for kind in [
            ErrorKind::InvalidParam,
            ErrorKind::Unauthorized,
            ErrorKind::Forbidden,
            ErrorKind::InvalidState,
            ErrorKind::Json,
        ] {
            assert!(!kind.is_recoverable(), "{kind} should not be recoverable");
        }
    }
}
