//! Client configuration.
use std::time::Duration;

use log::LevelFilter;

use glint_model::{Error, ErrorKind, Result};
use glint_rest::http::{format_user_agent, user_agent_is_valid};
use glint_rest::{AuthType, DEFAULT_USER_AGENT};

use crate::logger::LogCallback;

/// The pieces of a compliant User-Agent, assembled as
/// `DiscordBot (<url>, <version>) <name> <extra?>`.
#[derive(Debug, Clone)]
pub struct UserAgentInfo {
    pub name: String,
    pub version: String,
    pub url: String,
    pub extra: Option<String>,
}

/// Configuration for a [`Client`](crate::Client).
#[derive(Clone)]
pub struct Config {
    /// The token, without its scheme prefix.
    pub token: String,
    /// Whether the token is a bot or a bearer token.
    pub auth_type: AuthType,
    /// The gateway intent bitset sent on identify.
    pub intents: u32,
    /// This process's `(shard_id, shard_count)` identity, if sharding.
    pub shard: Option<(u64, u64)>,
    /// Guild size at which offline members stop being sent; `[50, 250]`.
    pub large_threshold: Option<u8>,
    /// A fully rendered User-Agent. Wins over `user_agent_info`.
    pub user_agent: Option<String>,
    /// User-Agent pieces, used when `user_agent` is unset.
    pub user_agent_info: Option<UserAgentInfo>,
    /// Whole-request deadline for REST calls.
    pub http_timeout: Duration,
    /// Deadline for opening the gateway websocket.
    pub gateway_timeout: Duration,
    /// Transport (`zlib-stream`) compression of inbound gateway frames.
    pub enable_compression: bool,
    /// Compression of the identify payload. Mutually exclusive with
    /// `enable_compression`.
    pub enable_payload_compression: bool,
    /// Severity filter for the log sink.
    pub log_level: LevelFilter,
    /// Replaces the default stderr writer of the log sink.
    pub log_callback: Option<LogCallback>,
    /// Retry budget for recoverable REST failures.
    pub max_retries: u32,
    /// Requests allowed per global rate-limit window.
    pub global_rate_limit_per_sec: u32,
    /// Length of the global rate-limit window.
    pub global_window: Duration,
    /// 401/403/429 responses tolerated per window before the client refuses
    /// further REST calls.
    pub invalid_request_limit: u32,
    /// Length of the invalid-request window.
    pub invalid_request_window: Duration,
}

impl Config {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            auth_type: AuthType::Bot,
            intents: 0,
            shard: None,
            large_threshold: None,
            user_agent: None,
            user_agent_info: None,
            http_timeout: Duration::from_secs(15),
            gateway_timeout: Duration::from_secs(30),
            enable_compression: false,
            enable_payload_compression: false,
            log_level: LevelFilter::Info,
            log_callback: None,
            max_retries: 3,
            global_rate_limit_per_sec: 50,
            global_window: Duration::from_secs(1),
            invalid_request_limit: 10_000,
            invalid_request_window: Duration::from_secs(600),
        }
    }

    pub fn auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    pub fn intents(mut self, intents: u32) -> Self {
        self.intents = intents;
        self
    }

    pub fn shard(mut self, id: u64, count: u64) -> Self {
        self.shard = Some((id, count));
        self
    }

    pub fn large_threshold(mut self, threshold: u8) -> Self {
        self.large_threshold = Some(threshold);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn user_agent_info(mut self, info: UserAgentInfo) -> Self {
        self.user_agent_info = Some(info);
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    pub fn payload_compression(mut self, enabled: bool) -> Self {
        self.enable_payload_compression = enabled;
        self
    }

    pub fn log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    pub fn log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }

    /// The User-Agent this configuration resolves to.
    pub fn resolved_user_agent(&self) -> String {
        if let Some(user_agent) = &self.user_agent {
            return user_agent.clone();
        }
        if let Some(info) = &self.user_agent_info {
            let extra = match &info.extra {
                Some(extra) => format!("{} {}", info.name, extra),
                None => info.name.clone(),
            };
            return format_user_agent(&info.url, &info.version, Some(&extra));
        }
        DEFAULT_USER_AGENT.to_owned()
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(Error::new(ErrorKind::InvalidParam, "token must not be empty"));
        }
        if self.enable_compression && self.enable_payload_compression {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "transport and payload compression are mutually exclusive",
            ));
        }
        if let Some(threshold) = self.large_threshold {
            if !(50..=250).contains(&threshold) {
                return Err(Error::new(
                    ErrorKind::InvalidParam,
                    "large_threshold must lie in [50, 250]",
                ));
            }
        }
        if let Some((id, count)) = self.shard {
            if count == 0 || id >= count {
                return Err(Error::new(
                    ErrorKind::InvalidParam,
                    "shard id must be less than the shard count",
                ));
            }
        }
        if !user_agent_is_valid(&self.resolved_user_agent()) {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                format!("malformed User-Agent {:?}", self.resolved_user_agent()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_both_compression_modes() {
        let config = Config::new("t").compression(true).payload_compression(true);
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidParam);
        assert!(Config::new("t").compression(true).validate().is_ok());
        assert!(Config::new("t").payload_compression(true).validate().is_ok());
    }

    #[test]
    fn user_agent_resolution_prefers_the_full_string() {
        let config = Config::new("t")
            .user_agent("DiscordBot (https://example.com, 0.1.0)")
            .user_agent_info(UserAgentInfo {
                name: "other".into(),
                version: "9.9".into(),
                url: "https://other.example".into(),
                extra: None,
            });
        assert_eq!(
            config.resolved_user_agent(),
            "DiscordBot (https://example.com, 0.1.0)"
        );
    }

    #[test]
    fn user_agent_info_renders_the_compliant_format() {
        let config = Config::new("t").user_agent_info(UserAgentInfo {
            name: "mybot".into(),
            version: "0.2.0".into(),
            url: "https://example.com".into(),
            extra: Some("extra-token".into()),
        });
        assert_eq!(
            config.resolved_user_agent(),
            "DiscordBot (https://example.com, 0.2.0) mybot extra-token"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_shard_tuples() {
        assert!(Config::new("t").shard(0, 1).validate().is_ok());
        assert!(Config::new("t").shard(1, 1).validate().is_err());
        assert!(Config::new("t").shard(0, 0).validate().is_err());
    }

    #[test]
    fn rejects_malformed_user_agent() {
        let config = Config::new("t").user_agent("BadBot 1.0");
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidParam);
    }
}
