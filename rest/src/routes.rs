//! Route canonicalization: collapsing concrete paths into the templates
//! Discord buckets by.
use http::Method;
use lazy_static::lazy_static;
use regex::Regex;

use glint_model::Snowflake;

lazy_static! {
    static ref WEBHOOK_TOKEN_RE: Regex =
        Regex::new(r"^(/webhooks/\d+)/[A-Za-z0-9_-]{64,}").unwrap();
    static ref REACTION_EMOJI_RE: Regex = Regex::new(r"/reactions/[^/]+").unwrap();
}

/// Segments whose IDs stay in the key because Discord buckets by them.
const MAJOR_PARAMETERS: [&str; 3] = ["channels", "guilds", "webhooks"];

/// Canonicalizes a request path into its rate-limit route key.
///
/// Every snowflake segment is replaced by `:id`, except the one directly
/// following `channels`, `guilds` or `webhooks`. Webhook tokens and reaction
/// emojis collapse to a placeholder. Message deletes get their own key
/// because Discord buckets them apart from other message routes.
pub fn route_key(method: &Method, path: &str) -> String {
    let path = WEBHOOK_TOKEN_RE.replace(path, "$1/:token");
    let path = REACTION_EMOJI_RE.replace_all(&path, "/reactions/:emoji");

    let mut key = String::with_capacity(path.len());
    let mut previous = "";
    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }
        key.push('/');
        let is_snowflake = Snowflake::parse(segment).is_ok();
        if is_snowflake && !MAJOR_PARAMETERS.contains(&previous) {
            key.push_str(":id");
        } else {
            key.push_str(segment);
        }
        previous = segment;
    }

    if *method == Method::DELETE && key.ends_with("/messages/:id") {
        return format!("{}:{}", method.as_str(), key);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_channel_guild_and_webhook_ids() {
        assert_eq!(
            route_key(&Method::GET, "/channels/381880193251409931/messages/381880468700577792"),
            "/channels/381880193251409931/messages/:id"
        );
        assert_eq!(
            route_key(&Method::GET, "/guilds/81384788765712384/members/181380199374979673"),
            "/guilds/81384788765712384/members/:id"
        );
        assert_eq!(
            route_key(&Method::PATCH, "/users/181380199374979673"),
            "/users/:id"
        );
    }

    #[test]
    fn collapses_webhook_tokens() {
        let token = "a".repeat(68);
        assert_eq!(
            route_key(&Method::POST, &format!("/webhooks/381880193251409931/{token}")),
            "/webhooks/381880193251409931/:token"
        );
    }

    #[test]
    fn collapses_reaction_emojis() {
        assert_eq!(
            route_key(
                &Method::PUT,
                "/channels/381880193251409931/messages/381880468700577792/reactions/%F0%9F%98%80/@me"
            ),
            "/channels/381880193251409931/messages/:id/reactions/:emoji/@me"
        );
    }

    #[test]
    fn message_deletes_bucket_separately() {
        assert_eq!(
            route_key(&Method::DELETE, "/channels/381880193251409931/messages/381880468700577792"),
            "DELETE:/channels/381880193251409931/messages/:id"
        );
        assert_eq!(
            route_key(&Method::GET, "/channels/381880193251409931/messages/381880468700577792"),
            "/channels/381880193251409931/messages/:id"
        );
    }
}
