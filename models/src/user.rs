use serde::{Deserialize, Serialize};

use crate::snowflake::Snowflake;

/// Represents a User on Discord.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct User {
    /// The Snowflake ID of this user.
    pub id: Snowflake,
    /// The username of this user.
    #[serde(default)]
    pub username: String,
    /// The four-digit tag following the user's username, `0` for migrated users.
    #[serde(default)]
    pub discriminator: String,
    /// The user's display name, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    /// The user's avatar hash, if they have one.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether or not this user is a bot.
    #[serde(default)]
    pub bot: bool,
    /// Whether this user is an official Discord system user.
    #[serde(default)]
    pub system: bool,
    /// Whether or not this user has two factor authentication on their account.
    #[serde(default)]
    pub mfa_enabled: bool,
    /// The user's banner hash, if they have one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// The user's accent color as an integer, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<u32>,
    /// The user's chosen locale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// The flags on the user's account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    /// The user's nitro subscription tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_type: Option<u8>,
    /// The public flags on the user's account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_flags: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::User;
    use crate::snowflake::Snowflake;

    #[test]
    fn parses_partial_users_and_ignores_unknown_fields() {
        let user: User = serde_json::from_str(
            r#"{"id":"1","username":"b","discriminator":"0","brand_new_field":3}"#,
        )
        .unwrap();
        assert_eq!(user.id, Snowflake(1));
        assert_eq!(user.username, "b");
        assert!(!user.bot);
    }
}
