use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::double_option;
use crate::snowflake::Snowflake;
use crate::User;

/// A member of a guild.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct GuildMember {
    /// The user this member represents. Absent in message attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// The member's guild nickname. Distinguishes a missing key from an
    /// explicit null (nickname cleared).
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub nick: Option<Option<String>>,
    /// The member's guild-specific avatar hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// The IDs of the roles this member has.
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    /// When the member joined the guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<FixedOffset>>,
    /// When the member started boosting the guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_since: Option<DateTime<FixedOffset>>,
    /// Whether the member is deafened in voice channels.
    #[serde(default)]
    pub deaf: bool,
    /// Whether the member is muted in voice channels.
    #[serde(default)]
    pub mute: bool,
    /// Guild member flags.
    #[serde(default)]
    pub flags: u64,
    /// Whether the member has not yet passed membership screening.
    #[serde(default)]
    pub pending: bool,
    /// Until when the member is timed out, if they are.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_disabled_until: Option<DateTime<FixedOffset>>,
}

#[cfg(test)]
mod tests {
    use super::GuildMember;

    #[test]
    fn nick_null_survives_round_trip() {
        let member: GuildMember =
            serde_json::from_str(r#"{"nick":null,"roles":[],"deaf":false,"mute":false}"#).unwrap();
        assert_eq!(member.nick, Some(None));
        let out = serde_json::to_string(&member).unwrap();
        assert!(out.contains("\"nick\":null"));

        let member: GuildMember =
            serde_json::from_str(r#"{"roles":[],"deaf":false,"mute":false}"#).unwrap();
        assert_eq!(member.nick, None);
        assert!(!serde_json::to_string(&member).unwrap().contains("nick"));
    }
}
