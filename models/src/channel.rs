//! Structs related to Discord channels.
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::double_option;
use crate::snowflake::Snowflake;
use crate::User;

/// A guild or DM channel on Discord.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Channel {
    /// The snowflake ID of this channel.
    pub id: Snowflake,
    /// The type of this channel.
    #[serde(rename = "type")]
    pub kind: ChannelType,
    /// The ID of the guild this channel belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// The sorting position of this channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// Explicit permission overwrites for members and roles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permission_overwrites: Vec<PermissionOverwrite>,
    /// The name of this channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The channel topic. Distinguishes a missing key from an explicit null.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub topic: Option<Option<String>>,
    /// Whether this channel is marked as NSFW.
    #[serde(default)]
    pub nsfw: bool,
    /// The ID of the last message sent in this channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<Snowflake>,
    /// The bitrate of this voice channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    /// The user limit of this voice channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_limit: Option<u32>,
    /// The slowmode interval, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_user: Option<u32>,
    /// The recipients of this DM channel.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<User>,
    /// The icon hash of this group DM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// The ID of the creator of this DM or thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
    /// The ID of the application that created this DM, if bot-created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Snowflake>,
    /// The ID of the parent category or, for threads, the parent channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    /// When the last message was pinned in this channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pin_timestamp: Option<DateTime<FixedOffset>>,
}

/// A list of channel types.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChannelType {
    #[default]
    GuildText = 0,
    Dm = 1,
    GuildVoice = 2,
    GroupDm = 3,
    GuildCategory = 4,
    GuildAnnouncement = 5,
    AnnouncementThread = 10,
    PublicThread = 11,
    PrivateThread = 12,
    GuildStageVoice = 13,
    GuildDirectory = 14,
    GuildForum = 15,
    GuildMedia = 16,
}

/// An explicit permission overwrite on a channel.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct PermissionOverwrite {
    /// The role or user ID this overwrite applies to.
    pub id: Snowflake,
    /// Whether the overwrite targets a role or a member.
    #[serde(rename = "type")]
    pub kind: OverwriteType,
    /// The allowed permission bits, as a decimal string.
    pub allow: String,
    /// The denied permission bits, as a decimal string.
    pub deny: String,
}

#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OverwriteType {
    Role = 0,
    Member = 1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_distinguishes_null_from_absent() {
        let absent: Channel = serde_json::from_str(r#"{"id":"1","type":0}"#).unwrap();
        assert_eq!(absent.topic, None);

        let null: Channel = serde_json::from_str(r#"{"id":"1","type":0,"topic":null}"#).unwrap();
        assert_eq!(null.topic, Some(None));

        let set: Channel =
            serde_json::from_str(r#"{"id":"1","type":0,"topic":"general"}"#).unwrap();
        assert_eq!(set.topic, Some(Some("general".into())));

        // explicit null survives a round trip, absence stays absent
        assert!(serde_json::to_string(&null).unwrap().contains("\"topic\":null"));
        assert!(!serde_json::to_string(&absent).unwrap().contains("topic"));
    }
}
