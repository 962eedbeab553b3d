//! Structs related to voice connections on Discord.
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::guild::GuildMember;
use crate::snowflake::Snowflake;

/// A user's voice connection status in a guild.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct VoiceState {
    /// The guild this voice state is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// The channel the user is connected to, `None` when disconnecting.
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    /// The user this voice state belongs to.
    pub user_id: Snowflake,
    /// The guild member this voice state belongs to, if in a guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<GuildMember>,
    /// The session ID of this voice connection.
    pub session_id: String,
    /// Whether the user is deafened by the guild.
    #[serde(default)]
    pub deaf: bool,
    /// Whether the user is muted by the guild.
    #[serde(default)]
    pub mute: bool,
    /// Whether the user has deafened themselves.
    #[serde(default)]
    pub self_deaf: bool,
    /// Whether the user has muted themselves.
    #[serde(default)]
    pub self_mute: bool,
    /// Whether the user is streaming.
    #[serde(default)]
    pub self_stream: bool,
    /// Whether the user's camera is enabled.
    #[serde(default)]
    pub self_video: bool,
    /// Whether the user's permission to speak is denied.
    #[serde(default)]
    pub suppress: bool,
    /// When the user requested to speak in a stage channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_to_speak_timestamp: Option<DateTime<FixedOffset>>,
}

/// A Discord voice region.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct VoiceRegion {
    /// The unique ID for this region.
    pub id: String,
    /// The name of this region.
    pub name: String,
    /// Whether this region is closest to the requesting client.
    #[serde(default)]
    pub optimal: bool,
    /// Whether this is a deprecated region.
    #[serde(default)]
    pub deprecated: bool,
    /// Whether this is a custom region, used for events and the like.
    #[serde(default)]
    pub custom: bool,
}
