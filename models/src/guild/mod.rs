//! Structs related to Discord guilds.
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::presence::Presence;
use crate::snowflake::Snowflake;
use crate::voice::VoiceState;

pub use self::member::GuildMember;
pub use self::role::Role;

mod member;
mod role;

/// A guild (server) on Discord.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Guild {
    /// The snowflake ID of this guild.
    pub id: Snowflake,
    /// The name of this guild.
    #[serde(default)]
    pub name: String,
    /// The icon hash of this guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// The splash hash of this guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splash: Option<String>,
    /// The ID of the user who owns this guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
    /// The ID of this guild's AFK voice channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub afk_channel_id: Option<Snowflake>,
    /// The AFK timeout, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub afk_timeout: Option<u32>,
    /// The verification level required to chat in this guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_level: Option<u8>,
    /// The default message notification level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_message_notifications: Option<u8>,
    /// The explicit content filter level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_content_filter: Option<u8>,
    /// The roles configured in this guild.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    /// The enabled feature strings of this guild.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    /// The required MFA level for moderation actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_level: Option<u8>,
    /// The application ID of the bot that created this guild, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Snowflake>,
    /// The ID of the channel where system messages are posted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_channel_id: Option<Snowflake>,
    /// When the current user joined this guild. Only sent on GUILD_CREATE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<FixedOffset>>,
    /// Whether this guild is considered large. Only sent on GUILD_CREATE.
    #[serde(default)]
    pub large: bool,
    /// Whether this guild is unavailable due to an outage.
    #[serde(default)]
    pub unavailable: bool,
    /// The total member count. Only sent on GUILD_CREATE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    /// The voice states of connected members. Only sent on GUILD_CREATE.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub voice_states: Vec<VoiceState>,
    /// The members of this guild. Only sent on GUILD_CREATE.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<GuildMember>,
    /// The channels of this guild. Only sent on GUILD_CREATE.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
    /// The presences of online members. Only sent on GUILD_CREATE.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presences: Vec<Presence>,
    /// The guild's boost tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_tier: Option<u8>,
    /// The number of boosts this guild has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_subscription_count: Option<u64>,
    /// The preferred locale of this guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_locale: Option<String>,
    /// The description of this guild, if discoverable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A guild whose full payload has not been delivered, as on READY or during
/// an outage.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UnavailableGuild {
    /// The snowflake ID of this guild.
    pub id: Snowflake,
    /// Whether the guild is unavailable.
    #[serde(default)]
    pub unavailable: bool,
}
