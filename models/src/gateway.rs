//! Structs representing the various elements of the Discord gateway.
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::{Error, ErrorKind, Result};
use crate::guild::UnavailableGuild;
use crate::presence::Activity;
use crate::snowflake::Snowflake;
use crate::User;

/// The longest nonce accepted on a guild-members request, in bytes.
pub const MAX_MEMBER_REQUEST_NONCE_LEN: usize = 32;

/// Returns useful information about the application from the gateway.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GatewayBot {
    /// The websocket URL that can be used to begin connecting to this gateway.
    pub url: String,
    /// The recommended number of shards to spawn when connecting.
    pub shards: u64,
    /// Information regarding the current session start limit.
    pub session_start_limit: SessionStartLimit,
}

/// Useful information about a bot's session start limit.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionStartLimit {
    /// The total number of session starts the current user is allowed.
    pub total: i32,
    /// The remaining number of session starts the current user is allowed.
    pub remaining: i32,
    /// The time until the limit resets, in milliseconds.
    pub reset_after: i64,
    /// The number of identify requests allowed per 5 seconds.
    #[serde(default)]
    pub max_concurrency: i32,
}

/// A set of possible Discord gateway opcodes.
#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Dispatches a gateway event.
    Dispatch = 0,
    /// Used for sending ping and heartbeats.
    Heartbeat = 1,
    /// Used for obtaining a client handshake.
    Identify = 2,
    /// Used to update the shard's presence.
    PresenceUpdate = 3,
    /// Used to join and leave voice channels.
    VoiceStateUpdate = 4,
    /// Used to resume a closed connection.
    Resume = 6,
    /// Tells clients to reconnect to the gateway.
    Reconnect = 7,
    /// Used to request guild members.
    RequestGuildMembers = 8,
    /// Used to notify the client of an invalid session.
    InvalidSession = 9,
    /// Sent immediately after connecting, contains heartbeat information.
    Hello = 10,
    /// Sent immediately after receiving a heartbeat.
    HeartbeatAck = 11,
    /// Used to request a guild's soundboard sounds.
    RequestSoundboardSounds = 31,
}

/// A JSON packet that the client receives over the Discord gateway.
#[derive(Deserialize, Debug)]
pub struct ReceivePacket {
    /// The opcode for this payload.
    pub op: Opcode,
    /// The payload data, preserved verbatim.
    #[serde(default)]
    pub d: Option<Box<RawValue>>,
    /// The sequence number, present on dispatches.
    #[serde(default)]
    pub s: Option<u64>,
    /// The name of the event that was fired, if applicable.
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Serialize)]
struct SendPacket<'a, T: Serialize> {
    op: Opcode,
    d: &'a T,
}

fn wrap<T: Serialize>(op: Opcode, d: &T) -> Result<String> {
    serde_json::to_string(&SendPacket { op, d }).map_err(Error::from)
}

/// A packet which can be serialized and sent over the gateway.
pub trait SendablePacket {
    fn to_json(&self) -> Result<String>;
}

/// A JSON packet which defines the heartbeat the client should adhere to.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HelloPacket {
    /// The interval at which the shard should heartbeat, in milliseconds.
    pub heartbeat_interval: u64,
}

/// The packet received when a client completes a handshake with the Discord gateway.
#[derive(Deserialize, Serialize, Debug)]
pub struct ReadyPacket {
    /// The gateway version in use.
    pub v: i32,
    /// Information about the current user.
    pub user: User,
    /// The session ID that is used to resume a gateway connection.
    pub session_id: String,
    /// The URL to reconnect to when resuming this session.
    pub resume_gateway_url: String,
    /// The guilds that the user is currently in, initially unavailable.
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    /// Information about the current shard, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u64; 2]>,
    /// The partial application object, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Box<RawValue>>,
}

/// Used for identifying a shard with the gateway.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IdentifyPacket {
    /// The token this shard will use.
    pub token: String,
    /// The properties of the client.
    pub properties: IdentifyProperties,
    /// Whether to compress the identify payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    /// The member count at which the gateway stops sending offline members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u8>,
    /// Holds the sharding information for this shard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u64; 2]>,
    /// The initial presence of this shard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<StatusUpdate>,
    /// The gateway intents this shard subscribes to.
    pub intents: u32,
}

impl SendablePacket for IdentifyPacket {
    fn to_json(&self) -> Result<String> {
        wrap(Opcode::Identify, self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IdentifyProperties {
    /// The client's operating system.
    pub os: String,
    /// The name of the library.
    pub browser: String,
    /// The name of the library.
    pub device: String,
}

/// A packet used to resume a gateway connection.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResumePacket {
    /// The token of the client.
    pub token: String,
    /// The client's session ID.
    pub session_id: String,
    /// The last dispatch sequence received.
    pub seq: u64,
}

impl SendablePacket for ResumePacket {
    fn to_json(&self) -> Result<String> {
        wrap(Opcode::Resume, self)
    }
}

/// A JSON packet used to send a heartbeat to the gateway.
///
/// The payload data is the bare last-received sequence, or `null` before the
/// first dispatch.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatPacket {
    pub seq: Option<u64>,
}

impl SendablePacket for HeartbeatPacket {
    fn to_json(&self) -> Result<String> {
        wrap(Opcode::Heartbeat, &self.seq)
    }
}

/// A request for guild members over the gateway.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RequestGuildMembers {
    /// The guild to request members for.
    pub guild_id: Snowflake,
    /// A prefix that returned usernames must start with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// The maximum number of members to send.
    pub limit: u32,
    /// Whether to include presence data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presences: Option<bool>,
    /// Specific users to fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<Snowflake>>,
    /// An opaque tag echoed back in the member chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl RequestGuildMembers {
    /// Checks the request against the gateway's constraints: exactly one of
    /// `query` and `user_ids` must be populated, and the nonce is capped at
    /// 32 bytes.
    pub fn validate(&self) -> Result<()> {
        let has_query = self.query.is_some();
        let has_users = self.user_ids.as_ref().is_some_and(|ids| !ids.is_empty());
        if has_query == has_users {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "exactly one of query and user_ids must be set",
            ));
        }
        if let Some(nonce) = &self.nonce {
            if nonce.len() > MAX_MEMBER_REQUEST_NONCE_LEN {
                return Err(Error::new(
                    ErrorKind::InvalidParam,
                    "member request nonce exceeds 32 bytes",
                ));
            }
        }
        Ok(())
    }
}

impl SendablePacket for RequestGuildMembers {
    fn to_json(&self) -> Result<String> {
        wrap(Opcode::RequestGuildMembers, self)
    }
}

/// A request for the soundboard sounds of one or more guilds.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RequestSoundboardSounds {
    pub guild_ids: Vec<Snowflake>,
}

impl SendablePacket for RequestSoundboardSounds {
    fn to_json(&self) -> Result<String> {
        wrap(Opcode::RequestSoundboardSounds, self)
    }
}

/// An update to the client's voice state in a guild.
///
/// A `channel_id` of `None` disconnects the client from voice.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateVoiceState {
    pub guild_id: Snowflake,
    pub channel_id: Option<Snowflake>,
    pub self_mute: bool,
    pub self_deaf: bool,
}

impl SendablePacket for UpdateVoiceState {
    fn to_json(&self) -> Result<String> {
        wrap(Opcode::VoiceStateUpdate, self)
    }
}

/// A packet sent to indicate a presence update.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct StatusUpdate {
    /// Milliseconds since the client went idle, if it is.
    pub since: Option<u64>,
    /// The activities to display.
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// The status string, one of `online`, `idle`, `dnd` or `invisible`.
    pub status: String,
    /// Whether or not the client is AFK.
    pub afk: bool,
}

impl StatusUpdate {
    pub fn validate(&self) -> Result<()> {
        match self.status.as_str() {
            "online" | "idle" | "dnd" | "invisible" => Ok(()),
            other => Err(Error::new(
                ErrorKind::InvalidParam,
                format!("invalid presence status {:?}", other),
            )),
        }
    }
}

impl SendablePacket for StatusUpdate {
    fn to_json(&self) -> Result<String> {
        wrap(Opcode::PresenceUpdate, self)
    }
}

/// Codes that denote the cause of the gateway closing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    /// The cause of the error is unknown.
    UnknownError = 4000,
    /// The opcode or the payload for an opcode sent was invalid.
    UnknownOpcode = 4001,
    /// An invalid payload was sent.
    DecodeError = 4002,
    /// A payload was sent prior to identifying.
    NotAuthenticated = 4003,
    /// The token sent with the payload was invalid.
    AuthenticationFailed = 4004,
    /// More than one identify payload was sent.
    AlreadyAuthenticated = 4005,
    /// The sequence sent when resuming the session was invalid.
    InvalidSeq = 4007,
    /// A rate limit caused by sending payloads too quickly.
    RateLimited = 4008,
    /// The session timed out; a fresh identify is required.
    SessionTimeout = 4009,
    /// An invalid shard was sent when identifying.
    InvalidShard = 4010,
    /// The session would have had too many guilds; sharding is required.
    ShardingRequired = 4011,
    /// An invalid gateway version was requested.
    InvalidApiVersion = 4012,
    /// Invalid intents were sent when identifying.
    InvalidIntents = 4013,
    /// Intents were requested that the bot is not approved for.
    DisallowedIntents = 4014,
}

impl CloseCode {
    pub fn from_code(code: u16) -> Option<CloseCode> {
        Some(match code {
            4000 => CloseCode::UnknownError,
            4001 => CloseCode::UnknownOpcode,
            4002 => CloseCode::DecodeError,
            4003 => CloseCode::NotAuthenticated,
            4004 => CloseCode::AuthenticationFailed,
            4005 => CloseCode::AlreadyAuthenticated,
            4007 => CloseCode::InvalidSeq,
            4008 => CloseCode::RateLimited,
            4009 => CloseCode::SessionTimeout,
            4010 => CloseCode::InvalidShard,
            4011 => CloseCode::ShardingRequired,
            4012 => CloseCode::InvalidApiVersion,
            4013 => CloseCode::InvalidIntents,
            4014 => CloseCode::DisallowedIntents,
            _ => return None,
        })
    }

    /// Whether the connection may be re-established after this close.
    pub fn can_reconnect(self) -> bool {
        !matches!(
            self,
            CloseCode::AuthenticationFailed
                | CloseCode::InvalidShard
                | CloseCode::ShardingRequired
                | CloseCode::InvalidApiVersion
                | CloseCode::InvalidIntents
                | CloseCode::DisallowedIntents
        )
    }

    /// Whether the next attempt must identify from scratch instead of
    /// resuming.
    pub fn requires_new_session(self) -> bool {
        matches!(self, CloseCode::InvalidSeq | CloseCode::SessionTimeout)
    }
}

/// Reconnect predicate over raw close codes; unknown codes are reconnectable.
pub fn close_code_can_reconnect(code: u16) -> bool {
    CloseCode::from_code(code).map_or(true, CloseCode::can_reconnect)
}

/// Whether a raw close code forces the next attempt to re-identify.
pub fn close_code_requires_new_session(code: u16) -> bool {
    CloseCode::from_code(code).is_some_and(CloseCode::requires_new_session)
}

/// Gateway intent bits, set on the identify payload.
pub mod intents {
    pub const GUILDS: u32 = 1 << 0;
    pub const GUILD_MEMBERS: u32 = 1 << 1;
    pub const GUILD_MODERATION: u32 = 1 << 2;
    pub const GUILD_EXPRESSIONS: u32 = 1 << 3;
    pub const GUILD_INTEGRATIONS: u32 = 1 << 4;
    pub const GUILD_WEBHOOKS: u32 = 1 << 5;
    pub const GUILD_INVITES: u32 = 1 << 6;
    pub const GUILD_VOICE_STATES: u32 = 1 << 7;
    pub const GUILD_PRESENCES: u32 = 1 << 8;
    pub const GUILD_MESSAGES: u32 = 1 << 9;
    pub const GUILD_MESSAGE_REACTIONS: u32 = 1 << 10;
    pub const GUILD_MESSAGE_TYPING: u32 = 1 << 11;
    pub const DIRECT_MESSAGES: u32 = 1 << 12;
    pub const DIRECT_MESSAGE_REACTIONS: u32 = 1 << 13;
    pub const DIRECT_MESSAGE_TYPING: u32 = 1 << 14;
    pub const MESSAGE_CONTENT: u32 = 1 << 15;
    pub const GUILD_SCHEDULED_EVENTS: u32 = 1 << 16;
    pub const AUTO_MODERATION_CONFIGURATION: u32 = 1 << 20;
    pub const AUTO_MODERATION_EXECUTION: u32 = 1 << 21;
    pub const GUILD_MESSAGE_POLLS: u32 = 1 << 24;
    pub const DIRECT_MESSAGE_POLLS: u32 = 1 << 25;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_code_reconnect_table() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(!close_code_can_reconnect(code), "{code} must not reconnect");
        }
        for code in [4000, 4001, 4002, 4003, 4005, 4007, 4008, 4009, 1006, 4999] {
            assert!(close_code_can_reconnect(code), "{code} must reconnect");
        }
    }

    #[test]
    fn invalid_seq_and_session_timeout_force_reidentify() {
        assert!(close_code_requires_new_session(4007));
        assert!(close_code_requires_new_session(4009));
        assert!(!close_code_requires_new_session(4000));
        assert!(!close_code_requires_new_session(1006));
    }

    #[test]
    fn heartbeat_payload_is_bare_sequence() {
        let json = HeartbeatPacket { seq: Some(212) }.to_json().unwrap();
        assert_eq!(json, r#"{"op":1,"d":212}"#);
        let json = HeartbeatPacket { seq: None }.to_json().unwrap();
        assert_eq!(json, r#"{"op":1,"d":null}"#);
    }

    #[test]
    fn member_request_needs_exactly_one_selector() {
        let mut req = RequestGuildMembers {
            guild_id: Snowflake(1),
            query: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());

        req.user_ids = Some(vec![Snowflake(2)]);
        assert!(req.validate().is_err());

        req.query = None;
        assert!(req.validate().is_ok());

        req.user_ids = None;
        assert!(req.validate().is_err());

        req.query = Some("ab".into());
        req.nonce = Some("x".repeat(33));
        assert!(req.validate().is_err());
    }

    #[test]
    fn status_update_rejects_unknown_status() {
        let mut update = StatusUpdate {
            status: "online".into(),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        update.status = "offline".into();
        assert!(update.validate().is_err());
    }

    #[test]
    fn receive_packet_keeps_raw_dispatch_data() {
        let raw = r#"{"op":0,"s":3,"t":"MESSAGE_CREATE","d":{"id":"5","novel":true}}"#;
        let packet: ReceivePacket = serde_json::from_str(raw).unwrap();
        assert_eq!(packet.op, Opcode::Dispatch);
        assert_eq!(packet.s, Some(3));
        assert_eq!(packet.t.as_deref(), Some("MESSAGE_CREATE"));
        assert_eq!(packet.d.unwrap().get(), r#"{"id":"5","novel":true}"#);
    }
}
