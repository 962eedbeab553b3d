//! Structs related to Discord messages.
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::channel::Channel;
use crate::guild::GuildMember;
use crate::snowflake::Snowflake;
use crate::User;

pub use self::attachment::{filename_is_valid, Attachment, AttachmentDescriptor};
pub use self::component::Component;
pub use self::embed::*;
pub use self::emoji::Emoji;

mod attachment;
mod component;
mod embed;
mod emoji;

/// A message sent in a channel on Discord.
///
/// Fields whose shape Discord still evolves (`application`, `poll`,
/// `message_snapshots`, `interaction_metadata`) are preserved as raw JSON so
/// they survive a parse/serialize round trip untouched.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct Message {
    /// The snowflake ID of the message.
    pub id: Snowflake,
    /// The ID of the channel that the message was sent in.
    pub channel_id: Snowflake,
    /// The ID of the guild that the message was sent in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// The author of the message. Not a valid user for webhook messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    /// The guild member form of the message author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<GuildMember>,
    /// The contents of this message.
    #[serde(default)]
    pub content: String,
    /// The time that this message was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// When this message was edited, if applicable.
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<FixedOffset>>,
    /// Whether or not this was a TTS message.
    #[serde(default)]
    pub tts: bool,
    /// Whether or not this message mentioned everyone.
    #[serde(default)]
    pub mention_everyone: bool,
    /// The users mentioned in this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<User>,
    /// The roles mentioned in this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mention_roles: Vec<Snowflake>,
    /// The message's attached files, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Any embeds sent with this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// The message's reactions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
    /// A tag used to validate that a message was sent; integer or string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<serde_json::Value>,
    /// Whether or not the message is pinned.
    #[serde(default)]
    pub pinned: bool,
    /// The ID of the webhook, if the message was sent by one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<Snowflake>,
    /// The type of message sent.
    #[serde(rename = "type", default)]
    pub kind: u8,
    /// Rich-presence activity attached to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<MessageActivity>,
    /// The partial application object, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Box<RawValue>>,
    /// The ID of the interaction's application, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Snowflake>,
    /// Message flags.
    #[serde(default)]
    pub flags: u64,
    /// The message this message references, for replies and forwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    /// Forwarded message snapshots, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_snapshots: Option<Box<RawValue>>,
    /// The replied-to message. No grand-parent chains exist, so an owned box
    /// is enough.
    #[serde(default)]
    pub referenced_message: Option<Box<Message>>,
    /// Metadata about the interaction that produced this message, preserved
    /// verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_metadata: Option<Box<RawValue>>,
    /// The thread started from this message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Box<Channel>>,
    /// The interactive components attached to this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    /// The approximate position of the message in a thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// The poll attached to this message, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<Box<RawValue>>,
}

/// A reaction on a message.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Reaction {
    /// How many users reacted with this emoji.
    pub count: u32,
    /// Whether the current user reacted with this emoji.
    #[serde(default)]
    pub me: bool,
    /// The emoji reacted with.
    pub emoji: Emoji,
}

/// A Rich Presence message activity.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MessageActivity {
    /// The type of message activity.
    #[serde(rename = "type")]
    pub kind: u8,
    /// The party ID from a Rich Presence event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
}

/// A reference to another message, carried on replies and forwards.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MessageReference {
    /// The ID of the referenced message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Snowflake>,
    /// The ID of the channel the referenced message lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    /// The ID of the guild the referenced message lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// Whether sending should fail if the referenced message is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_if_not_exists: Option<bool>,
}

/// The body of a message creation request.
#[derive(Serialize, Debug, Default)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sticker_ids: Vec<Snowflake>,
    /// Attachment descriptors; indices into the upload part list when files
    /// are attached, existing attachment IDs otherwise. Mixing the two in one
    /// request is rejected before sending.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"id":"41771983429993937","channel_id":"41771983423143937","author":{"id":"53908099506183680","username":"mason","discriminator":"9999","avatar":"a_bab14f271d565501444b2ca3be944b25"},"content":"supa hot","timestamp":"2017-07-11T17:27:07.299000+00:00","edited_timestamp":null,"tts":false,"mention_everyone":false,"mentions":[],"mention_roles":[],"attachments":[],"embeds":[],"pinned":false,"type":0,"poll":{"question":{"text":"hm?"},"future_field":[1,2]},"referenced_message":{"id":"41771983429993936","channel_id":"41771983423143937","content":"earlier","type":0}}"#;

    #[test]
    fn parses_and_preserves_raw_fields() {
        let message: Message = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(message.id, Snowflake(41771983429993937));
        assert_eq!(message.content, "supa hot");
        assert_eq!(
            message.referenced_message.as_ref().unwrap().content,
            "earlier"
        );
        // unknown subfields of the poll survive untouched
        assert_eq!(
            message.poll.as_ref().unwrap().get(),
            r#"{"question":{"text":"hm?"},"future_field":[1,2]}"#
        );

        let out = serde_json::to_string(&message).unwrap();
        assert!(out.contains(r#""future_field":[1,2]"#));
        let again: Message = serde_json::from_str(&out).unwrap();
        assert_eq!(again.poll.unwrap().get(), message.poll.unwrap().get());
    }
}
