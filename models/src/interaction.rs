//! Structs related to interactions: slash commands, components and modals.
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::channel::Channel;
use crate::guild::GuildMember;
use crate::message::Message;
use crate::snowflake::Snowflake;
use crate::User;

/// An interaction received from Discord.
///
/// The `data`, `entitlements` and `authorizing_integration_owners` payloads
/// vary per interaction type and are preserved verbatim; callers re-parse the
/// pieces they understand.
#[derive(Deserialize, Serialize, Debug)]
pub struct Interaction {
    /// The snowflake ID of this interaction.
    pub id: Snowflake,
    /// The ID of the application this interaction is for.
    pub application_id: Snowflake,
    /// The type of this interaction.
    #[serde(rename = "type")]
    pub kind: u8,
    /// The command or component payload, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<RawValue>>,
    /// The guild the interaction was sent from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// The channel the interaction was sent from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Box<Channel>>,
    /// The ID of the channel the interaction was sent from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    /// The invoking guild member, when sent from a guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<GuildMember>,
    /// The invoking user, when sent from a DM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// The continuation token for responding to this interaction.
    pub token: String,
    /// Always `1`.
    #[serde(default)]
    pub version: u8,
    /// The message a component interaction was attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Box<Message>>,
    /// The permissions the app has in the source channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_permissions: Option<String>,
    /// The locale of the invoking user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// The preferred locale of the source guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_locale: Option<String>,
    /// Entitlements of the invoking user, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitlements: Option<Box<RawValue>>,
    /// The installation contexts that authorized this interaction, preserved
    /// verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizing_integration_owners: Option<Box<RawValue>>,
    /// The context this interaction was triggered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::Interaction;

    #[test]
    fn data_round_trips_verbatim() {
        let raw = r#"{"id":"3","application_id":"7","type":2,"token":"tok","version":1,"data":{"id":"9","name":"ping","options":[{"name":"n","type":4,"value":3}]}}"#;
        let interaction: Interaction = serde_json::from_str(raw).unwrap();
        let out = serde_json::to_string(&interaction).unwrap();
        let again: Interaction = serde_json::from_str(&out).unwrap();
        assert_eq!(
            again.data.unwrap().get(),
            interaction.data.unwrap().get()
        );
    }
}
