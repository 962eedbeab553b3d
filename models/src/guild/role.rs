use serde::{Deserialize, Serialize};

use crate::snowflake::Snowflake;

/// A role belonging to a guild.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Role {
    /// The snowflake ID of this role.
    pub id: Snowflake,
    /// The name of this role.
    pub name: String,
    /// The color of this role, as an integer.
    #[serde(default)]
    pub color: u32,
    /// Whether this role is pinned in the member list.
    #[serde(default)]
    pub hoist: bool,
    /// The icon hash of this role, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// The unicode emoji shown for this role, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicode_emoji: Option<String>,
    /// The sorting position of this role.
    #[serde(default)]
    pub position: i64,
    /// The permission bits of this role, as a decimal string.
    #[serde(default)]
    pub permissions: String,
    /// Whether this role is managed by an integration.
    #[serde(default)]
    pub managed: bool,
    /// Whether this role can be mentioned.
    #[serde(default)]
    pub mentionable: bool,
    /// The flags on this role.
    #[serde(default)]
    pub flags: u64,
}
