use serde::{Deserialize, Serialize};

use crate::snowflake::Snowflake;

/// An emoji, either custom (with an ID) or unicode (name only).
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Emoji {
    /// The snowflake ID of a custom emoji.
    #[serde(default)]
    pub id: Option<Snowflake>,
    /// The emoji name, or the unicode character itself.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether this custom emoji is animated.
    #[serde(default)]
    pub animated: bool,
}
