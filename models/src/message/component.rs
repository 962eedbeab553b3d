use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::message::Emoji;

/// An interactive component attached to a message.
///
/// Action rows nest further components; select menu `options` are preserved
/// verbatim because their shape varies by select type.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct Component {
    /// The component type.
    #[serde(rename = "type")]
    pub kind: u8,
    /// A developer-defined identifier, at most 100 characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    /// Whether the component is disabled.
    #[serde(default)]
    pub disabled: bool,
    /// The button style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    /// The text shown on a button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The emoji shown on a button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<Emoji>,
    /// The URL of a link button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Select menu options, preserved verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Box<RawValue>>,
    /// Placeholder text shown on an empty select menu.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// The minimum number of selected items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_values: Option<u8>,
    /// The maximum number of selected items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_values: Option<u8>,
    /// Child components of an action row.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}
