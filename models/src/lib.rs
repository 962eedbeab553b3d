//! Discord entity types shared by the glint gateway and REST crates.

use serde::{Deserialize, Deserializer};

pub use errors::{status_from_http, ApiError, Error, ErrorKind, Result};
pub use snowflake::Snowflake;
pub use user::User;

pub mod channel;
pub mod errors;
pub mod gateway;
pub mod guild;
pub mod interaction;
pub mod message;
pub mod presence;
pub mod snowflake;
mod user;
pub mod voice;

/// Deserializer for fields where presence, explicit `null` and a value must
/// all be distinguished. Pair with `#[serde(default, skip_serializing_if =
/// "Option::is_none")]`: a missing key stays `None`, `null` becomes
/// `Some(None)` and a value becomes `Some(Some(..))`.
pub fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
