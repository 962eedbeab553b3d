//! The glint gateway client: a resumable websocket session with Discord.

use serde_json::value::RawValue;

pub use crate::connection::{Connection, Connector, TungsteniteConnector, WsMessage};
pub use crate::constants::{GATEWAY_URL, GATEWAY_VERSION};
pub use crate::inflater::Inflater;
pub use crate::shard::{Shard, ShardConfig, ShardState};

pub mod connection;
mod constants;
pub mod inflater;
pub mod shard;

/// The callback surface for gateway events.
///
/// Both methods run on the thread driving [`Shard::process`]; dispatches
/// arrive in receive order, never overlapping.
pub trait EventHandler: Send {
    /// Called for every dispatch. `data` is the frame's raw `d` payload, to
    /// be decoded selectively with the model types.
    fn on_event(&mut self, name: &str, data: &RawValue);

    /// Called when the shard's connection phase changes.
    fn on_state_change(&mut self, _state: ShardState) {}
}
