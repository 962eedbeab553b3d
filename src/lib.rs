//! glint — a Discord bot library built from a resumable gateway client and a
//! bucket-aware REST pipeline.
//!
//! The facade [`Client`] owns configuration, performs the `GET /gateway/bot`
//! handshake, and hands out typed wrappers over the REST pipeline. Gateway
//! sessions are driven by awaiting [`Shard::process`] in the host's loop.
//!
//! ```no_run
//! use glint::{Client, Config, EventHandler, ShardState};
//! use serde_json::value::RawValue;
//! use std::time::Duration;
//!
//! struct Handler;
//!
//! impl EventHandler for Handler {
//!     fn on_event(&mut self, name: &str, data: &RawValue) {
//!         println!("{}: {}", name, data.get());
//!     }
//! }
//!
//! # async fn run() -> glint::Result<()> {
//! let config = Config::new(glint::env::resolve_token("DISCORD_TOKEN", &Default::default())?)
//!     .intents(glint::model::gateway::intents::GUILD_MESSAGES);
//! let client = Client::new(config)?;
//! let mut shard = client.connect(Box::new(Handler)).await?;
//! while shard.state() != ShardState::Disconnected {
//!     shard.process(Duration::from_secs(5)).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub use glint_gateway as gateway;
pub use glint_model as model;
pub use glint_rest as rest;

pub use crate::client::{Client, FileUpload};
pub use crate::config::{Config, UserAgentInfo};
pub use gateway::{EventHandler, Shard, ShardState};
pub use model::{ApiError, Error, ErrorKind, Result, Snowflake};
pub use rest::AuthType;

pub mod client;
pub mod config;
pub mod env;
pub mod logger;
