//! The facade client: owns the REST pipeline, opens gateway sessions, and
//! exposes typed wrappers over common endpoints.
use std::sync::Arc;

use http::Method;
use log::debug;

use glint_gateway::{EventHandler, Shard, ShardConfig, TungsteniteConnector};
use glint_model::channel::Channel;
use glint_model::gateway::GatewayBot;
use glint_model::guild::{Guild, GuildMember};
use glint_model::message::{CreateMessage, Message};
use glint_model::voice::VoiceRegion;
use glint_model::{Error, ErrorKind, Result, Snowflake, User};
use glint_rest::{Endpoint, Multipart, RestClient, RestConfig, Transport};

use crate::config::Config;
use crate::logger;

/// A file to upload alongside a message.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// The main entry point to the library.
pub struct Client {
    config: Config,
    rest: RestClient,
}

impl Client {
    /// Creates a client with the production HTTP transport.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let rest = RestClient::new(rest_config(&config))?;
        Self::assemble(config, rest)
    }

    /// Creates a client over a caller-provided HTTP transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let rest = RestClient::with_transport(rest_config(&config), transport)?;
        Self::assemble(config, rest)
    }

    fn assemble(config: Config, rest: RestClient) -> Result<Self> {
        // best effort; the host may have installed its own logger
        let _ = logger::init(config.log_level, config.log_callback.clone());
        Ok(Self { config, rest })
    }

    /// The underlying REST client, for endpoints without a typed wrapper.
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Fetches the gateway URL and session limits for this bot.
    pub async fn get_gateway_bot(&self) -> Result<GatewayBot> {
        self.rest
            .request(Endpoint::new(Method::GET, "/gateway/bot"))
            .await
    }

    /// Performs the gateway handshake and opens a connected shard. Drive it
    /// by awaiting [`Shard::process`] in a loop.
    pub async fn connect(&self, handler: Box<dyn EventHandler>) -> Result<Shard> {
        let gateway = self.get_gateway_bot().await?;
        debug!(
            "gateway at {} ({} sessions remaining)",
            gateway.url, gateway.session_start_limit.remaining
        );
        let shard_config = ShardConfig {
            token: self.config.token.clone(),
            intents: self.config.intents,
            shard: self.config.shard.map(|(id, count)| [id, count]),
            large_threshold: self.config.large_threshold,
            presence: None,
            gateway_url: gateway.url,
            connect_timeout: self.config.gateway_timeout,
            transport_compression: self.config.enable_compression,
            payload_compression: self.config.enable_payload_compression,
            ..Default::default()
        };
        let mut shard = Shard::new(
            shard_config,
            Box::new(TungsteniteConnector),
            handler,
        )?;
        shard.connect().await?;
        Ok(shard)
    }

    /// Fetches the current user.
    pub async fn get_current_user(&self) -> Result<User> {
        self.rest
            .request(Endpoint::new(Method::GET, "/users/@me"))
            .await
    }

    /// Fetches a user by ID.
    pub async fn get_user(&self, id: Snowflake) -> Result<User> {
        self.rest
            .request(Endpoint::new(Method::GET, format!("/users/{}", id)))
            .await
    }

    /// Fetches a channel by ID.
    pub async fn get_channel(&self, id: Snowflake) -> Result<Channel> {
        self.rest
            .request(Endpoint::new(Method::GET, format!("/channels/{}", id)))
            .await
    }

    /// Opens (or reuses) a DM channel with the given user.
    pub async fn create_dm(&self, recipient: Snowflake) -> Result<Channel> {
        let endpoint = Endpoint::new(Method::POST, "/users/@me/channels")
            .json(&serde_json::json!({ "recipient_id": recipient }))?;
        self.rest.request(endpoint).await
    }

    /// Creates a message, uploading any files as multipart parts.
    ///
    /// With uploads, every attachment descriptor ID must index the file
    /// list; descriptor IDs are existing attachment snowflakes only when no
    /// files are attached. Mixing the two is rejected.
    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        message: CreateMessage,
        files: Vec<FileUpload>,
    ) -> Result<Message> {
        let endpoint = Endpoint::new(
            Method::POST,
            format!("/channels/{}/messages", channel_id),
        );
        if files.is_empty() {
            return self.rest.request(endpoint.json(&message)?).await;
        }

        for descriptor in &message.attachments {
            if descriptor.id.0 >= files.len() as u64 {
                return Err(Error::new(
                    ErrorKind::InvalidParam,
                    "attachment ids must index the uploaded files",
                ));
            }
        }
        let mut form = Multipart::new();
        form.payload_json(&serde_json::to_vec(&message)?);
        for (index, file) in files.iter().enumerate() {
            form.file(index, &file.filename, &file.content_type, &file.data)?;
        }
        self.rest.request(endpoint.multipart(form)).await
    }

    /// Edits a message's content.
    pub async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        message: CreateMessage,
    ) -> Result<Message> {
        let endpoint = Endpoint::new(
            Method::PATCH,
            format!("/channels/{}/messages/{}", channel_id, message_id),
        )
        .json(&message)?;
        self.rest.request(endpoint).await
    }

    /// Deletes a message.
    pub async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<()> {
        self.rest
            .execute(Endpoint::new(
                Method::DELETE,
                format!("/channels/{}/messages/{}", channel_id, message_id),
            ))
            .await
            .map(|_| ())
    }

    /// Shows the typing indicator in a channel.
    pub async fn trigger_typing(&self, channel_id: Snowflake) -> Result<()> {
        self.rest
            .execute(Endpoint::new(
                Method::POST,
                format!("/channels/{}/typing", channel_id),
            ))
            .await
            .map(|_| ())
    }

    /// Fetches a guild by ID.
    pub async fn get_guild(&self, id: Snowflake) -> Result<Guild> {
        self.rest
            .request(Endpoint::new(Method::GET, format!("/guilds/{}", id)))
            .await
    }

    /// Fetches a member of a guild.
    pub async fn get_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> Result<GuildMember> {
        self.rest
            .request(Endpoint::new(
                Method::GET,
                format!("/guilds/{}/members/{}", guild_id, user_id),
            ))
            .await
    }

    /// Searches a guild for members whose name starts with `query`.
    pub async fn search_guild_members(
        &self,
        guild_id: Snowflake,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<GuildMember>> {
        let mut endpoint = Endpoint::new(
            Method::GET,
            format!("/guilds/{}/members/search", guild_id),
        )
        .query("query", query);
        if let Some(limit) = limit {
            endpoint = endpoint.query("limit", limit);
        }
        self.rest.request(endpoint).await
    }

    /// Leaves a guild.
    pub async fn leave_guild(&self, id: Snowflake) -> Result<()> {
        self.rest
            .execute(Endpoint::new(
                Method::DELETE,
                format!("/users/@me/guilds/{}", id),
            ))
            .await
            .map(|_| ())
    }

    /// Obtains the list of Discord voice regions.
    pub async fn get_voice_regions(&self) -> Result<Vec<VoiceRegion>> {
        self.rest
            .request(Endpoint::new(Method::GET, "/voice/regions"))
            .await
    }
}

fn rest_config(config: &Config) -> RestConfig {
    RestConfig {
        token: config.token.clone(),
        auth_type: config.auth_type,
        user_agent: config.resolved_user_agent(),
        timeout: config.http_timeout,
        max_retries: config.max_retries,
        global_rate_limit: config.global_rate_limit_per_sec,
        global_window: config.global_window,
        invalid_request_limit: config.invalid_request_limit,
        invalid_request_window: config.invalid_request_window,
        ..Default::default()
    }
}
