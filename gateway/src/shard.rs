//! The gateway session state machine: identify, heartbeat, resume, dispatch.
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use flate2::{Compress, Compression, FlushCompress};
use log::{debug, error, info, trace, warn};
use rand::Rng;
use serde::Deserialize;
use serde_json::value::RawValue;

use glint_model::gateway::{
    close_code_can_reconnect, close_code_requires_new_session, HeartbeatPacket, HelloPacket,
    IdentifyPacket, IdentifyProperties, Opcode, ReadyPacket, ReceivePacket, RequestGuildMembers,
    RequestSoundboardSounds, ResumePacket, SendablePacket, StatusUpdate, UpdateVoiceState,
};
use glint_model::{Error, ErrorKind, Result, Snowflake};

use crate::connection::{Connection, Connector, WsMessage};
use crate::constants::GATEWAY_VERSION;
use crate::inflater::Inflater;
use crate::EventHandler;

/// The connection phase of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardState {
    Disconnected,
    Connecting,
    Connected,
    Identifying,
    Ready,
    Resuming,
    Reconnecting,
}

/// Configuration for a single shard.
#[derive(Debug, Clone)]
pub struct ShardConfig {
    /// The bot token this shard identifies with.
    pub token: String,
    /// The gateway intents to subscribe to.
    pub intents: u32,
    /// This shard's `[id, count]` tuple, when sharding.
    pub shard: Option<[u64; 2]>,
    /// The member count at which guilds stop sending offline members;
    /// must lie in `[50, 250]` when set.
    pub large_threshold: Option<u8>,
    /// The presence to identify with.
    pub presence: Option<StatusUpdate>,
    /// The gateway URL, usually obtained from `GET /gateway/bot`.
    pub gateway_url: String,
    /// Deadline for opening the websocket.
    pub connect_timeout: Duration,
    /// Whether to request `zlib-stream` transport compression.
    pub transport_compression: bool,
    /// Whether to zlib-compress the identify payload. Mutually exclusive
    /// with transport compression.
    pub payload_compression: bool,
    /// Base delay of the reconnect backoff.
    pub backoff_base: Duration,
    /// Upper bound of the reconnect backoff.
    pub backoff_cap: Duration,
    /// The `properties` object sent on identify.
    pub properties: IdentifyProperties,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            intents: 0,
            shard: None,
            large_threshold: None,
            presence: None,
            gateway_url: crate::constants::GATEWAY_URL.to_owned(),
            connect_timeout: Duration::from_secs(30),
            transport_compression: false,
            payload_compression: false,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(60),
            properties: IdentifyProperties {
                os: std::env::consts::OS.to_owned(),
                browser: "glint".to_owned(),
                device: "glint".to_owned(),
            },
        }
    }
}

impl ShardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(Error::new(ErrorKind::InvalidParam, "token must not be empty"));
        }
        if self.transport_compression && self.payload_compression {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                "transport and payload compression are mutually exclusive",
            ));
        }
        if let Some(threshold) = self.large_threshold {
            if !(50..=250).contains(&threshold) {
                return Err(Error::new(
                    ErrorKind::InvalidParam,
                    "large_threshold must lie in [50, 250]",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct PartialApplication {
    id: Snowflake,
}

/// A single gateway connection with its resumable session state.
///
/// The shard is driven by awaiting [`process`] in a loop; all websocket I/O,
/// timers and handler callbacks run inside it, on one logical executor.
///
/// [`process`]: Shard::process
pub struct Shard {
    config: ShardConfig,
    connector: Box<dyn Connector>,
    handler: Box<dyn EventHandler>,
    state: ShardState,
    connection: Option<Box<dyn Connection>>,
    inflater: Option<Inflater>,

    session_id: Option<String>,
    resume_url: Option<String>,
    application_id: Option<Snowflake>,
    last_seq: Option<u64>,

    heartbeat_interval: Option<Duration>,
    next_heartbeat: Option<Instant>,
    last_heartbeat_sent: Option<Instant>,
    last_heartbeat_ack: Option<Instant>,
    unacked_heartbeats: u32,

    reconnect_attempts: u32,
    backoff_until: Option<Instant>,
    /// Deadline for a jitter-delayed identify/resume after INVALID_SESSION.
    pending_handshake_at: Option<Instant>,

    send_queue: VecDeque<String>,
    halt: bool,
}

impl Shard {
    pub fn new(
        config: ShardConfig,
        connector: Box<dyn Connector>,
        handler: Box<dyn EventHandler>,
    ) -> Result<Shard> {
        config.validate()?;
        Ok(Shard {
            config,
            connector,
            handler,
            state: ShardState::Disconnected,
            connection: None,
            inflater: None,
            session_id: None,
            resume_url: None,
            application_id: None,
            last_seq: None,
            heartbeat_interval: None,
            next_heartbeat: None,
            last_heartbeat_sent: None,
            last_heartbeat_ack: None,
            unacked_heartbeats: 0,
            reconnect_attempts: 0,
            backoff_until: None,
            pending_handshake_at: None,
            send_queue: VecDeque::new(),
            halt: false,
        })
    }

    pub fn state(&self) -> ShardState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    pub fn application_id(&self) -> Option<Snowflake> {
        self.application_id
    }

    /// The most recent heartbeat round trip, when one completed.
    pub fn latency(&self) -> Option<Duration> {
        match (self.last_heartbeat_sent, self.last_heartbeat_ack) {
            (Some(sent), Some(ack)) if ack >= sent => Some(ack - sent),
            _ => None,
        }
    }

    /// Opens the websocket and begins the session handshake.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state != ShardState::Disconnected {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "shard is already connected",
            ));
        }
        self.halt = false;
        self.reconnect_attempts = 0;
        self.dial().await
    }

    /// Halts auto-reconnect and closes the connection. Keep calling
    /// [`process`](Shard::process) until `Disconnected` is observed.
    pub async fn disconnect(&mut self) {
        self.halt = true;
        if let Some(conn) = self.connection.as_mut() {
            let _ = conn.close(1000).await;
        }
        self.drop_connection();
        self.set_state(ShardState::Disconnected);
    }

    /// Queues a presence update; flushed FIFO on the next tick.
    pub fn update_presence(&mut self, update: StatusUpdate) -> Result<()> {
        update.validate()?;
        self.enqueue(update.to_json()?)
    }

    /// Queues a voice state update. A zero `channel_id` disconnects.
    pub fn update_voice_state(&mut self, mut update: UpdateVoiceState) -> Result<()> {
        if update.channel_id.is_some_and(Snowflake::is_null) {
            update.channel_id = None;
        }
        self.enqueue(update.to_json()?)
    }

    /// Queues a guild members request.
    pub fn request_guild_members(&mut self, request: RequestGuildMembers) -> Result<()> {
        request.validate()?;
        self.enqueue(request.to_json()?)
    }

    /// Queues a soundboard sounds request.
    pub fn request_soundboard_sounds(&mut self, request: RequestSoundboardSounds) -> Result<()> {
        self.enqueue(request.to_json()?)
    }

    fn enqueue(&mut self, payload: String) -> Result<()> {
        if self.state == ShardState::Disconnected {
            return Err(Error::new(ErrorKind::InvalidState, "shard is disconnected"));
        }
        self.send_queue.push_back(payload);
        Ok(())
    }

    /// Drives the shard for up to `timeout`: polls the socket, runs timers
    /// and delivers dispatches to the handler.
    pub async fn process(&mut self, timeout: Duration) -> Result<()> {
        let tick_deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= tick_deadline {
                return Ok(());
            }

            match self.state {
                ShardState::Disconnected => {
                    tokio::time::sleep_until(tick_deadline.into()).await;
                    return Ok(());
                }
                ShardState::Reconnecting => {
                    let resume_at = self.backoff_until.unwrap_or(now);
                    if resume_at >= tick_deadline {
                        tokio::time::sleep_until(tick_deadline.into()).await;
                        return Ok(());
                    }
                    tokio::time::sleep_until(resume_at.into()).await;
                    self.backoff_until = None;
                    if let Err(err) = self.dial().await {
                        debug!("reconnect attempt failed: {}", err);
                    }
                    continue;
                }
                _ => {}
            }

            if self.connection.is_none() {
                self.begin_reconnect();
                continue;
            }

            if let Some(at) = self.pending_handshake_at {
                if now >= at {
                    self.pending_handshake_at = None;
                    self.send_handshake().await?;
                    continue;
                }
            }
            if let Some(at) = self.next_heartbeat {
                if now >= at {
                    self.scheduled_beat().await?;
                    continue;
                }
            }
            if self.state == ShardState::Ready && !self.send_queue.is_empty() {
                self.flush_send_queue().await;
                continue;
            }

            let mut wake = tick_deadline;
            if let Some(at) = self.next_heartbeat {
                wake = wake.min(at);
            }
            if let Some(at) = self.pending_handshake_at {
                wake = wake.min(at);
            }

            let received = {
                let conn = self.connection.as_mut().expect("connection present");
                tokio::time::timeout_at(wake.into(), conn.next()).await
            };
            match received {
                Err(_) => continue,
                Ok(None) => {
                    debug!("gateway stream ended");
                    self.connection_lost(None);
                }
                Ok(Some(Err(err))) => {
                    warn!("websocket receive failed: {}", err);
                    self.connection_lost(None);
                }
                Ok(Some(Ok(message))) => self.handle_message(message).await?,
            }
        }
    }

    async fn dial(&mut self) -> Result<()> {
        self.set_state(ShardState::Connecting);
        let url = self.connect_url();
        debug!("connecting to {}", url);
        let connecting = self.connector.connect(url);
        let connected = tokio::time::timeout(self.config.connect_timeout, connecting).await;
        match connected {
            Ok(Ok(connection)) => {
                self.connection = Some(connection);
                // the inflate context is scoped to one TCP connection; any
                // state from the previous one must not leak into this stream
                if self.config.transport_compression {
                    match self.inflater.as_mut() {
                        Some(inflater) => inflater.reset(),
                        None => self.inflater = Some(Inflater::new()),
                    }
                } else {
                    self.inflater = None;
                }
                self.heartbeat_interval = None;
                self.next_heartbeat = None;
                self.last_heartbeat_sent = None;
                self.last_heartbeat_ack = None;
                self.unacked_heartbeats = 0;
                self.set_state(ShardState::Connected);
                Ok(())
            }
            Ok(Err(err)) => {
                warn!("failed to open gateway connection: {}", err);
                self.begin_reconnect();
                Err(err)
            }
            Err(_) => {
                warn!("gateway connect timed out");
                self.begin_reconnect();
                Err(Error::new(ErrorKind::Timeout, "gateway connect timed out"))
            }
        }
    }

    fn connect_url(&self) -> String {
        let base = self
            .resume_url
            .as_deref()
            .unwrap_or(&self.config.gateway_url);
        let mut url = format!(
            "{}/?v={}&encoding=json",
            base.trim_end_matches('/'),
            GATEWAY_VERSION
        );
        if self.config.transport_compression {
            url.push_str("&compress=zlib-stream");
        }
        url
    }

    async fn handle_message(&mut self, message: WsMessage) -> Result<()> {
        match message {
            WsMessage::Text(text) => self.handle_payload(&text).await,
            WsMessage::Binary(data) => {
                let inflated = match self.inflater.as_mut() {
                    Some(inflater) => match inflater.push(&data) {
                        Ok(inflated) => inflated,
                        Err(err) => {
                            warn!("{}", err);
                            self.connection_lost(None);
                            return Ok(());
                        }
                    },
                    // uncompressed binary frames carry plain JSON
                    None => String::from_utf8(data).ok(),
                };
                match inflated {
                    Some(text) => self.handle_payload(&text).await,
                    None => Ok(()),
                }
            }
            WsMessage::Close(code) => {
                debug!("gateway sent close frame {:?}", code);
                self.connection_lost(code);
                Ok(())
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(()),
        }
    }

    async fn handle_payload(&mut self, text: &str) -> Result<()> {
        let packet: ReceivePacket = match serde_json::from_str(text) {
            Ok(packet) => packet,
            Err(err) => {
                warn!("dropping unparseable gateway frame: {}", err);
                return Ok(());
            }
        };

        match packet.op {
            Opcode::Dispatch => self.handle_dispatch(packet).await,
            Opcode::Hello => {
                let hello: HelloPacket = parse_data(packet.d.as_deref())?;
                let interval = Duration::from_millis(hello.heartbeat_interval);
                self.heartbeat_interval = Some(interval);
                // first heartbeat lands at a uniform offset inside the interval
                let offset = interval.mul_f64(rand::thread_rng().gen::<f64>());
                self.next_heartbeat = Some(Instant::now() + offset);
                self.unacked_heartbeats = 0;
                self.send_handshake().await
            }
            Opcode::Heartbeat => {
                // the remote may request one beat out of cycle
                self.send_heartbeat().await;
                Ok(())
            }
            Opcode::HeartbeatAck => {
                self.last_heartbeat_ack = Some(Instant::now());
                self.unacked_heartbeats = 0;
                Ok(())
            }
            Opcode::Reconnect => {
                info!("gateway requested a reconnect");
                self.close_current(4000).await;
                self.connection_lost(None);
                Ok(())
            }
            Opcode::InvalidSession => {
                let resumable: bool = packet
                    .d
                    .as_deref()
                    .and_then(|d| serde_json::from_str(d.get()).ok())
                    .unwrap_or(false);
                info!("session invalidated (resumable: {})", resumable);
                if !resumable {
                    self.clear_session();
                    self.set_state(ShardState::Identifying);
                } else {
                    self.set_state(ShardState::Resuming);
                }
                self.pending_handshake_at = Some(Instant::now() + self.handshake_jitter());
                Ok(())
            }
            other => {
                trace!("ignoring client-bound opcode {:?}", other);
                Ok(())
            }
        }
    }

    async fn handle_dispatch(&mut self, packet: ReceivePacket) -> Result<()> {
        if let Some(seq) = packet.s {
            if self.last_seq.is_some_and(|prev| seq <= prev) {
                debug!(
                    "dropping out-of-order dispatch {} (last seen {})",
                    seq,
                    self.last_seq.unwrap_or_default()
                );
                return Ok(());
            }
            self.last_seq = Some(seq);
        }

        let Some(name) = packet.t else {
            return Ok(());
        };

        match name.as_str() {
            "READY" => {
                let ready: ReadyPacket = parse_data(packet.d.as_deref())?;
                trace!("session {} ready", ready.session_id);
                self.session_id = Some(ready.session_id);
                self.resume_url = Some(ready.resume_gateway_url);
                self.application_id = ready
                    .application
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<PartialApplication>(raw.get()).ok())
                    .map(|app| app.id);
                self.reconnect_attempts = 0;
                self.set_state(ShardState::Ready);
            }
            "RESUMED" => {
                self.reconnect_attempts = 0;
                self.set_state(ShardState::Ready);
            }
            _ => {}
        }

        let data = packet.d;
        let event_data = match data.as_deref() {
            Some(d) => d,
            None => null_raw(),
        };
        self.handler.on_event(&name, event_data);
        Ok(())
    }

    /// Sends RESUME when a session is held, IDENTIFY otherwise.
    async fn send_handshake(&mut self) -> Result<()> {
        if let (Some(session_id), Some(seq)) = (self.session_id.clone(), self.last_seq) {
            self.set_state(ShardState::Resuming);
            let resume = ResumePacket {
                token: self.config.token.clone(),
                session_id,
                seq,
            };
            debug!("resuming session at sequence {}", seq);
            self.send_text(resume.to_json()?).await;
            return Ok(());
        }

        self.set_state(ShardState::Identifying);
        let identify = IdentifyPacket {
            token: self.config.token.clone(),
            properties: self.config.properties.clone(),
            compress: self.config.payload_compression.then_some(true),
            large_threshold: self.config.large_threshold,
            shard: self.config.shard,
            presence: self.config.presence.clone(),
            intents: self.config.intents,
        };
        debug!("identifying with the gateway");
        let json = identify.to_json()?;
        if self.config.payload_compression {
            let deflated = deflate(json.as_bytes())?;
            self.send_frame(WsMessage::Binary(deflated)).await;
        } else {
            self.send_text(json).await;
        }
        Ok(())
    }

    async fn scheduled_beat(&mut self) -> Result<()> {
        if self.unacked_heartbeats >= 2 {
            // two beats without an ack: the connection is zombied
            warn!("no heartbeat ack for two intervals, reconnecting");
            self.close_current(4000).await;
            self.connection_lost(None);
            return Ok(());
        }
        self.send_heartbeat().await;
        if let Some(interval) = self.heartbeat_interval {
            self.next_heartbeat = Some(Instant::now() + interval);
        }
        Ok(())
    }

    async fn send_heartbeat(&mut self) {
        let packet = HeartbeatPacket {
            seq: self.last_seq,
        };
        match packet.to_json() {
            Ok(json) => {
                if self.send_text(json).await {
                    self.last_heartbeat_sent = Some(Instant::now());
                    self.unacked_heartbeats += 1;
                }
            }
            Err(err) => error!("failed to serialize heartbeat: {}", err),
        }
    }

    async fn flush_send_queue(&mut self) {
        while self.state == ShardState::Ready {
            let Some(payload) = self.send_queue.pop_front() else {
                break;
            };
            if !self.send_text(payload).await {
                break;
            }
        }
    }

    async fn send_text(&mut self, text: String) -> bool {
        self.send_frame(WsMessage::Text(text)).await
    }

    async fn send_frame(&mut self, frame: WsMessage) -> bool {
        let Some(conn) = self.connection.as_mut() else {
            return false;
        };
        let sent = conn.send(frame).await;
        match sent {
            Ok(()) => true,
            Err(err) => {
                warn!("websocket send failed: {}", err);
                self.connection_lost(None);
                false
            }
        }
    }

    async fn close_current(&mut self, code: u16) {
        if let Some(conn) = self.connection.as_mut() {
            let _ = conn.close(code).await;
        }
    }

    /// Tears down the connection and decides between reconnecting and going
    /// dormant, from the close code when one was received.
    fn connection_lost(&mut self, close_code: Option<u16>) {
        self.drop_connection();
        if self.halt {
            self.set_state(ShardState::Disconnected);
            return;
        }
        if let Some(code) = close_code {
            if !close_code_can_reconnect(code) {
                error!("gateway closed with non-recoverable code {}", code);
                self.set_state(ShardState::Disconnected);
                return;
            }
            if close_code_requires_new_session(code) {
                self.clear_session();
            }
        }
        self.begin_reconnect();
    }

    fn drop_connection(&mut self) {
        self.connection = None;
        self.heartbeat_interval = None;
        self.next_heartbeat = None;
        self.pending_handshake_at = None;
        self.unacked_heartbeats = 0;
    }

    fn clear_session(&mut self) {
        self.session_id = None;
        self.resume_url = None;
        self.last_seq = None;
    }

    fn begin_reconnect(&mut self) {
        let exponent = self.reconnect_attempts.min(10);
        let backoff = self
            .config
            .backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.config.backoff_cap);
        let jitter = Duration::from_millis(
            rand::thread_rng().gen_range(0..=self.config.backoff_base.as_millis().max(1) as u64),
        );
        self.reconnect_attempts += 1;
        self.backoff_until = Some(Instant::now() + backoff + jitter);
        self.set_state(ShardState::Reconnecting);
    }

    fn handshake_jitter(&self) -> Duration {
        let base = self.config.backoff_base;
        base + base.mul_f64(rand::thread_rng().gen::<f64>() * 4.0)
    }

    fn set_state(&mut self, state: ShardState) {
        if self.state != state {
            trace!("shard state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.handler.on_state_change(state);
        }
    }
}

fn parse_data<'a, T: Deserialize<'a>>(data: Option<&'a RawValue>) -> Result<T> {
    let raw = data.ok_or_else(|| {
        Error::new(ErrorKind::ParseError, "gateway frame is missing its payload")
    })?;
    serde_json::from_str(raw.get()).map_err(Error::from)
}

fn null_raw() -> &'static RawValue {
    use std::sync::OnceLock;
    static NULL: OnceLock<Box<RawValue>> = OnceLock::new();
    NULL.get_or_init(|| RawValue::from_string("null".to_owned()).expect("null is valid JSON"))
}

/// One-shot zlib compression of an identify payload.
fn deflate(payload: &[u8]) -> Result<Vec<u8>> {
    let mut compress = Compress::new(Compression::default(), true);
    let mut output = Vec::with_capacity(payload.len() / 2 + 64);
    loop {
        let status = compress
            .compress_vec(&payload[compress.total_in() as usize..], &mut output, FlushCompress::Finish)
            .map_err(|e| Error::with_source(ErrorKind::InvalidFormat, "zlib compression failed", e))?;
        if status == flate2::Status::StreamEnd {
            return Ok(output);
        }
        output.reserve(1024);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_double_compression() {
        let config = ShardConfig {
            token: "t".into(),
            transport_compression: true,
            payload_compression: true,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidParam);
    }

    #[test]
    fn config_bounds_large_threshold() {
        for (value, ok) in [(49, false), (50, true), (250, true), (251, false)] {
            let config = ShardConfig {
                token: "t".into(),
                large_threshold: Some(value),
                ..Default::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "threshold {value}");
        }
    }

    #[test]
    fn deflated_identify_inflates_back() {
        let payload = br#"{"op":2,"d":{"token":"t"}}"#;
        let compressed = deflate(payload).unwrap();
        let mut decompress = flate2::Decompress::new(true);
        let mut out = Vec::with_capacity(256);
        decompress
            .decompress_vec(&compressed, &mut out, flate2::FlushDecompress::Finish)
            .unwrap();
        assert_eq!(out, payload);
    }
}
