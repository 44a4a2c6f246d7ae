//! One gateway session
//!
//! A shard owns its socket and runs the identify/resume and heartbeat state
//! machine. Transient failures reconnect forever; close codes that signal bad
//! credentials or shard setup end [`Shard::start`] with an error.

use itx_core::Intents;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, SocketError};
use crate::protocol::{
    connection_url, EventPacket, HelloPayload, IdentifyPayload, IdentifyProperties, OpCode,
    ReadyPayload, ResumePayload, READY_EVENT, RESUMED_EVENT,
};
use crate::socket::{Connector, Socket};

/// Wait after a failed connection attempt
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
/// Wait before closing on a Reconnect or InvalidSession op code
pub const RECONNECT_THROTTLE: Duration = Duration::from_secs(1);

/// Receives every dispatch packet, in order, with the id of the shard it came from
pub type EventHandler = Arc<dyn Fn(u16, EventPacket) + Send + Sync>;

/// Lifecycle state of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShardStatus {
    #[default]
    Offline,
    Connecting,
    /// Socket connected, identify or resume in flight
    Authenticating,
    Online,
}

impl ShardStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE",
            Self::Connecting => "CONNECTING",
            Self::Authenticating => "AUTHENTICATING",
            Self::Online => "ONLINE",
        }
    }
}

impl std::fmt::Display for ShardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a shard within its fleet
#[derive(Clone)]
pub struct ShardConfig {
    pub id: u16,
    pub total: u16,
    pub token: String,
    pub intents: Intents,
}

impl std::fmt::Debug for ShardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardConfig")
            .field("id", &self.id)
            .field("total", &self.total)
            .field("intents", &self.intents)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct ShardSession {
    session_id: Option<String>,
    resume_url: Option<String>,
    last_sequence: u64,
    heartbeat_interval: Duration,
    ack_missing: bool,
    status: ShardStatus,
}

impl ShardSession {
    fn reset(&mut self) {
        self.session_id = None;
        self.resume_url = None;
        self.last_sequence = 0;
    }
}

pub struct Shard {
    config: ShardConfig,
    socket: Socket,
    session: RwLock<ShardSession>,
    heartbeat: Mutex<Option<CancellationToken>>,
    on_event: EventHandler,
}

impl Shard {
    pub fn new(config: ShardConfig, connector: Arc<dyn Connector>, on_event: EventHandler) -> Self {
        Self {
            config,
            socket: Socket::new(connector),
            session: RwLock::new(ShardSession::default()),
            heartbeat: Mutex::new(None),
            on_event,
        }
    }

    pub fn id(&self) -> u16 {
        self.config.id
    }

    pub fn status(&self) -> ShardStatus {
        self.session.read().status
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.read().session_id.clone()
    }

    pub fn last_sequence(&self) -> u64 {
        self.session.read().last_sequence
    }

    fn set_status(&self, status: ShardStatus) {
        self.session.write().status = status;
        tracing::debug!(shard_id = self.config.id, %status, "Shard status changed");
    }

    /// Run the session until `cancel` fires or the gateway closes with a terminal code
    pub async fn start(
        self: Arc<Self>,
        cancel: CancellationToken,
        gateway_url: String,
    ) -> Result<(), GatewayError> {
        tracing::debug!(shard_id = self.config.id, "Starting connection loop");

        let outcome = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }

            self.socket.close().await;
            self.set_status(ShardStatus::Connecting);

            let target = self
                .session
                .read()
                .resume_url
                .as_deref()
                .map_or_else(|| gateway_url.clone(), connection_url);

            tracing::debug!(shard_id = self.config.id, url = %target, "Connecting");
            let connected = tokio::select! {
                () = cancel.cancelled() => break Ok(()),
                result = self.socket.connect(&target) => result,
            };

            if let Err(err) = connected {
                self.set_status(ShardStatus::Offline);
                tracing::warn!(
                    shard_id = self.config.id,
                    error = %err,
                    "Connection failed, retrying in {}s",
                    RECONNECT_BACKOFF.as_secs()
                );
                tokio::select! {
                    () = cancel.cancelled() => break Ok(()),
                    () = tokio::time::sleep(RECONNECT_BACKOFF) => continue,
                }
            }

            self.set_status(ShardStatus::Authenticating);

            let connection = cancel.child_token();
            let result = tokio::select! {
                () = cancel.cancelled() => Ok(()),
                result = self.read_loop(&connection) => result,
            };
            connection.cancel();

            self.socket.close().await;
            self.set_status(ShardStatus::Offline);

            if let Err(err) = result {
                if let Some(code) = err.terminal_close_code() {
                    tracing::error!(shard_id = self.config.id, %code, "Gateway closed the session for good");
                    break Err(GatewayError::TerminalClose {
                        shard_id: self.config.id,
                        code,
                    });
                }
                tracing::debug!(shard_id = self.config.id, error = %err, "Disconnected from gateway");
            }

            if cancel.is_cancelled() {
                break Ok(());
            }
            tracing::debug!(shard_id = self.config.id, "Reconnecting");
        };

        self.socket.close().await;
        self.set_status(ShardStatus::Offline);
        tracing::debug!(shard_id = self.config.id, "Connection loop exited");
        outcome
    }

    /// Close the current connection; the start loop, if running, reconnects
    pub async fn close(&self) {
        tracing::debug!(shard_id = self.config.id, "Closing shard connection");
        self.socket.close().await;
        self.set_status(ShardStatus::Offline);
    }

    pub async fn send(&self, payload: &serde_json::Value) -> Result<(), SocketError> {
        self.socket.write_json(payload).await
    }

    async fn read_loop(self: &Arc<Self>, connection: &CancellationToken) -> Result<(), SocketError> {
        loop {
            let packet: EventPacket = match self.socket.read_json().await {
                Ok(packet) => packet,
                Err(SocketError::Decode(err)) => {
                    tracing::warn!(shard_id = self.config.id, error = %err, "Skipping undecodable packet");
                    continue;
                }
                Err(err) => return Err(err),
            };

            tracing::trace!(shard_id = self.config.id, %packet, "RECV");

            if let Some(sequence) = packet.s.filter(|s| *s > 0) {
                let mut session = self.session.write();
                session.last_sequence = session.last_sequence.max(sequence);
            }

            self.handle_packet(packet, connection).await?;
        }
    }

    async fn handle_packet(
        self: &Arc<Self>,
        packet: EventPacket,
        connection: &CancellationToken,
    ) -> Result<(), SocketError> {
        match packet.opcode() {
            Some(OpCode::Dispatch) => self.handle_dispatch(packet)?,
            Some(OpCode::Hello) => {
                let hello: HelloPayload = serde_json::from_value(packet.d)?;
                {
                    let mut session = self.session.write();
                    session.heartbeat_interval = Duration::from_millis(hello.heartbeat_interval);
                    session.ack_missing = false;
                }
                tracing::debug!(
                    shard_id = self.config.id,
                    interval_ms = hello.heartbeat_interval,
                    "HELLO received"
                );

                self.spawn_heartbeat(connection);
                self.identify_or_resume().await?;
            }
            Some(OpCode::HeartbeatAck) => {
                self.session.write().ack_missing = false;
                tracing::trace!(shard_id = self.config.id, "HEARTBEAT ACK received");
            }
            Some(OpCode::Heartbeat) => {
                tracing::trace!(shard_id = self.config.id, "Server requested heartbeat");
                self.send_heartbeat().await?;
            }
            Some(OpCode::Reconnect) => {
                tracing::debug!(shard_id = self.config.id, "Server requested reconnect");
                tokio::time::sleep(RECONNECT_THROTTLE).await;
                self.socket.close().await;
            }
            Some(OpCode::InvalidSession) => {
                let resumable = packet.d.as_bool().unwrap_or(false);
                if !resumable {
                    self.session.write().reset();
                }
                tracing::debug!(shard_id = self.config.id, resumable, "Session invalidated");
                tokio::time::sleep(RECONNECT_THROTTLE).await;
                self.socket.close().await;
            }
            _ => {
                tracing::debug!(shard_id = self.config.id, op = packet.op, "Ignoring unexpected op code");
            }
        }

        Ok(())
    }

    fn handle_dispatch(&self, packet: EventPacket) -> Result<(), SocketError> {
        match packet.t.as_deref() {
            Some(READY_EVENT) => {
                let ready: ReadyPayload = serde_json::from_value(packet.d.clone())?;
                let mut session = self.session.write();
                session.session_id = Some(ready.session_id);
                session.resume_url = ready.resume_gateway_url;
                session.status = ShardStatus::Online;
                drop(session);
                tracing::info!(shard_id = self.config.id, "Started new session");
            }
            Some(RESUMED_EVENT) => {
                self.session.write().status = ShardStatus::Online;
                tracing::info!(shard_id = self.config.id, "Resumed session");
            }
            _ => {}
        }

        (self.on_event)(self.config.id, packet);
        Ok(())
    }

    async fn identify_or_resume(&self) -> Result<(), SocketError> {
        let (session_id, seq) = {
            let session = self.session.read();
            (session.session_id.clone(), session.last_sequence)
        };

        let packet = match session_id {
            None => {
                tracing::debug!(shard_id = self.config.id, "IDENTIFY as a new session");
                EventPacket::identify(&IdentifyPayload {
                    token: self.config.token.clone(),
                    intents: self.config.intents,
                    shard: [self.config.id, self.config.total],
                    properties: IdentifyProperties::default(),
                })?
            }
            Some(session_id) => {
                tracing::debug!(shard_id = self.config.id, %session_id, seq, "RESUME session");
                EventPacket::resume(&ResumePayload {
                    token: self.config.token.clone(),
                    session_id,
                    seq,
                })?
            }
        };

        self.socket.write_json(&packet).await
    }

    async fn send_heartbeat(&self) -> Result<(), SocketError> {
        let seq = self.session.read().last_sequence;
        tracing::trace!(shard_id = self.config.id, seq, "Sending heartbeat");
        self.socket.write_json(&EventPacket::heartbeat(seq)).await
    }

    fn spawn_heartbeat(self: &Arc<Self>, connection: &CancellationToken) {
        let token = connection.child_token();
        if let Some(previous) = self.heartbeat.lock().replace(token.clone()) {
            previous.cancel();
        }

        let shard = Arc::clone(self);
        tokio::spawn(async move { shard.heartbeat_loop(token).await });
    }

    async fn heartbeat_loop(&self, token: CancellationToken) {
        let interval = self.session.read().heartbeat_interval;
        if interval.is_zero() {
            tracing::warn!(shard_id = self.config.id, "Heartbeat interval is zero, not heartbeating");
            return;
        }

        // The first tick completes immediately
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = token.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let zombied = {
                let mut session = self.session.write();
                if session.ack_missing {
                    true
                } else {
                    session.ack_missing = true;
                    false
                }
            };

            if zombied {
                tracing::warn!(shard_id = self.config.id, "Zombied connection detected, reconnecting");
                self.socket.close().await;
                return;
            }

            if let Err(err) = self.send_heartbeat().await {
                tracing::debug!(shard_id = self.config.id, error = %err, "Failed to send heartbeat");
            }
        }
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
