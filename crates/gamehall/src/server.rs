//! `GameHallServer` builder and server loop.
//!
//! This is the entry point for running a Gamehall server. It ties
//! together all the layers: transport → protocol → router → room →
//! session, plus the two periodic tasks (liveness sweep and room-list
//! broadcast).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gamehall_protocol::{JsonCodec, ServerFrame};
use gamehall_room::{ExpiryPolicy, RoomConfig, RoomRegistry};
use gamehall_session::{Engine, SessionManager};
use gamehall_timer::Ticker;
use gamehall_transport::{
    Connection, PendingConnection, PendingWebSocket, Transport, WebSocketConnection,
    WebSocketTransport,
};
use tokio::time;

use crate::client::ClientSet;
use crate::handler::handle_connection;
use crate::liveness::LivenessSupervisor;
use crate::{ConfigError, ServerConfig, ServerError};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The room
/// registry and client set synchronize internally.
pub(crate) struct ServerState<C: Connection> {
    pub(crate) rooms: RoomRegistry,
    pub(crate) clients: Arc<ClientSet<C>>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a Gamehall server.
///
/// # Example
///
/// ```rust,ignore
/// use gamehall::prelude::*;
///
/// let server = GameHallServer::builder()
///     .bind("0.0.0.0:8080")
///     .rooms(["lobby", "arena"])
///     .engine::<TicTacToe>()
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct GameHallServerBuilder {
    config: ServerConfig,
    sessions: SessionManager,
}

impl GameHallServerBuilder {
    /// Creates a new builder with default settings and no engines.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            sessions: SessionManager::new(),
        }
    }

    /// Replaces the whole configuration, e.g. one loaded with
    /// [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the fixed list of room names.
    pub fn rooms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.rooms = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the liveness sweep interval.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Sets the `roomsList` broadcast interval.
    pub fn room_list_interval(mut self, interval: Duration) -> Self {
        self.config.room_list_interval = interval;
        self
    }

    /// Sets how long a new connection may take to finish the WebSocket
    /// upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets how long an idle session lives.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.config.room.session_ttl = ttl;
        self
    }

    /// Sets which events extend a session's expiry.
    pub fn expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.config.room.expiry_policy = policy;
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Registers game engine `E` under its game type.
    pub fn engine<E: Engine>(mut self) -> Self {
        self.sessions.register::<E>();
        self
    }

    /// Binds the transport and spawns the rooms.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<GameHallServer, ServerError> {
        if self.config.rooms.is_empty() {
            return Err(ConfigError::NoRooms.into());
        }
        if self.config.handshake_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: ServerConfig::HANDSHAKE_SECS,
                value: "0".into(),
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        if self.sessions.game_types().is_empty() {
            tracing::warn!("no game engines registered, game sessions can't be started");
        }

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let rooms = RoomRegistry::new(
            self.config.rooms.iter().cloned(),
            self.config.room.clone(),
            Arc::new(self.sessions),
        );

        let state = Arc::new(ServerState {
            rooms,
            clients: Arc::new(ClientSet::new()),
            codec: JsonCodec,
        });

        Ok(GameHallServer {
            transport,
            state,
            config: self.config,
        })
    }
}

impl Default for GameHallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Gamehall server, bound and ready to accept connections.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting.
pub struct GameHallServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<WebSocketConnection>>,
    config: ServerConfig,
}

impl GameHallServer {
    /// Creates a new builder.
    pub fn builder() -> GameHallServerBuilder {
        GameHallServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The server's rooms.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.state.rooms
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs the server until the process is terminated.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the server until `shutdown` resolves, then stops accepting
    /// connections and stops the periodic tasks.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            addr = %self.config.bind_addr,
            rooms = self.state.rooms.len(),
            heartbeat_secs = self.config.heartbeat_interval.as_secs_f64(),
            "Gamehall server running"
        );

        let supervisor = LivenessSupervisor::new(Arc::clone(&self.state.clients));
        let heartbeat = tokio::spawn(supervisor.run(self.config.heartbeat_interval));
        let room_lists = tokio::spawn(broadcast_room_lists(
            Arc::clone(&self.state),
            self.config.room_list_interval,
        ));

        tokio::select! {
            _ = shutdown => tracing::info!("shutdown requested, no longer accepting"),
            _ = accept_loop(&mut self.transport, &self.state, self.config.handshake_timeout) => {}
        }

        heartbeat.abort();
        room_lists.abort();
        Ok(())
    }
}

/// Accepts connections and spawns a task for each. The WebSocket upgrade
/// runs in that task, so a peer that stalls mid-handshake only holds up
/// itself.
async fn accept_loop(
    transport: &mut WebSocketTransport,
    state: &Arc<ServerState<WebSocketConnection>>,
    handshake_timeout: Duration,
) {
    loop {
        match transport.accept().await {
            Ok(pending) => {
                let state = Arc::clone(state);
                tokio::spawn(async move {
                    let Some(conn) = upgrade(pending, handshake_timeout).await else {
                        return;
                    };
                    if let Err(e) = handle_connection(conn, state).await {
                        tracing::debug!(error = %e, "connection ended with error");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}

/// Completes the handshake within `limit`, dropping the peer otherwise.
async fn upgrade(pending: PendingWebSocket, limit: Duration) -> Option<WebSocketConnection> {
    let addr = pending.peer_addr();
    match time::timeout(limit, pending.handshake()).await {
        Ok(Ok(conn)) => Some(conn),
        Ok(Err(e)) => {
            tracing::debug!(%addr, error = %e, "handshake failed");
            None
        }
        Err(_) => {
            tracing::info!(%addr, timeout_ms = limit.as_millis() as u64, "handshake timed out, dropping peer");
            None
        }
    }
}

/// Sends every connected client the room list on a fixed interval.
async fn broadcast_room_lists<C: Connection>(state: Arc<ServerState<C>>, interval: Duration) {
    let mut ticker = Ticker::every(interval);
    loop {
        ticker.wait_for_tick().await;
        if state.clients.is_empty() {
            continue;
        }
        let rooms = state.rooms.list_all().await;
        state.clients.broadcast(&ServerFrame::RoomsList { rooms });
    }
}
