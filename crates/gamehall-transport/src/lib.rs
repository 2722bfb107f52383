//! Transport abstraction layer for Gamehall.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! a persistent duplex connection. Besides data frames, a connection
//! carries transport-level liveness probes ([`Connection::ping`]) whose
//! acknowledgements surface as [`Incoming::Pong`]; they never reach the
//! application protocol.
//!
//! Accepting is split in two steps. [`Transport::accept`] only takes the
//! raw connection off the listener and returns a [`PendingConnection`];
//! the protocol upgrade runs in [`PendingConnection::handshake`], which
//! the caller drives on its own task (and under its own deadline) so a
//! peer that never finishes the upgrade can't hold up the listener.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Transport-local identifier for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Something that arrived on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// An application data frame.
    Data(Vec<u8>),
    /// The peer acknowledged a liveness probe.
    Pong,
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted connection that hasn't completed its handshake.
    type Pending: PendingConnection<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming connection. Doesn't read from it.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Pending, Self::Error>> + Send;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// An accepted connection whose protocol handshake hasn't run yet.
pub trait PendingConnection: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// The remote peer's address.
    fn peer_addr(&self) -> SocketAddr;

    /// Runs the protocol handshake. Can wait on the peer indefinitely;
    /// callers bound it with a timeout.
    fn handshake(self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single connection that can send and receive frames.
///
/// All futures are `Send` so connection work can be spawned onto the
/// multi-threaded runtime from generic code.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next frame or probe acknowledgement.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Incoming>, Self::Error>> + Send;

    /// Sends a liveness probe. The reply arrives through [`recv`](Self::recv)
    /// as [`Incoming::Pong`].
    fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the transport-local identifier for this connection.
    fn id(&self) -> ConnectionId;
}
