//! Unified error type for the Gamehall server.

use gamehall_protocol::ProtocolError;
use gamehall_room::RoomError;
use gamehall_session::SessionError;
use gamehall_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates `From` impls, so the
/// `?` operator converts sub-crate errors automatically. Errors that reach
/// a client are rendered with `Display` into an `error` frame.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown game type, malformed action).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, conflict, no active session).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The server configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The client sent a room-scoped frame without joining a room.
    #[error("not in a room")]
    NotInRoom,
}
