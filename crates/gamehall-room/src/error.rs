//! Error types for the room layer.

use gamehall_protocol::ClientId;
use gamehall_session::SessionError;

/// Errors that can occur during room operations.
///
/// None of these change room state; the caller reports them to the
/// client that made the request.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room has this name.
    #[error("room {0} not found")]
    NotFound(String),

    /// A session is already running in the room.
    #[error("a {0} session is already active in this room")]
    SessionConflict(String),

    /// The room has no running session to act on.
    #[error("no active game session in this room")]
    NoActiveSession,

    /// The request names a different game than the one running.
    #[error("room is playing {active}, not {requested}")]
    GameTypeMismatch { active: String, requested: String },

    /// The client is not a member of this room.
    #[error("client {0} is not in this room")]
    NotMember(ClientId),

    /// Starting or driving the session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(String),
}
