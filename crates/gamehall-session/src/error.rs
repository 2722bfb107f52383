//! Error types for the session layer.

/// Errors that can occur while starting or driving a game session.
///
/// Rule violations are not errors here: an action that fails an engine's
/// legality check is an [`ActionOutcome::Rejected`](crate::ActionOutcome),
/// because every room member gets to see it.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No engine is registered under this game type.
    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    /// The engine requires a different number of players.
    #[error("{game_type} needs {expected} players, room has {actual}")]
    InvalidPlayerCount {
        game_type: String,
        expected: usize,
        actual: usize,
    },

    /// The action doesn't have the shape this engine understands.
    #[error("malformed action: {0}")]
    MalformedAction(String),

    /// The engine state could not be turned into JSON.
    #[error("failed to encode game state: {0}")]
    StateEncoding(#[from] serde_json::Error),
}
