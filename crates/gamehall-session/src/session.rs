//! Live game sessions and the type-erased interface rooms see them through.
//!
//! An [`Engine`] is generic over its own `State` and `Action` types, but a
//! room must be able to hold *any* game. The bridge is [`GameSession`]: an
//! object-safe trait whose methods speak `serde_json::Value` at the edges.
//! [`TypedSession<E>`] implements it by parsing the action into
//! `E::Action`, so inside the session everything stays strongly typed.

use std::marker::PhantomData;

use gamehall_protocol::ClientId;
use serde_json::Value;

use crate::{Engine, SessionError};

/// What happened to an action that parsed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The engine accepted the action and the state advanced.
    Applied,
    /// The engine rejected the action. The state is unchanged.
    Rejected(String),
}

impl ActionOutcome {
    /// The rejection reason, if any.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            Self::Applied => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

/// A running game with its concrete types erased.
pub trait GameSession: Send + Sync {
    /// Parses, validates, and applies one action.
    ///
    /// # Errors
    /// [`SessionError::MalformedAction`] if `action` isn't a valid action
    /// for this engine. Rule violations are an `Ok(Rejected)`.
    fn act(&mut self, actor: &ClientId, action: Value) -> Result<ActionOutcome, SessionError>;

    /// The current state as JSON.
    fn state_json(&self) -> Result<Value, SessionError>;

    /// Whether the game is over.
    fn is_terminal(&self) -> bool;

    /// The winner, if the game ended with one.
    fn winner(&self) -> Option<ClientId>;
}

/// A [`GameSession`] backed by engine `E`.
pub struct TypedSession<E: Engine> {
    state: E::State,
    _engine: PhantomData<fn() -> E>,
}

impl<E: Engine> TypedSession<E> {
    /// Initializes a fresh game for `players`.
    pub fn start(players: &[ClientId]) -> Result<Self, SessionError> {
        Ok(Self {
            state: E::init(players)?,
            _engine: PhantomData,
        })
    }

    /// The typed state.
    pub fn state(&self) -> &E::State {
        &self.state
    }
}

impl<E: Engine> GameSession for TypedSession<E> {
    fn act(&mut self, actor: &ClientId, action: Value) -> Result<ActionOutcome, SessionError> {
        let action: E::Action = serde_json::from_value(action)
            .map_err(|e| SessionError::MalformedAction(e.to_string()))?;

        if let Err(reason) = E::validate(&self.state, actor, &action) {
            tracing::debug!(game_type = E::GAME_TYPE, %actor, %reason, "action rejected");
            return Ok(ActionOutcome::Rejected(reason));
        }

        self.state = E::apply(&self.state, actor, action);
        Ok(ActionOutcome::Applied)
    }

    fn state_json(&self) -> Result<Value, SessionError> {
        Ok(serde_json::to_value(&self.state)?)
    }

    fn is_terminal(&self) -> bool {
        E::is_terminal(&self.state)
    }

    fn winner(&self) -> Option<ClientId> {
        E::winner(&self.state)
    }
}

/// One game session bound to a room.
///
/// Carries its game type so the room can tell a `gameAction` for another
/// game apart from one for this session.
pub struct Session {
    game_type: String,
    game: Box<dyn GameSession>,
}

impl Session {
    /// Wraps an already-initialized game.
    pub fn new(game_type: impl Into<String>, game: Box<dyn GameSession>) -> Self {
        Self {
            game_type: game_type.into(),
            game,
        }
    }

    /// The engine name this session runs.
    pub fn game_type(&self) -> &str {
        &self.game_type
    }

    /// See [`GameSession::act`].
    pub fn act(&mut self, actor: &ClientId, action: Value) -> Result<ActionOutcome, SessionError> {
        self.game.act(actor, action)
    }

    /// See [`GameSession::state_json`].
    pub fn state_json(&self) -> Result<Value, SessionError> {
        self.game.state_json()
    }

    pub fn is_terminal(&self) -> bool {
        self.game.is_terminal()
    }

    pub fn winner(&self) -> Option<ClientId> {
        self.game.winner()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("game_type", &self.game_type)
            .field("terminal", &self.game.is_terminal())
            .finish_non_exhaustive()
    }
}
