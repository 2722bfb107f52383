//! The session manager: maps game-type names to engines.
//!
//! Registration happens once at startup. After that the manager is only
//! read, so the server shares it behind an `Arc` without any locking.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use gamehall_protocol::ClientId;

use crate::session::TypedSession;
use crate::{Engine, Session, SessionError};

/// Starts games of one engine type without naming it.
trait EngineEntry: Send + Sync {
    fn start(&self, players: &[ClientId]) -> Result<Session, SessionError>;
}

struct Registered<E>(PhantomData<fn() -> E>);

impl<E: Engine> EngineEntry for Registered<E> {
    fn start(&self, players: &[ClientId]) -> Result<Session, SessionError> {
        let game = TypedSession::<E>::start(players)?;
        Ok(Session::new(E::GAME_TYPE, Box::new(game)))
    }
}

/// Registry of available game engines.
#[derive(Clone, Default)]
pub struct SessionManager {
    engines: HashMap<String, Arc<dyn EngineEntry>>,
}

impl SessionManager {
    /// Creates a manager with no engines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers engine `E` under [`Engine::GAME_TYPE`].
    ///
    /// Registering the same game type twice replaces the earlier engine.
    pub fn register<E: Engine>(&mut self) -> &mut Self {
        let replaced = self
            .engines
            .insert(E::GAME_TYPE.to_string(), Arc::new(Registered::<E>(PhantomData)))
            .is_some();
        if replaced {
            tracing::warn!(game_type = E::GAME_TYPE, "engine re-registered, replacing previous");
        } else {
            tracing::debug!(game_type = E::GAME_TYPE, "engine registered");
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_engine<E: Engine>(mut self) -> Self {
        self.register::<E>();
        self
    }

    /// Starts a new session of `game_type` for `players` (in join order).
    ///
    /// # Errors
    /// - [`SessionError::UnknownGameType`] if no engine has that name
    /// - whatever the engine's `init` returns, e.g.
    ///   [`SessionError::InvalidPlayerCount`]
    pub fn start(&self, game_type: &str, players: &[ClientId]) -> Result<Session, SessionError> {
        let entry = self
            .engines
            .get(game_type)
            .ok_or_else(|| SessionError::UnknownGameType(game_type.to_string()))?;
        let session = entry.start(players)?;
        tracing::info!(game_type, players = players.len(), "session started");
        Ok(session)
    }

    /// Whether an engine is registered under `game_type`.
    pub fn contains(&self, game_type: &str) -> bool {
        self.engines.contains_key(game_type)
    }

    /// Registered game types, sorted.
    pub fn game_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.engines.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("engines", &self.game_types())
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================
