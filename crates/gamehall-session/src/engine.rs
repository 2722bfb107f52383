//! The `Engine` trait: the extension point for game developers.
//!
//! An engine is a bag of pure functions. It never holds per-room data:
//! all state lives in the [`Session`](crate::Session) that owns it, so a
//! single engine serves every room running that game.

use gamehall_protocol::ClientId;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::SessionError;

/// The contract every pluggable game implements.
///
/// The session calls [`validate`](Engine::validate) before
/// [`apply`](Engine::apply) and only applies actions that pass, so
/// `apply` may assume its input is legal.
pub trait Engine: Send + Sync + 'static {
    /// Name clients use in `gameAction.gameType`.
    const GAME_TYPE: &'static str;

    /// The full game state, replicated to every room member as JSON.
    type State: Clone + Serialize + Send + Sync + 'static;

    /// Engine-specific actions, parsed from `gameAction.action`.
    type Action: DeserializeOwned + Send + 'static;

    /// Creates the initial state for the room's members, in join order.
    ///
    /// # Errors
    /// [`SessionError::InvalidPlayerCount`] if the game can't be played by
    /// this many players.
    fn init(players: &[ClientId]) -> Result<Self::State, SessionError>;

    /// Checks an action against the current state.
    ///
    /// Returns a user-facing reason when the action is illegal.
    fn validate(
        state: &Self::State,
        actor: &ClientId,
        action: &Self::Action,
    ) -> Result<(), String>;

    /// Produces the state after a validated action.
    fn apply(
        state: &Self::State,
        actor: &ClientId,
        action: Self::Action,
    ) -> Self::State;

    /// Returns `true` once the game is over (won or drawn).
    fn is_terminal(state: &Self::State) -> bool;

    /// The winning player, if the game ended with one.
    fn winner(state: &Self::State) -> Option<ClientId>;
}
