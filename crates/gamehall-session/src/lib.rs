//! Game sessions for Gamehall.
//!
//! This crate is where pluggable game logic meets the server:
//!
//! 1. **Engine contract**: the [`Engine`] trait a game implements with
//!    pure functions over its own typed state.
//! 2. **Sessions**: a [`Session`] is one live game bound to a room. Its
//!    state keeps its concrete type; only the room sees it through the
//!    type-erased [`GameSession`] interface.
//! 3. **Registry**: the [`SessionManager`] maps game-type names to
//!    engines and starts sessions. It holds no per-room state, so one
//!    instance serves every room.
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)        ← forwards gameAction frames
//!     ↕
//! Room                  ← owns at most one Session and its expiry timer
//!     ↕
//! Session layer (here)  ← validates and applies actions via the engine
//! ```

mod engine;
mod error;
pub mod games;
mod manager;
mod session;

pub use engine::Engine;
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{ActionOutcome, GameSession, Session};
