//! Rooms for Gamehall.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! member list, at most one game session, and that session's expiry
//! timer. Every operation on a room is a command processed to completion
//! before the next one, so a room's membership and game state never see
//! two writers at once.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: the fixed set of named rooms, created at startup
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomConfig`]: session lifetime and expiry policy
//! - [`Member`]: one connection's seat in a room

mod config;
mod error;
mod registry;
mod room;

pub use config::{ExpiryPolicy, RoomConfig};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{FrameSender, Member, RoomHandle, SessionSnapshot};
