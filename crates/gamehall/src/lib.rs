//! # Gamehall
//!
//! A room and game session server for real-time web games.
//!
//! Clients connect over WebSocket, join one of a fixed set of named rooms,
//! relay events to the other members, and hand a room to a pluggable,
//! server-authoritative game engine whose state is replicated to every
//! member. Game developers implement the [`Engine`](gamehall_session::Engine)
//! trait and register it on the builder; the server handles connections,
//! membership, fan-out, session expiry, and dead-connection reaping.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gamehall::prelude::*;
//!
//! # async fn start() -> Result<(), ServerError> {
//! let server = GameHallServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .engine::<TicTacToe>()
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
mod liveness;
mod server;

pub use client::{Client, ClientSet};
pub use config::{ConfigError, DEFAULT_ROOMS, ServerConfig};
pub use error::ServerError;
pub use liveness::{LivenessSupervisor, SweepReport};
pub use server::{GameHallServer, GameHallServerBuilder};

/// Re-exports for building a server and writing engines.
pub mod prelude {
    pub use gamehall_protocol::{
        ClientFrame, ClientId, GameEndReason, MemberSummary, RoomMessage, RoomSummary,
        ServerFrame,
    };
    pub use gamehall_room::{ExpiryPolicy, RoomConfig, RoomError};
    pub use gamehall_session::games::TicTacToe;
    pub use gamehall_session::{Engine, SessionError, SessionManager};

    pub use crate::{ConfigError, GameHallServer, GameHallServerBuilder, ServerConfig, ServerError};
}
