//! Core protocol types for Gamehall's wire format.
//!
//! Every type here travels "on the wire": it is serialized to a JSON text
//! frame, sent over the connection, and deserialized on the other side.
//! Frames are internally tagged (`{"type": "joinRoom", ...}`) with
//! camelCase field names so browser clients can consume them directly.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The opaque identity the server assigns to one connection.
///
/// Generated from 128 random bits and hex encoded, so two live connections
/// never share an id in practice. `#[serde(transparent)]` keeps it a plain
/// JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wraps an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random id (32 lowercase hex characters).
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix of the id, used for default display labels.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(6)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// One member of a room as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    /// The member's connection id.
    pub id: ClientId,
    /// Human-readable display label.
    pub name: String,
}

/// A room and its current members, as listed in `roomsList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: String,
    pub clients: Vec<MemberSummary>,
}

/// An application event relayed between room members.
///
/// The server never interprets `event` or `payload`; it only fans the
/// message out to the sender's room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessage {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

/// Why a game session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameEndReason {
    /// A member explicitly stopped the session.
    Stopped,
    /// The session's expiry deadline passed without activity.
    Expired,
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Frames a client can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// "Put me in this room." Leaves any previous room first.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_name: String,
        /// Optional display label; the server derives one when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_name: Option<String>,
    },

    /// "Relay this to everyone else in my room."
    Message { message: RoomMessage },

    /// "Do this in my room's game." The action shape is engine-specific,
    /// except for the `start` and `end` actions the server handles itself.
    #[serde(rename_all = "camelCase")]
    GameAction { game_type: String, action: Value },

    /// "Show me the rooms."
    ListRooms,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// First frame on every connection: the identity the server assigned.
    #[serde(rename_all = "camelCase")]
    Connected { client_id: ClientId },

    /// Snapshot of every room and its members.
    RoomsList { rooms: Vec<RoomSummary> },

    /// Sent to a joiner: the room name and its full membership.
    JoinedRoom {
        room: String,
        clients: Vec<MemberSummary>,
    },

    /// Sent to existing members when someone joins.
    #[serde(rename_all = "camelCase")]
    NewClient { client_id: ClientId },

    /// Sent to remaining members when someone leaves or is reaped.
    #[serde(rename_all = "camelCase")]
    ClientLeft { client_id: ClientId },

    /// A relayed room message, tagged with its sender.
    #[serde(rename_all = "camelCase")]
    Message {
        client_id: ClientId,
        message: RoomMessage,
    },

    /// The authoritative game state, sent to every member after each
    /// transition. `validation_error` is set when an action was rejected
    /// (the state is then unchanged).
    #[serde(rename_all = "camelCase")]
    GameStateUpdate {
        game_type: String,
        state: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validation_error: Option<String>,
    },

    /// The room's game session was stopped or expired.
    #[serde(rename_all = "camelCase")]
    GameEnded {
        game_type: String,
        reason: GameEndReason,
    },

    /// Something the sender did went wrong. Only the sender sees it.
    Error { message: String },
}

impl ServerFrame {
    /// Shorthand for an [`ServerFrame::Error`] frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
