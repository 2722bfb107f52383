//! Room registry: the fixed set of named rooms.
//!
//! Rooms are spawned once, when the registry is built, and live as long
//! as it does. Nothing is created or destroyed at runtime; a room with no
//! members is simply empty.

use std::collections::HashMap;
use std::sync::Arc;

use gamehall_protocol::RoomSummary;
use gamehall_session::SessionManager;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Looks up rooms by name and lists them in configuration order.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    /// In configuration order, for listing.
    rooms: Vec<RoomHandle>,
    index: HashMap<String, usize>,
}

impl RoomRegistry {
    /// Spawns one room actor per name. Duplicate names are skipped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<I, S>(names: I, config: RoomConfig, sessions: Arc<SessionManager>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rooms = Vec::new();
        let mut index = HashMap::new();

        for name in names {
            let name = name.into();
            if index.contains_key(&name) {
                tracing::warn!(room = %name, "duplicate room name, skipping");
                continue;
            }
            index.insert(name.clone(), rooms.len());
            rooms.push(spawn_room(
                name,
                config.clone(),
                Arc::clone(&sessions),
                DEFAULT_CHANNEL_SIZE,
            ));
        }

        tracing::info!(rooms = rooms.len(), "room registry ready");
        Self { rooms, index }
    }

    /// Finds a room by exact name.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] for names that aren't configured.
    pub fn get(&self, name: &str) -> Result<&RoomHandle, RoomError> {
        self.index
            .get(name)
            .map(|&i| &self.rooms[i])
            .ok_or_else(|| RoomError::NotFound(name.to_string()))
    }

    /// Snapshots every room and its members, in configuration order.
    ///
    /// Rooms that fail to respond are skipped.
    pub async fn list_all(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::with_capacity(self.rooms.len());
        for handle in &self.rooms {
            match handle.summary().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => tracing::warn!(room = handle.name(), error = %e, "room did not respond"),
            }
        }
        summaries
    }

    /// Room names in configuration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rooms.iter().map(RoomHandle::name)
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
