//! Server configuration: defaults, builder inputs, and environment loading.

use std::time::Duration;

use gamehall_room::{ExpiryPolicy, RoomConfig};

/// Rooms provisioned when none are configured.
pub const DEFAULT_ROOMS: [&str; 4] = ["room-1", "room-2", "room-3", "room-4"];

/// Errors from loading a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but can't be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The room list is empty.
    #[error("at least one room name is required")]
    NoRooms,
}

/// Everything needed to run a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,

    /// Fixed room names, in listing order.
    pub rooms: Vec<String>,

    /// Time between liveness sweeps. A silent connection is reaped after
    /// missing one full probe cycle. Zero disables the sweep.
    pub heartbeat_interval: Duration,

    /// Time between `roomsList` broadcasts. Zero disables them.
    pub room_list_interval: Duration,

    /// How long a new TCP connection gets to complete the WebSocket
    /// upgrade before it is dropped. Must be non-zero.
    pub handshake_timeout: Duration,

    /// Session lifetime and expiry policy for every room.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            rooms: DEFAULT_ROOMS.iter().map(|r| r.to_string()).collect(),
            heartbeat_interval: Duration::from_secs(30),
            room_list_interval: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    pub const BIND: &'static str = "GAMEHALL_BIND";
    pub const ROOMS: &'static str = "GAMEHALL_ROOMS";
    pub const HEARTBEAT_SECS: &'static str = "GAMEHALL_HEARTBEAT_SECS";
    pub const ROOM_LIST_SECS: &'static str = "GAMEHALL_ROOM_LIST_SECS";
    pub const HANDSHAKE_SECS: &'static str = "GAMEHALL_HANDSHAKE_SECS";
    pub const SESSION_TTL_SECS: &'static str = "GAMEHALL_SESSION_TTL_SECS";
    pub const EXPIRY_ON_MEMBERSHIP: &'static str = "GAMEHALL_EXPIRY_ON_MEMBERSHIP";

    /// Loads the config from `GAMEHALL_*` environment variables, falling
    /// back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(Self::BIND) {
            config.bind_addr = addr;
        }
        if let Some(rooms) = lookup(Self::ROOMS) {
            config.rooms = parse_rooms(&rooms)?;
        }
        if let Some(v) = lookup(Self::HEARTBEAT_SECS) {
            config.heartbeat_interval = parse_secs(Self::HEARTBEAT_SECS, v)?;
        }
        if let Some(v) = lookup(Self::ROOM_LIST_SECS) {
            config.room_list_interval = parse_secs(Self::ROOM_LIST_SECS, v)?;
        }
        if let Some(v) = lookup(Self::HANDSHAKE_SECS) {
            config.handshake_timeout = parse_nonzero_secs(Self::HANDSHAKE_SECS, v)?;
        }
        if let Some(v) = lookup(Self::SESSION_TTL_SECS) {
            config.room.session_ttl = parse_secs(Self::SESSION_TTL_SECS, v)?;
        }
        if let Some(v) = lookup(Self::EXPIRY_ON_MEMBERSHIP) {
            config.room.expiry_policy = if parse_bool(Self::EXPIRY_ON_MEMBERSHIP, v)? {
                ExpiryPolicy::ActionsAndMembership
            } else {
                ExpiryPolicy::ActionsOnly
            };
        }

        Ok(config)
    }
}

fn parse_rooms(raw: &str) -> Result<Vec<String>, ConfigError> {
    let rooms: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect();
    if rooms.is_empty() {
        return Err(ConfigError::NoRooms);
    }
    Ok(rooms)
}

fn parse_secs(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
    }
}

fn parse_nonzero_secs(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    let secs = parse_secs(key, value.clone())?;
    if secs.is_zero() {
        return Err(ConfigError::Invalid {
            key,
            value,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(secs)
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected true or false".into(),
        }),
    }
}
