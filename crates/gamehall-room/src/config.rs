//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which events push a running session's expiry deadline back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpiryPolicy {
    /// Only accepted game actions extend the deadline.
    #[default]
    ActionsOnly,
    /// Members joining or leaving extend it as well.
    ActionsAndMembership,
}

impl ExpiryPolicy {
    /// Returns `true` if joins and leaves re-arm the expiry timer.
    pub fn extends_on_membership(self) -> bool {
        matches!(self, Self::ActionsAndMembership)
    }
}

/// Configuration shared by every room in a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How long a session may go without activity before it's cleared.
    /// A stopped session's state is also kept for this long.
    pub session_ttl: Duration,

    /// Whether membership changes count as activity.
    pub expiry_policy: ExpiryPolicy,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(30 * 60),
            expiry_policy: ExpiryPolicy::default(),
        }
    }
}
