//! Online/offline tracking derived from polling outcomes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    /// State implied by one tick, if any fetch ran.
    ///
    /// Any success means online; a tick where every fetch failed means offline.
    pub fn from_tick(succeeded: usize, failed: usize) -> Option<Self> {
        match (succeeded, failed) {
            (0, 0) => None,
            (0, _) => Some(ConnectivityState::Offline),
            _ => Some(ConnectivityState::Online),
        }
    }

    pub fn is_offline(&self) -> bool {
        *self == ConnectivityState::Offline
    }
}
