//! Room configuration and lifecycle state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use meshroom_transport::DialPath;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for a room instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Upper bound on a single dial attempt. `None` disables the limit.
    /// Expiry is reported as a connect fault, never as a failure of the
    /// engine.
    pub dial_timeout: Option<Duration>,

    /// Which connection path dials request. A policy choice forwarded to
    /// the transport as a hint.
    pub dial_path: DialPath,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Some(Duration::from_secs(10)),
            dial_path: DialPath::Direct,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions are strictly ordered:
///
/// ```text
/// Uninitialized → Active → TornDown
/// ```
///
/// - **Uninitialized**: the local identity is not resolved yet; no
///   handler runs in this state.
/// - **Active**: subscribed, identity known, presence announced. All
///   reconciliation happens here.
/// - **TornDown**: subscription and liveness registration released. The
///   room is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Uninitialized,
    Active,
    TornDown,
}

impl RoomState {
    /// Returns `true` if the room is reconciling peers.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if the room has been shut down.
    pub fn is_torn_down(&self) -> bool {
        matches!(self, Self::TornDown)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Active => write!(f, "Active"),
            Self::TornDown => write!(f, "TornDown"),
        }
    }
}
