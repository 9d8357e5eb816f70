//! Error types for the room layer.
//!
//! Two tiers, matching the protocol's recovery model: [`RoomError`] is
//! fatal (initialization failed, or the room is gone); [`RoomFault`] is a
//! non-fatal incident reported to the fault sink while the engine keeps
//! running.

use meshroom_transport::{PeerId, Topic};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur joining, driving, or leaving a room.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Resolving the local identity failed. Nothing runs before the local
    /// id is known, so the room never becomes active.
    #[error("identity resolution failed: {0}")]
    Identity(#[source] BoxedError),

    /// Subscribing to the discovery topic failed at startup.
    #[error("subscribing to topic {topic} failed: {source}")]
    Subscribe {
        topic: Topic,
        #[source]
        source: BoxedError,
    },

    /// Acquiring the link liveness stream failed at startup.
    #[error("acquiring link events failed: {0}")]
    Liveness(#[source] BoxedError),

    /// The room actor is no longer running.
    #[error("room for topic {0} is no longer running")]
    Unavailable(Topic),

    /// A room for this topic already exists in the manager.
    #[error("already joined topic {0}")]
    AlreadyJoined(Topic),

    /// No room for this topic exists in the manager.
    #[error("no room joined for topic {0}")]
    NotJoined(Topic),
}

/// A non-fatal incident inside a running room.
///
/// Faults are reported to the room's [`FaultSink`](crate::FaultSink) and
/// never terminate the engine: a dropped message, a failed dial, or a
/// failed publish is retried implicitly by the next triggering event.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomFault {
    /// An inbound topic message could not be decoded and was dropped.
    #[error("undecodable message dropped: {reason}")]
    Decode { reason: String },

    /// A dial attempt failed or timed out; a later announcement or link
    /// event will trigger another attempt.
    #[error("dial to {peer} failed: {reason}")]
    Connect { peer: PeerId, reason: String },

    /// Publishing an announcement failed; the next triggering event
    /// re-attempts the broadcast.
    #[error("publish failed: {reason}")]
    Publish { reason: String },
}
