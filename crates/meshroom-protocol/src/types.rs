//! Announcement envelopes — the discovery protocol's wire format.
//!
//! Everything peers exchange on the shared topic is one of two small
//! messages. The JSON field names are the interop contract with other
//! implementations of the protocol, so the serde attributes here are
//! load-bearing; the tests pin the exact shapes.

use serde::{Deserialize, Serialize};

use meshroom_transport::PeerId;

/// An announcement exchanged on the discovery topic.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, and
/// `rename_all = "kebab-case"` gives the tag values the wire spelling:
///
/// ```text
/// { "type": "peer-joined", "peer": "<peer-id>" }
/// { "type": "peerlist", "for": "<peer-id>", "peers": ["<peer-id>", ...] }
/// ```
///
/// Unknown fields in inbound envelopes are ignored rather than rejected,
/// so newer senders can extend the format without breaking older readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Envelope {
    /// One peer announcing its presence on the topic.
    ///
    /// Sent once by every peer after subscribing, and re-sent on behalf of
    /// a peer when a direct link to it comes up (that rebroadcast is how
    /// awareness spreads past the first hop).
    PeerJoined { peer: PeerId },

    /// A directed reply carrying a snapshot of the sender's peer set.
    ///
    /// `recipient` is serialized as `"for"` (a Rust keyword, hence the
    /// rename). Only the addressed peer acts on the list; everyone else
    /// on the topic sees and ignores it.
    Peerlist {
        #[serde(rename = "for")]
        recipient: PeerId,
        peers: Vec<PeerId>,
    },
}

impl Envelope {
    /// Builds the presence announcement for `peer`.
    pub fn peer_joined(peer: PeerId) -> Self {
        Self::PeerJoined { peer }
    }

    /// Builds a peer-set reply addressed to `recipient`.
    pub fn peerlist(recipient: PeerId, peers: Vec<PeerId>) -> Self {
        Self::Peerlist { recipient, peers }
    }
}
