//! The peer set: every remote participant this room currently knows.

use meshroom_transport::PeerId;

/// De-duplicated, insertion-ordered collection of known remote peers.
///
/// Owned exclusively by the room actor, so it needs no locking. Two
/// invariants hold at all times:
///
/// - the local peer id is never a member;
/// - every insert is preceded by a membership check, so `add` is
///   idempotent.
///
/// Backed by a `Vec` rather than a hash set: rooms are small, and
/// insertion order gives [`PeerSet::snapshot`] a stable, reproducible
/// ordering for outbound peerlist envelopes.
#[derive(Debug, Clone)]
pub struct PeerSet {
    local: PeerId,
    peers: Vec<PeerId>,
}

impl PeerSet {
    /// Creates an empty set owned by `local`.
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            peers: Vec::new(),
        }
    }

    /// Returns the local peer id.
    pub fn local(&self) -> &PeerId {
        &self.local
    }

    /// Returns `true` if `peer` is the local peer.
    pub fn is_local(&self, peer: &PeerId) -> bool {
        *peer == self.local
    }

    /// Returns `true` if `peer` is a known remote peer.
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains(peer)
    }

    /// Inserts `peer`, returning whether it was newly added.
    ///
    /// A no-op (returning `false`) when the peer is already known or is
    /// the local peer.
    pub fn add(&mut self, peer: PeerId) -> bool {
        if self.is_local(&peer) || self.contains(&peer) {
            return false;
        }
        self.peers.push(peer);
        true
    }

    /// Removes `peer`, returning whether it was present.
    pub fn remove(&mut self, peer: &PeerId) -> bool {
        let before = self.peers.len();
        self.peers.retain(|known| known != peer);
        self.peers.len() != before
    }

    /// Returns the known peers in insertion order.
    pub fn snapshot(&self) -> Vec<PeerId> {
        self.peers.clone()
    }

    /// Returns the number of known peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns `true` if no peers are known.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
