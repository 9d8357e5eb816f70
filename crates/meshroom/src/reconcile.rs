//! Reconciliation decisions — the heart of the discovery protocol.
//!
//! These functions are pure with respect to I/O: they mutate the
//! [`PeerSet`] and return the side effects the room actor should perform.
//! Keeping decisions synchronous means every membership check and the
//! mutation it guards happen without an intervening suspension point, so
//! each inbound message is processed atomically against the set.

use meshroom_protocol::Envelope;
use meshroom_transport::{LinkEvent, PeerId};

use crate::PeerSet;

/// A side effect requested by a reconciliation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Publish an envelope on the room's topic.
    Publish(Envelope),
    /// Dial a direct link to a peer (fire-and-forget).
    Connect(PeerId),
}

/// Decides how to react to an inbound announcement.
///
/// - `peer-joined` from an unknown remote peer: reply with a `peerlist`
///   snapshot (taken before the newcomer is added, so it describes
///   "everyone known so far"), add the peer, dial it. Self-echoes and
///   already-known peers are ignored — that single membership check is
///   what stops rebroadcast storms and duplicate dials.
/// - `peerlist` addressed to us with more than one entry: adopt and dial
///   every listed peer we don't know yet. A singleton list carries no new
///   information (the sender is mirroring our own announcement back) and
///   is ignored. Lists addressed to other peers are ignored.
pub fn on_envelope(peers: &mut PeerSet, envelope: Envelope) -> Vec<Effect> {
    match envelope {
        Envelope::PeerJoined { peer } => {
            if peers.is_local(&peer) || peers.contains(&peer) {
                return Vec::new();
            }
            let reply = Envelope::peerlist(peer.clone(), peers.snapshot());
            peers.add(peer.clone());
            vec![Effect::Publish(reply), Effect::Connect(peer)]
        }

        Envelope::Peerlist { recipient, peers: listed } => {
            if !peers.is_local(&recipient) || listed.len() <= 1 {
                return Vec::new();
            }
            let mut effects = Vec::new();
            for peer in listed {
                // `add` refuses the local id and duplicates, so each new
                // peer is dialed exactly once per list.
                if peers.add(peer.clone()) {
                    effects.push(Effect::Connect(peer));
                }
            }
            effects
        }
    }
}

/// Decides how to react to a link liveness event.
///
/// - `Joined`: a direct link came up. If the peer is new, dial it back
///   and rebroadcast its announcement so peers reachable only through us
///   learn about it (a freshly connected node typically has one link;
///   this re-announcement is how multi-hop awareness propagates).
/// - `Left`: forget the peer unconditionally; absent peers are a no-op.
pub fn on_link(peers: &mut PeerSet, event: LinkEvent) -> Vec<Effect> {
    match event {
        LinkEvent::Joined(peer) => {
            if !peers.add(peer.clone()) {
                return Vec::new();
            }
            vec![
                Effect::Connect(peer.clone()),
                Effect::Publish(Envelope::peer_joined(peer)),
            ]
        }
        LinkEvent::Left(peer) => {
            peers.remove(&peer);
            Vec::new()
        }
    }
}
