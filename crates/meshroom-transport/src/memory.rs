//! In-process hub implementing all three capabilities.
//!
//! [`MemoryHub`] fans topic messages out to every subscribed endpoint
//! (including the publisher, matching real pub/sub self-delivery) and keeps
//! a link table so dials produce [`LinkEvent`]s on both endpoints. Used by
//! tests and the demo; it never touches a socket.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::{
    DialPath, Identity, LinkEvent, LinkEvents, PeerId, PubSub, Subscription,
    Swarm, Topic, TransportError,
};

/// An in-process pub/sub hub with a direct-link table.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    /// Per-topic subscriber senders, tagged with the owning endpoint.
    topics: Mutex<HashMap<Topic, Vec<(PeerId, mpsc::UnboundedSender<Vec<u8>>)>>>,
    /// Per-endpoint link state and event watchers.
    peers: Mutex<HashMap<PeerId, PeerSlot>>,
}

struct PeerSlot {
    watchers: Vec<mpsc::UnboundedSender<LinkEvent>>,
    links: HashSet<PeerId>,
    reachable: bool,
}

impl Default for PeerSlot {
    fn default() -> Self {
        Self {
            watchers: Vec::new(),
            links: HashSet::new(),
            reachable: true,
        }
    }
}

impl MemoryHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new endpoint with a random peer id.
    pub fn endpoint(&self) -> MemoryTransport {
        self.endpoint_with_id(PeerId::random())
    }

    /// Registers a new endpoint under a caller-chosen peer id.
    pub fn endpoint_with_id(&self, id: PeerId) -> MemoryTransport {
        self.inner
            .peers
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default();
        MemoryTransport {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    /// Marks an endpoint dialable or not. Unreachable endpoints keep
    /// receiving topic messages; only dials to them fail.
    pub fn set_reachable(&self, peer: &PeerId, reachable: bool) {
        if let Some(slot) = self.inner.peers.lock().unwrap().get_mut(peer) {
            slot.reachable = reachable;
        }
    }

    /// Removes an endpoint: closes its subscriptions and reports the link
    /// loss to every partner, as a transport would on disconnect.
    pub fn drop_peer(&self, peer: &PeerId) {
        let slot = self.inner.peers.lock().unwrap().remove(peer);
        let Some(slot) = slot else { return };

        {
            let mut topics = self.inner.topics.lock().unwrap();
            for subscribers in topics.values_mut() {
                subscribers.retain(|(owner, _)| owner != peer);
            }
        }

        let mut peers = self.inner.peers.lock().unwrap();
        for partner in slot.links {
            if let Some(partner_slot) = peers.get_mut(&partner) {
                partner_slot.links.remove(peer);
                partner_slot
                    .watchers
                    .retain(|w| w.send(LinkEvent::Left(peer.clone())).is_ok());
            }
        }
    }
}

/// One endpoint of a [`MemoryHub`]; implements [`PubSub`], [`Swarm`] and
/// [`Identity`].
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<HubInner>,
    id: PeerId,
}

impl MemoryTransport {
    /// Returns this endpoint's peer id.
    pub fn id(&self) -> &PeerId {
        &self.id
    }
}

impl PubSub for MemoryTransport {
    type Error = TransportError;

    async fn subscribe(&self, topic: &Topic) -> Result<Subscription, TransportError> {
        let (sender, subscription) = Subscription::channel();
        self.inner
            .topics
            .lock()
            .unwrap()
            .entry(topic.clone())
            .or_default()
            .push((self.id.clone(), sender));
        Ok(subscription)
    }

    async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut topics = self.inner.topics.lock().unwrap();
        if let Some(subscribers) = topics.get_mut(topic) {
            // Dead receivers are pruned here rather than on unsubscribe.
            subscribers.retain(|(_, sender)| sender.send(payload.clone()).is_ok());
        }
        Ok(())
    }
}

impl Swarm for MemoryTransport {
    type Error = TransportError;

    async fn links(&self) -> Result<LinkEvents, TransportError> {
        let (sender, events) = LinkEvents::channel();
        let mut peers = self.inner.peers.lock().unwrap();
        let slot = peers
            .get_mut(&self.id)
            .ok_or_else(|| TransportError::UnknownPeer(self.id.clone()))?;
        slot.watchers.push(sender);
        Ok(events)
    }

    async fn connect(&self, peer: &PeerId, _path: DialPath) -> Result<(), TransportError> {
        if *peer == self.id {
            return Ok(());
        }

        let mut peers = self.inner.peers.lock().unwrap();
        match peers.get(peer) {
            None => return Err(TransportError::UnknownPeer(peer.clone())),
            Some(slot) if !slot.reachable => {
                return Err(TransportError::Unreachable(peer.clone()));
            }
            Some(_) => {}
        }

        let newly = match peers.get_mut(&self.id) {
            Some(slot) => slot.links.insert(peer.clone()),
            None => return Err(TransportError::UnknownPeer(self.id.clone())),
        };
        if !newly {
            // Already linked — a redundant dial is a successful no-op.
            return Ok(());
        }

        if let Some(slot) = peers.get_mut(&self.id) {
            slot.watchers
                .retain(|w| w.send(LinkEvent::Joined(peer.clone())).is_ok());
        }
        if let Some(slot) = peers.get_mut(peer) {
            slot.links.insert(self.id.clone());
            slot.watchers
                .retain(|w| w.send(LinkEvent::Joined(self.id.clone())).is_ok());
        }
        Ok(())
    }
}

impl Identity for MemoryTransport {
    type Error = TransportError;

    async fn resolve(&self) -> Result<PeerId, TransportError> {
        Ok(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_endpoints() -> (MemoryHub, MemoryTransport, MemoryTransport) {
        let hub = MemoryHub::new();
        let a = hub.endpoint_with_id(PeerId::new("QmA"));
        let b = hub.endpoint_with_id(PeerId::new("QmB"));
        (hub, a, b)
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers_including_self() {
        let (_hub, a, b) = two_endpoints();
        let topic = Topic::new("t");

        let mut sub_a = a.subscribe(&topic).await.unwrap();
        let mut sub_b = b.subscribe(&topic).await.unwrap();

        a.publish(&topic, b"hello".to_vec()).await.unwrap();

        assert_eq!(sub_a.recv().await, Some(b"hello".to_vec()));
        assert_eq!(sub_b.recv().await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_publish_is_topic_isolated() {
        let (_hub, a, b) = two_endpoints();
        let mut other = b.subscribe(&Topic::new("other")).await.unwrap();

        a.publish(&Topic::new("t"), b"x".to_vec()).await.unwrap();

        assert!(other.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_connect_emits_joined_on_both_sides() {
        let (_hub, a, b) = two_endpoints();
        let mut links_a = a.links().await.unwrap();
        let mut links_b = b.links().await.unwrap();

        a.connect(b.id(), DialPath::Direct).await.unwrap();

        assert_eq!(links_a.recv().await, Some(LinkEvent::Joined(b.id().clone())));
        assert_eq!(links_b.recv().await, Some(LinkEvent::Joined(a.id().clone())));
    }

    #[tokio::test]
    async fn test_connect_unknown_peer_fails() {
        let (_hub, a, _b) = two_endpoints();
        let result = a.connect(&PeerId::new("QmZ"), DialPath::Direct).await;
        assert!(matches!(result, Err(TransportError::UnknownPeer(_))));
    }

    #[tokio::test]
    async fn test_connect_unreachable_peer_fails() {
        let (hub, a, b) = two_endpoints();
        hub.set_reachable(b.id(), false);

        let result = a.connect(b.id(), DialPath::Direct).await;
        assert!(matches!(result, Err(TransportError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_redundant_connect_is_silent() {
        let (_hub, a, b) = two_endpoints();
        a.connect(b.id(), DialPath::Direct).await.unwrap();

        let mut links_b = b.links().await.unwrap();
        a.connect(b.id(), DialPath::Direct).await.unwrap();

        assert!(links_b.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_drop_peer_reports_left_to_partners() {
        let (hub, a, b) = two_endpoints();
        a.connect(b.id(), DialPath::Direct).await.unwrap();
        let mut links_a = a.links().await.unwrap();

        hub.drop_peer(b.id());

        assert_eq!(links_a.recv().await, Some(LinkEvent::Left(b.id().clone())));
    }

    #[tokio::test]
    async fn test_drop_peer_closes_its_subscriptions() {
        let (hub, _a, b) = two_endpoints();
        let topic = Topic::new("t");
        let mut sub_b = b.subscribe(&topic).await.unwrap();

        hub.drop_peer(b.id());

        assert_eq!(sub_b.recv().await, None);
    }

    #[tokio::test]
    async fn test_identity_resolves_endpoint_id() {
        let (_hub, a, _b) = two_endpoints();
        assert_eq!(a.resolve().await.unwrap(), PeerId::new("QmA"));
    }
}
