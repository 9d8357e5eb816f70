//! Transport capability layer for Meshroom.
//!
//! The discovery engine never talks to the network directly. It is handed
//! three capabilities and drives them:
//!
//! - [`PubSub`] — subscribe/publish on a named [`Topic`].
//! - [`Swarm`] — open direct links to peers and watch link up/down events.
//! - [`Identity`] — resolve the local [`PeerId`] once at startup.
//!
//! Two reference implementations are provided behind feature flags:
//!
//! - `memory` (default) — [`MemoryHub`], an in-process hub for tests and
//!   demos.
//! - `websocket` (default) — [`Relay`] and [`WsTransport`], a relay server
//!   and client over `tokio-tungstenite`.

mod error;
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "websocket")]
mod relay;
#[cfg(feature = "websocket")]
mod websocket;
#[cfg(feature = "websocket")]
mod wire;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{MemoryHub, MemoryTransport};
#[cfg(feature = "websocket")]
pub use relay::Relay;
#[cfg(feature = "websocket")]
pub use websocket::WsTransport;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a network participant.
///
/// The token is the equality key everywhere in Meshroom; it carries no
/// ordering semantics. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps an existing identifier token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    ///
    /// Reference transports and demos use this; a real deployment derives
    /// the id from its node keypair instead.
    pub fn random() -> Self {
        use rand::distr::{Alphanumeric, SampleString};
        Self(Alphanumeric.sample_string(&mut rand::rng(), 16))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Name of a publish/subscribe channel.
///
/// Immutable for the lifetime of a room instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Wraps a channel name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the channel name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

// ---------------------------------------------------------------------------
// Link events and dial policy
// ---------------------------------------------------------------------------

/// A change in direct-link connectivity, reported by the [`Swarm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A direct link to `peer` came up.
    Joined(PeerId),
    /// The direct link to `peer` went down.
    Left(PeerId),
}

/// Which kind of connection path a dial should request.
///
/// A policy knob, not protocol semantics — transports that only support
/// one path may ignore the hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialPath {
    /// Dial the peer's own address.
    #[default]
    Direct,
    /// Dial through a circuit relay.
    Relayed,
}

// ---------------------------------------------------------------------------
// Streams handed to the engine
// ---------------------------------------------------------------------------

/// Stream of raw message payloads delivered on a subscribed topic.
///
/// Delivery includes the subscriber's own published messages (self-delivery);
/// filtering those out is the consumer's job. Dropping the subscription
/// releases it — the transport prunes the dead sender on its next delivery.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Subscription {
    /// Creates a sender/subscription pair. Transport implementations keep
    /// the sender and hand the subscription to the consumer.
    pub fn channel() -> (mpsc::UnboundedSender<Vec<u8>>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }

    /// Receives the next payload. Returns `None` once the transport side
    /// is gone.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, for draining in tests.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }
}

/// Stream of [`LinkEvent`]s for the local peer.
#[derive(Debug)]
pub struct LinkEvents {
    receiver: mpsc::UnboundedReceiver<LinkEvent>,
}

impl LinkEvents {
    /// Creates a sender/stream pair, as [`Subscription::channel`].
    pub fn channel() -> (mpsc::UnboundedSender<LinkEvent>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }

    /// Receives the next link event. Returns `None` once the transport
    /// side is gone.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, for draining in tests.
    pub fn try_recv(&mut self) -> Option<LinkEvent> {
        self.receiver.try_recv().ok()
    }
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Publish/subscribe on named topics.
///
/// Methods return explicit `impl Future + Send` so generic consumers can
/// spawn the futures onto the runtime.
pub trait PubSub: Send + Sync + 'static {
    /// The error type for pub/sub operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Subscribes to a topic. Every payload published on the topic is
    /// delivered, including the subscriber's own.
    fn subscribe(
        &self,
        topic: &Topic,
    ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send;

    /// Publishes a payload to every current subscriber of the topic.
    fn publish(
        &self,
        topic: &Topic,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Direct-link management: dialing peers and watching link liveness.
pub trait Swarm: Send + Sync + 'static {
    /// The error type for swarm operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns a fresh stream of link up/down events for the local peer.
    fn links(
        &self,
    ) -> impl Future<Output = Result<LinkEvents, Self::Error>> + Send;

    /// Attempts to open a direct link to `peer`.
    ///
    /// Redundant dials for an already-linked peer must succeed without
    /// emitting duplicate [`LinkEvent::Joined`] events.
    fn connect(
        &self,
        peer: &PeerId,
        path: DialPath,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Resolves the local peer identity. Called once at startup.
pub trait Identity: Send + Sync + 'static {
    /// The error type for identity resolution.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolves the local [`PeerId`].
    fn resolve(
        &self,
    ) -> impl Future<Output = Result<PeerId, Self::Error>> + Send;
}
