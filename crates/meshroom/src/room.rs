//! Room actor: an isolated Tokio task that reconciles one discovery topic.
//!
//! Each room runs in its own task, owning the peer set outright and
//! communicating with the outside world through an mpsc channel. All
//! reconciliation is funneled through one `select!` loop, so no two
//! handlers ever touch the peer set concurrently — that single-task
//! discipline is the room's entire locking story.

use std::sync::Arc;

use meshroom_protocol::{Codec, Envelope, JsonCodec};
use meshroom_transport::{
    Identity, LinkEvent, LinkEvents, PeerId, PubSub, Subscription, Swarm,
    Topic,
};
use tokio::sync::{mpsc, oneshot};

use crate::connector::Connector;
use crate::reconcile::{self, Effect};
use crate::{FaultSink, LogSink, PeerSet, RoomConfig, RoomError, RoomFault, RoomState};

/// Command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Commands sent to a room actor through its channel.
enum RoomCommand {
    /// Publish an envelope on the room's topic.
    Broadcast { envelope: Envelope },

    /// Request a metadata snapshot.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Request the current peer set snapshot.
    Peers { reply: oneshot::Sender<Vec<PeerId>> },

    /// Tear the room down, releasing its subscriptions.
    Shutdown { reply: oneshot::Sender<()> },
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    /// The discovery topic this room reconciles.
    pub topic: Topic,
    /// The local peer id.
    pub local: PeerId,
    /// Current lifecycle state.
    pub state: RoomState,
    /// Number of known remote peers.
    pub peer_count: usize,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    topic: Topic,
    local: PeerId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's topic.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Returns the local peer id the room announced itself under.
    pub fn local_id(&self) -> &PeerId {
        &self.local
    }

    /// Publishes an envelope on the room's topic.
    ///
    /// Publish failures inside the actor are reported to the fault sink,
    /// not returned here; this errors only if the room is gone.
    pub async fn broadcast(&self, envelope: Envelope) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Broadcast { envelope })
            .await
            .map_err(|_| RoomError::Unavailable(self.topic.clone()))
    }

    /// Requests the current room metadata.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.topic.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.topic.clone()))
    }

    /// Requests a snapshot of the known peers, in insertion order.
    pub async fn peers(&self) -> Result<Vec<PeerId>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Peers { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.topic.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.topic.clone()))
    }

    /// Shuts the room down and waits for the actor to acknowledge.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Shutdown { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.topic.clone()))?;
        let _ = reply_rx.await;
        Ok(())
    }
}

/// Joins a discovery room on `topic`, reporting faults via [`LogSink`].
///
/// See [`spawn_room_with_sink`] for the full contract.
pub async fn spawn_room<T>(
    transport: T,
    topic: Topic,
    config: RoomConfig,
) -> Result<RoomHandle, RoomError>
where
    T: PubSub + Swarm + Identity,
{
    spawn_room_with_sink(transport, topic, config, LogSink).await
}

/// Joins a discovery room on `topic` with an explicit fault sink.
///
/// Initialization is strictly ordered, each step gating the next:
///
/// 1. resolve the local identity — fatal on failure, nothing else runs;
/// 2. acquire the link liveness stream;
/// 3. subscribe to the topic — before announcing, so replies to our own
///    announcement cannot be missed;
/// 4. announce `peer-joined { peer: self }` (from inside the actor task).
///
/// The returned handle controls the actor; dropping every handle leaves
/// the room running until [`RoomHandle::shutdown`] or transport loss.
pub async fn spawn_room_with_sink<T, K>(
    transport: T,
    topic: Topic,
    config: RoomConfig,
    sink: K,
) -> Result<RoomHandle, RoomError>
where
    T: PubSub + Swarm + Identity,
    K: FaultSink,
{
    let transport = Arc::new(transport);

    let local = transport
        .resolve()
        .await
        .map_err(|e| RoomError::Identity(Box::new(e)))?;

    let links = transport
        .links()
        .await
        .map_err(|e| RoomError::Liveness(Box::new(e)))?;

    let inbound = transport.subscribe(&topic).await.map_err(|e| {
        RoomError::Subscribe {
            topic: topic.clone(),
            source: Box::new(e),
        }
    })?;

    let sink: Arc<dyn FaultSink> = Arc::new(sink);
    let connector = Connector::new(Arc::clone(&transport), Arc::clone(&sink), &config);
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);

    let actor = RoomActor {
        topic: topic.clone(),
        state: RoomState::Uninitialized,
        peers: PeerSet::new(local.clone()),
        codec: JsonCodec,
        transport,
        connector,
        sink,
        inbound,
        links,
        commands: rx,
    };
    tokio::spawn(actor.run());

    Ok(RoomHandle {
        topic,
        local,
        sender: tx,
    })
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<T: PubSub + Swarm> {
    topic: Topic,
    state: RoomState,
    peers: PeerSet,
    codec: JsonCodec,
    transport: Arc<T>,
    connector: Connector<T>,
    sink: Arc<dyn FaultSink>,
    inbound: Subscription,
    links: LinkEvents,
    commands: mpsc::Receiver<RoomCommand>,
}

impl<T: PubSub + Swarm> RoomActor<T> {
    /// Runs the actor loop: announce, then reconcile until shutdown.
    async fn run(mut self) {
        tracing::info!(
            topic = %self.topic,
            local = %self.peers.local(),
            "room started"
        );

        self.broadcast(Envelope::peer_joined(self.peers.local().clone()))
            .await;
        self.state = RoomState::Active;

        loop {
            tokio::select! {
                Some(cmd) = self.commands.recv() => {
                    if self.handle_command(cmd).await {
                        break;
                    }
                }
                Some(payload) = self.inbound.recv() => {
                    self.handle_payload(payload).await;
                }
                Some(event) = self.links.recv() => {
                    self.handle_link(event).await;
                }
                else => break,
            }
        }

        self.state = RoomState::TornDown;
        tracing::info!(topic = %self.topic, "room torn down");
        // Dropping the actor drops the subscription and link stream,
        // releasing the transport-side registrations.
    }

    /// Handles one command. Returns `true` when the actor should stop.
    async fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Broadcast { envelope } => {
                self.broadcast(envelope).await;
                false
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(RoomInfo {
                    topic: self.topic.clone(),
                    local: self.peers.local().clone(),
                    state: self.state,
                    peer_count: self.peers.len(),
                });
                false
            }
            RoomCommand::Peers { reply } => {
                let _ = reply.send(self.peers.snapshot());
                false
            }
            RoomCommand::Shutdown { reply } => {
                let _ = reply.send(());
                true
            }
        }
    }

    /// Decodes and reconciles one inbound topic message.
    async fn handle_payload(&mut self, payload: Vec<u8>) {
        let envelope: Envelope = match self.codec.decode(&payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(
                    topic = %self.topic,
                    error = %e,
                    "dropping undecodable message"
                );
                self.sink.report(RoomFault::Decode {
                    reason: e.to_string(),
                });
                return;
            }
        };

        let effects = reconcile::on_envelope(&mut self.peers, envelope);
        self.apply(effects).await;
    }

    /// Reconciles one link liveness event.
    async fn handle_link(&mut self, event: LinkEvent) {
        tracing::debug!(topic = %self.topic, ?event, "link event");
        let effects = reconcile::on_link(&mut self.peers, event);
        self.apply(effects).await;
    }

    /// Performs the side effects a reconciliation decision requested.
    ///
    /// Dials are spawned, not awaited: the peerlist fan-out must not
    /// serialize on slow peers, and one failed dial must not block the
    /// rest.
    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Publish(envelope) => self.broadcast(envelope).await,
                Effect::Connect(peer) => self.connector.dial(peer),
            }
        }
    }

    /// Encodes and publishes an envelope; failures are reported, not
    /// propagated.
    async fn broadcast(&self, envelope: Envelope) {
        let payload = match self.codec.encode(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                self.sink.report(RoomFault::Publish {
                    reason: e.to_string(),
                });
                return;
            }
        };
        if let Err(e) = self.transport.publish(&self.topic, payload).await {
            tracing::warn!(topic = %self.topic, error = %e, "publish failed");
            self.sink.report(RoomFault::Publish {
                reason: e.to_string(),
            });
        }
    }
}
