//! WebSocket client transport speaking to a [`Relay`](crate::Relay).
//!
//! One socket carries everything: topic subscriptions, published payloads,
//! dial requests and link events. A writer task owns the sink; a reader
//! task routes inbound frames to the right subscription, watcher, or
//! pending dial.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

use crate::wire::{ClientFrame, ServerFrame};
use crate::{
    DialPath, Identity, LinkEvent, LinkEvents, PeerId, PubSub, Subscription,
    Swarm, Topic, TransportError,
};

/// Client side of the relay transport; implements [`PubSub`], [`Swarm`]
/// and [`Identity`].
#[derive(Clone)]
pub struct WsTransport {
    inner: Arc<WsInner>,
}

struct WsInner {
    peer: PeerId,
    outbound: mpsc::UnboundedSender<ClientFrame>,
    topics: Mutex<HashMap<Topic, Vec<mpsc::UnboundedSender<Vec<u8>>>>>,
    watchers: Mutex<Vec<mpsc::UnboundedSender<LinkEvent>>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<(), String>>>>,
    next_seq: AtomicU64,
}

impl WsTransport {
    /// Connects to a relay and registers under `peer`.
    pub async fn connect(url: &str, peer: PeerId) -> Result<Self, TransportError> {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;
        let (mut sink, mut source) = ws.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let inner = Arc::new(WsInner {
            peer: peer.clone(),
            outbound,
            topics: Mutex::new(HashMap::new()),
            watchers: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
        });

        // Writer: queued frames → socket. The queue's only sender lives in
        // `WsInner`, so the loop ends once every transport clone is
        // dropped; closing the sink then runs the WebSocket close
        // handshake and the relay unregisters us.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode frame");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader: socket → routing tables. Holds only a weak reference so
        // it never keeps the transport (and thus the socket) alive.
        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(msg) = source.next().await {
                let Some(inner) = weak.upgrade() else { break };
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerFrame>(text.as_str()) {
                            Ok(frame) => route(&inner, frame),
                            Err(e) => tracing::warn!(
                                error = %e,
                                "dropping malformed relay frame"
                            ),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(error = %e, "relay connection lost");
                        break;
                    }
                }
            }
            if let Some(inner) = weak.upgrade() {
                disconnect(&inner);
            }
        });

        let hello = ClientFrame::Hello { peer };
        inner
            .outbound
            .send(hello)
            .map_err(|_| TransportError::ConnectionClosed("relay writer gone".into()))?;

        Ok(Self { inner })
    }

    /// Returns the peer id this transport registered under.
    pub fn local_id(&self) -> &PeerId {
        &self.inner.peer
    }

    fn send(&self, frame: ClientFrame) -> Result<(), TransportError> {
        self.inner
            .outbound
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed("relay connection closed".into()))
    }
}

/// Routes one inbound frame to its consumer.
fn route(inner: &WsInner, frame: ServerFrame) {
    match frame {
        ServerFrame::Message { topic, payload } => {
            let mut topics = inner.topics.lock().unwrap();
            if let Some(subscribers) = topics.get_mut(&topic) {
                subscribers.retain(|s| s.send(payload.clone()).is_ok());
            }
        }
        ServerFrame::LinkUp { peer } => notify(inner, LinkEvent::Joined(peer)),
        ServerFrame::LinkDown { peer } => notify(inner, LinkEvent::Left(peer)),
        ServerFrame::DialResult { seq, ok, error } => {
            if let Some(reply) = inner.pending.lock().unwrap().remove(&seq) {
                let result = if ok {
                    Ok(())
                } else {
                    Err(error.unwrap_or_else(|| "dial failed".into()))
                };
                let _ = reply.send(result);
            }
        }
    }
}

fn notify(inner: &WsInner, event: LinkEvent) {
    inner
        .watchers
        .lock()
        .unwrap()
        .retain(|w| w.send(event.clone()).is_ok());
}

/// Tears down routing state once the socket is gone. Closing the channels
/// makes every subscription and pending dial observe the disconnect.
fn disconnect(inner: &WsInner) {
    inner.topics.lock().unwrap().clear();
    inner.watchers.lock().unwrap().clear();
    inner.pending.lock().unwrap().clear();
}

impl PubSub for WsTransport {
    type Error = TransportError;

    async fn subscribe(&self, topic: &Topic) -> Result<Subscription, TransportError> {
        let (sender, subscription) = Subscription::channel();
        self.inner
            .topics
            .lock()
            .unwrap()
            .entry(topic.clone())
            .or_default()
            .push(sender);
        self.send(ClientFrame::Subscribe {
            topic: topic.clone(),
        })?;
        Ok(subscription)
    }

    async fn publish(&self, topic: &Topic, payload: Vec<u8>) -> Result<(), TransportError> {
        self.send(ClientFrame::Publish {
            topic: topic.clone(),
            payload,
        })
    }
}

impl Swarm for WsTransport {
    type Error = TransportError;

    async fn links(&self) -> Result<LinkEvents, TransportError> {
        let (sender, events) = LinkEvents::channel();
        self.inner.watchers.lock().unwrap().push(sender);
        Ok(events)
    }

    async fn connect(&self, peer: &PeerId, path: DialPath) -> Result<(), TransportError> {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner.pending.lock().unwrap().insert(seq, reply_tx);

        if let Err(e) = self.send(ClientFrame::Dial {
            seq,
            peer: peer.clone(),
            path,
        }) {
            self.inner.pending.lock().unwrap().remove(&seq);
            return Err(e);
        }

        match reply_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(TransportError::Rejected(reason)),
            Err(_) => Err(TransportError::ConnectionClosed(
                "relay connection closed".into(),
            )),
        }
    }
}

impl Identity for WsTransport {
    type Error = TransportError;

    async fn resolve(&self) -> Result<PeerId, TransportError> {
        Ok(self.inner.peer.clone())
    }
}
