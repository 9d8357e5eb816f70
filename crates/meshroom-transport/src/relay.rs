//! Topic relay server over WebSocket, using `tokio-tungstenite`.
//!
//! The relay is the rendezvous point for [`WsTransport`](crate::WsTransport)
//! clients. It fans published payloads out to every subscriber of a topic
//! (sender included, matching pub/sub self-delivery) and keeps the link
//! table that backs dial requests and link up/down notifications.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::wire::{ClientFrame, ServerFrame};
use crate::{PeerId, Topic, TransportError};

/// A WebSocket relay that serves [`WsTransport`](crate::WsTransport)
/// clients.
pub struct Relay {
    listener: TcpListener,
    state: Arc<RelayState>,
}

#[derive(Default)]
struct RelayState {
    /// Outbound frame channel per registered client.
    clients: Mutex<HashMap<PeerId, mpsc::UnboundedSender<ServerFrame>>>,
    /// Subscriber sets per topic.
    topics: Mutex<HashMap<Topic, HashSet<PeerId>>>,
    /// Established links, stored symmetrically.
    links: Mutex<HashMap<PeerId, HashSet<PeerId>>>,
}

impl Relay {
    /// Binds the relay to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "relay listening");
        Ok(Self {
            listener,
            state: Arc::default(),
        })
    }

    /// Returns the bound socket address. Lets tests and demos bind port 0
    /// and discover the real port.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }

    /// Runs the accept loop. Each client gets its own task.
    pub async fn run(self) -> Result<(), TransportError> {
        loop {
            let (stream, addr) = self
                .listener
                .accept()
                .await
                .map_err(TransportError::AcceptFailed)?;
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(e) = serve_client(stream, state).await {
                    tracing::debug!(%addr, error = %e, "relay client ended");
                }
            });
        }
    }
}

/// Serves one client connection from hello to disconnect.
async fn serve_client(
    stream: TcpStream,
    state: Arc<RelayState>,
) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| TransportError::WebSocket(e.to_string()))?;
    let (mut sink, mut source) = ws.split();

    // First frame must be a hello carrying the peer id.
    let peer = loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => match decode_frame(text.as_str()) {
                Ok(ClientFrame::Hello { peer }) => break peer,
                Ok(_) => {
                    return Err(TransportError::Frame(
                        "first frame must be hello".into(),
                    ));
                }
                Err(e) => return Err(e),
            },
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::ConnectionClosed(
                    "closed before hello".into(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::WebSocket(e.to_string())),
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.clients.lock().unwrap().insert(peer.clone(), tx);
    tracing::info!(%peer, "relay client registered");

    let result = loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => break Err(TransportError::Frame(e.to_string())),
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    break Err(TransportError::WebSocket(e.to_string()));
                }
            }
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => match decode_frame(text.as_str()) {
                    Ok(frame) => handle_frame(&state, &peer, frame),
                    // A malformed frame is dropped, not fatal to the client.
                    Err(e) => tracing::warn!(%peer, error = %e, "dropping frame"),
                },
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(TransportError::WebSocket(e.to_string())),
            }
        }
    };

    unregister(&state, &peer);
    tracing::info!(%peer, "relay client unregistered");
    result
}

fn decode_frame(text: &str) -> Result<ClientFrame, TransportError> {
    serde_json::from_str(text).map_err(|e| TransportError::Frame(e.to_string()))
}

/// Applies one client frame to the relay state.
fn handle_frame(state: &RelayState, peer: &PeerId, frame: ClientFrame) {
    match frame {
        ClientFrame::Hello { .. } => {
            tracing::debug!(%peer, "ignoring repeated hello");
        }

        ClientFrame::Subscribe { topic } => {
            state
                .topics
                .lock()
                .unwrap()
                .entry(topic)
                .or_default()
                .insert(peer.clone());
        }

        ClientFrame::Publish { topic, payload } => {
            let subscribers: Vec<PeerId> = state
                .topics
                .lock()
                .unwrap()
                .get(&topic)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();

            let clients = state.clients.lock().unwrap();
            for subscriber in subscribers {
                if let Some(tx) = clients.get(&subscriber) {
                    let _ = tx.send(ServerFrame::Message {
                        topic: topic.clone(),
                        payload: payload.clone(),
                    });
                }
            }
        }

        ClientFrame::Dial { seq, peer: target, path: _ } => {
            let registered =
                state.clients.lock().unwrap().contains_key(&target);
            if !registered {
                send_to(
                    state,
                    peer,
                    ServerFrame::DialResult {
                        seq,
                        ok: false,
                        error: Some(format!("no peer {target} registered")),
                    },
                );
                return;
            }

            let newly = state
                .links
                .lock()
                .unwrap()
                .entry(peer.clone())
                .or_default()
                .insert(target.clone());
            if newly {
                state
                    .links
                    .lock()
                    .unwrap()
                    .entry(target.clone())
                    .or_default()
                    .insert(peer.clone());
                send_to(state, peer, ServerFrame::LinkUp { peer: target.clone() });
                send_to(state, &target, ServerFrame::LinkUp { peer: peer.clone() });
            }
            send_to(state, peer, ServerFrame::DialResult { seq, ok: true, error: None });
        }
    }
}

/// Queues a frame for one client; silently drops if it is gone.
fn send_to(state: &RelayState, peer: &PeerId, frame: ServerFrame) {
    if let Some(tx) = state.clients.lock().unwrap().get(peer) {
        let _ = tx.send(frame);
    }
}

/// Removes a disconnected client and reports the link loss to partners.
fn unregister(state: &RelayState, peer: &PeerId) {
    state.clients.lock().unwrap().remove(peer);

    {
        let mut topics = state.topics.lock().unwrap();
        for subscribers in topics.values_mut() {
            subscribers.remove(peer);
        }
    }

    let partners = state.links.lock().unwrap().remove(peer);
    if let Some(partners) = partners {
        for partner in partners {
            if let Some(back) = state.links.lock().unwrap().get_mut(&partner) {
                back.remove(peer);
            }
            send_to(state, &partner, ServerFrame::LinkDown { peer: peer.clone() });
        }
    }
}
