//! Three nodes meet on a discovery topic through a relay and converge to
//! a full mesh.
//!
//! The relay runs in-process, but every node talks to it over a real
//! WebSocket — the same wiring works across machines by pointing
//! `WsTransport::connect` at a remote relay URL.

use std::time::Duration;

use meshroom::{RoomConfig, RoomHandle, spawn_room};
use meshroom_transport::{PeerId, Relay, Topic, WsTransport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let relay = Relay::bind("127.0.0.1:0").await?;
    let url = format!("ws://{}", relay.local_addr()?);
    tokio::spawn(relay.run());
    tracing::info!(%url, "relay up");

    let topic = Topic::new("mesh/demo");
    let mut rooms: Vec<RoomHandle> = Vec::new();
    for _ in 0..3 {
        let transport = WsTransport::connect(&url, PeerId::random()).await?;
        let room =
            spawn_room(transport, topic.clone(), RoomConfig::default()).await?;
        tracing::info!(peer = %room.local_id(), "node joined the topic");
        rooms.push(room);
        // Stagger the joins so the discovery chatter is easy to follow
        // in the logs.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // Let announcements, peerlist replies, and dials settle.
    tokio::time::sleep(Duration::from_secs(1)).await;

    for room in &rooms {
        let mut peers = room.peers().await?;
        peers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        println!(
            "{} sees {} peers: {}",
            room.local_id(),
            peers.len(),
            peers
                .iter()
                .map(PeerId::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        );
    }

    for room in &rooms {
        room.shutdown().await?;
    }
    Ok(())
}
