//! Integration tests for the discovery room over the in-memory hub.
//!
//! Rooms here are real actors on a real (in-process) transport; the tests
//! observe the topic through passive hub endpoints and the peer set
//! through room handles.

use std::time::Duration;

use meshroom::{
    ChannelSink, RoomConfig, RoomError, RoomFault, RoomHandle, RoomState,
    spawn_room, spawn_room_with_sink, RoomManager,
};
use meshroom_protocol::{Codec, Envelope, JsonCodec};
use meshroom_transport::{DialPath, MemoryHub, PeerId, PubSub, Subscription, Swarm, Topic};

fn peer(id: &str) -> PeerId {
    PeerId::new(id)
}

fn topic() -> Topic {
    Topic::new("mesh/test")
}

/// Lets in-flight messages and spawned dials complete.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Polls a room until its peer set matches `expected` (order-insensitive).
async fn wait_for_peers(room: &RoomHandle, expected: &[PeerId]) {
    let mut want: Vec<PeerId> = expected.to_vec();
    want.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    for _ in 0..40 {
        let mut peers = room.peers().await.unwrap();
        peers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        if peers == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("room {} never reached {want:?}", room.local_id());
}

/// Reads envelopes off a subscription until one matches the predicate.
async fn wait_for_envelope<F>(sub: &mut Subscription, mut matches: F) -> Envelope
where
    F: FnMut(&Envelope) -> bool,
{
    loop {
        let payload = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("timed out waiting for envelope")
            .expect("subscription closed");
        if let Ok(envelope) = JsonCodec.decode::<Envelope>(&payload) {
            if matches(&envelope) {
                return envelope;
            }
        }
    }
}

// =========================================================================
// Initialization and lifecycle
// =========================================================================

#[tokio::test]
async fn test_room_announces_itself_on_spawn() {
    let hub = MemoryHub::new();
    let observer = hub.endpoint_with_id(peer("QmObs"));
    let mut sub = observer.subscribe(&topic()).await.unwrap();

    let _room = spawn_room(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();

    let envelope = wait_for_envelope(&mut sub, |e| {
        matches!(e, Envelope::PeerJoined { .. })
    })
    .await;
    assert_eq!(envelope, Envelope::peer_joined(peer("QmS")));
}

#[tokio::test]
async fn test_own_announcement_echo_is_ignored() {
    let hub = MemoryHub::new();
    let (sink, mut faults) = ChannelSink::new();

    let room = spawn_room_with_sink(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
        sink,
    )
    .await
    .unwrap();
    settle().await;

    // The room decoded its own announcement (self-delivery) and dropped
    // it without mutation, reply, or fault.
    assert!(room.peers().await.unwrap().is_empty());
    assert!(faults.try_recv().is_err());

    let info = room.info().await.unwrap();
    assert_eq!(info.state, RoomState::Active);
    assert_eq!(info.peer_count, 0);
    assert_eq!(info.local, peer("QmS"));
}

#[tokio::test]
async fn test_shutdown_makes_handle_unavailable() {
    let hub = MemoryHub::new();
    let room = spawn_room(hub.endpoint(), topic(), RoomConfig::default())
        .await
        .unwrap();

    room.shutdown().await.unwrap();

    let result = room.broadcast(Envelope::peer_joined(peer("QmX"))).await;
    assert!(matches!(result, Err(RoomError::Unavailable(_))));
}

// =========================================================================
// peer-joined handling
// =========================================================================

#[tokio::test]
async fn test_peer_joined_gets_peerlist_reply_and_membership() {
    let hub = MemoryHub::new();
    let a = hub.endpoint_with_id(peer("QmA"));
    let b = hub.endpoint_with_id(peer("QmB"));
    let c = hub.endpoint_with_id(peer("QmC"));

    let room = spawn_room(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();
    settle().await;

    // Seed the room's set with A and B via their announcements.
    a.publish(&topic(), JsonCodec.encode(&Envelope::peer_joined(peer("QmA"))).unwrap())
        .await
        .unwrap();
    settle().await;
    b.publish(&topic(), JsonCodec.encode(&Envelope::peer_joined(peer("QmB"))).unwrap())
        .await
        .unwrap();
    wait_for_peers(&room, &[peer("QmA"), peer("QmB")]).await;

    // C announces; the reply must list everyone known before C was added.
    let mut sub_c = c.subscribe(&topic()).await.unwrap();
    settle().await;
    c.publish(&topic(), JsonCodec.encode(&Envelope::peer_joined(peer("QmC"))).unwrap())
        .await
        .unwrap();

    let reply = wait_for_envelope(&mut sub_c, |e| {
        matches!(e, Envelope::Peerlist { recipient, .. } if *recipient == peer("QmC"))
    })
    .await;
    assert_eq!(
        reply,
        Envelope::peerlist(peer("QmC"), vec![peer("QmA"), peer("QmB")])
    );

    wait_for_peers(&room, &[peer("QmA"), peer("QmB"), peer("QmC")]).await;
}

// =========================================================================
// peerlist handling
// =========================================================================

#[tokio::test]
async fn test_peerlist_fan_out_connects_to_each_listed_peer() {
    let hub = MemoryHub::new();
    let x = hub.endpoint_with_id(peer("QmX"));
    let _y = hub.endpoint_with_id(peer("QmY"));

    let room = spawn_room(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();
    settle().await;

    let mut links_x = x.links().await.unwrap();

    let list = Envelope::peerlist(
        peer("QmS"),
        vec![peer("QmS"), peer("QmX"), peer("QmY")],
    );
    x.publish(&topic(), JsonCodec.encode(&list).unwrap())
        .await
        .unwrap();

    wait_for_peers(&room, &[peer("QmX"), peer("QmY")]).await;

    // The dial actually reached X.
    let event = tokio::time::timeout(Duration::from_secs(1), links_x.recv())
        .await
        .expect("timed out waiting for link event")
        .expect("link stream closed");
    assert_eq!(event, meshroom_transport::LinkEvent::Joined(peer("QmS")));
}

#[tokio::test]
async fn test_singleton_peerlist_is_ignored() {
    let hub = MemoryHub::new();
    let observer = hub.endpoint_with_id(peer("QmObs"));

    let room = spawn_room(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();
    settle().await;

    let mirror = Envelope::peerlist(peer("QmS"), vec![peer("QmS")]);
    observer
        .publish(&topic(), JsonCodec.encode(&mirror).unwrap())
        .await
        .unwrap();
    settle().await;

    assert!(room.peers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_one_unreachable_peer_does_not_block_the_rest() {
    let hub = MemoryHub::new();
    let x = hub.endpoint_with_id(peer("QmX"));
    let _y = hub.endpoint_with_id(peer("QmY"));
    hub.set_reachable(x.id(), false);

    let (sink, mut faults) = ChannelSink::new();
    let room = spawn_room_with_sink(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
        sink,
    )
    .await
    .unwrap();
    settle().await;

    let list = Envelope::peerlist(
        peer("QmS"),
        vec![peer("QmS"), peer("QmX"), peer("QmY")],
    );
    x.publish(&topic(), JsonCodec.encode(&list).unwrap())
        .await
        .unwrap();

    // Both entries are adopted; only the dial to X fails.
    wait_for_peers(&room, &[peer("QmX"), peer("QmY")]).await;

    let fault = tokio::time::timeout(Duration::from_secs(2), faults.recv())
        .await
        .expect("timed out waiting for fault")
        .expect("sink closed");
    match fault {
        RoomFault::Connect { peer: failed, .. } => {
            assert_eq!(failed, peer("QmX"));
        }
        other => panic!("expected connect fault, got {other:?}"),
    }
}

// =========================================================================
// Link liveness
// =========================================================================

#[tokio::test]
async fn test_incoming_link_is_adopted_and_rebroadcast() {
    let hub = MemoryHub::new();
    let p = hub.endpoint_with_id(peer("QmP"));
    let mut sub_p = p.subscribe(&topic()).await.unwrap();

    let room = spawn_room(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();
    settle().await;

    // P dials the room directly; the room adopts the link and re-announces
    // P so indirectly-reachable peers learn about it.
    p.connect(&peer("QmS"), DialPath::Direct).await.unwrap();

    let rebroadcast = wait_for_envelope(&mut sub_p, |e| {
        matches!(e, Envelope::PeerJoined { peer: who } if *who == peer("QmP"))
    })
    .await;
    assert_eq!(rebroadcast, Envelope::peer_joined(peer("QmP")));

    wait_for_peers(&room, &[peer("QmP")]).await;
}

#[tokio::test]
async fn test_peer_leaving_is_removed_from_the_set() {
    let hub = MemoryHub::new();
    let p = hub.endpoint_with_id(peer("QmP"));

    let room = spawn_room(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();
    settle().await;

    p.connect(&peer("QmS"), DialPath::Direct).await.unwrap();
    wait_for_peers(&room, &[peer("QmP")]).await;

    hub.drop_peer(&peer("QmP"));
    wait_for_peers(&room, &[]).await;
}

// =========================================================================
// Decode robustness
// =========================================================================

#[tokio::test]
async fn test_malformed_message_reports_fault_without_mutation() {
    let hub = MemoryHub::new();
    let observer = hub.endpoint_with_id(peer("QmObs"));

    let (sink, mut faults) = ChannelSink::new();
    let room = spawn_room_with_sink(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
        sink,
    )
    .await
    .unwrap();
    settle().await;

    let mut sub = observer.subscribe(&topic()).await.unwrap();
    settle().await;
    observer
        .publish(&topic(), b"not an envelope".to_vec())
        .await
        .unwrap();
    settle().await;

    let fault = faults.try_recv().expect("expected a decode fault");
    assert!(matches!(fault, RoomFault::Decode { .. }));
    assert!(room.peers().await.unwrap().is_empty());

    // The room published nothing in response: the observer sees only the
    // garbage payload it sent itself.
    assert_eq!(sub.try_recv(), Some(b"not an envelope".to_vec()));
    assert!(sub.try_recv().is_none());
}

// =========================================================================
// Full-mesh convergence
// =========================================================================

#[tokio::test]
async fn test_three_rooms_converge_to_a_full_mesh() {
    let hub = MemoryHub::new();

    let room_a = spawn_room(
        hub.endpoint_with_id(peer("QmA")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();
    settle().await;

    let room_b = spawn_room(
        hub.endpoint_with_id(peer("QmB")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();
    settle().await;

    let room_c = spawn_room(
        hub.endpoint_with_id(peer("QmC")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();

    wait_for_peers(&room_a, &[peer("QmB"), peer("QmC")]).await;
    wait_for_peers(&room_b, &[peer("QmA"), peer("QmC")]).await;
    wait_for_peers(&room_c, &[peer("QmA"), peer("QmB")]).await;
}

// =========================================================================
// Embedder broadcast
// =========================================================================

#[tokio::test]
async fn test_handle_broadcast_publishes_on_the_topic() {
    let hub = MemoryHub::new();
    let observer = hub.endpoint_with_id(peer("QmObs"));
    let mut sub = observer.subscribe(&topic()).await.unwrap();

    let room = spawn_room(
        hub.endpoint_with_id(peer("QmS")),
        topic(),
        RoomConfig::default(),
    )
    .await
    .unwrap();
    settle().await;

    // Addressed to a third party, so the sender's own echo is ignored.
    let custom = Envelope::peerlist(peer("QmZ"), vec![peer("QmA"), peer("QmB")]);
    room.broadcast(custom.clone()).await.unwrap();

    let seen = wait_for_envelope(&mut sub, |e| {
        matches!(e, Envelope::Peerlist { recipient, .. } if *recipient == peer("QmZ"))
    })
    .await;
    assert_eq!(seen, custom);
}

// =========================================================================
// RoomManager
// =========================================================================

#[tokio::test]
async fn test_manager_enforces_one_room_per_topic() {
    let hub = MemoryHub::new();
    let mut manager =
        RoomManager::new(hub.endpoint_with_id(peer("QmS")), RoomConfig::default());

    manager.join(Topic::new("t1")).await.unwrap();
    let result = manager.join(Topic::new("t1")).await;
    assert!(matches!(result, Err(RoomError::AlreadyJoined(_))));

    manager.join(Topic::new("t2")).await.unwrap();
    assert_eq!(manager.room_count(), 2);

    let mut topics = manager.topics();
    topics.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(topics, vec![Topic::new("t1"), Topic::new("t2")]);
}

#[tokio::test]
async fn test_manager_leave_tears_the_room_down() {
    let hub = MemoryHub::new();
    let mut manager =
        RoomManager::new(hub.endpoint_with_id(peer("QmS")), RoomConfig::default());

    let handle = manager.join(Topic::new("t1")).await.unwrap();
    manager.leave(&Topic::new("t1")).await.unwrap();

    assert!(manager.room(&Topic::new("t1")).is_none());
    let result = handle.peers().await;
    assert!(matches!(result, Err(RoomError::Unavailable(_))));

    let result = manager.leave(&Topic::new("t1")).await;
    assert!(matches!(result, Err(RoomError::NotJoined(_))));
}

#[tokio::test]
async fn test_manager_shutdown_all() {
    let hub = MemoryHub::new();
    let mut manager =
        RoomManager::new(hub.endpoint_with_id(peer("QmS")), RoomConfig::default());

    manager.join(Topic::new("t1")).await.unwrap();
    manager.join(Topic::new("t2")).await.unwrap();

    manager.shutdown_all().await;
    assert_eq!(manager.room_count(), 0);
}
