//! Room manager: one discovery room per topic over a shared transport.

use std::collections::HashMap;

use meshroom_transport::{Identity, PubSub, Swarm, Topic};

use crate::room::{RoomHandle, spawn_room};
use crate::{RoomConfig, RoomError};

/// Tracks at most one room per topic.
///
/// Rooms spawned here share one transport value (cloned per room) and one
/// configuration. This is the entry point for embedders that participate
/// in several discovery topics at once.
pub struct RoomManager<T> {
    transport: T,
    config: RoomConfig,
    rooms: HashMap<Topic, RoomHandle>,
}

impl<T> RoomManager<T>
where
    T: PubSub + Swarm + Identity + Clone,
{
    /// Creates a manager over `transport`.
    pub fn new(transport: T, config: RoomConfig) -> Self {
        Self {
            transport,
            config,
            rooms: HashMap::new(),
        }
    }

    /// Joins a discovery room on `topic`.
    ///
    /// Enforces the one-room-per-topic invariant.
    pub async fn join(&mut self, topic: Topic) -> Result<RoomHandle, RoomError> {
        if self.rooms.contains_key(&topic) {
            return Err(RoomError::AlreadyJoined(topic));
        }

        let handle = spawn_room(
            self.transport.clone(),
            topic.clone(),
            self.config.clone(),
        )
        .await?;
        self.rooms.insert(topic, handle.clone());
        Ok(handle)
    }

    /// Leaves the room on `topic`, tearing its actor down.
    pub async fn leave(&mut self, topic: &Topic) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(topic)
            .ok_or_else(|| RoomError::NotJoined(topic.clone()))?;
        handle.shutdown().await
    }

    /// Returns the handle for `topic`, if joined.
    pub fn room(&self, topic: &Topic) -> Option<RoomHandle> {
        self.rooms.get(topic).cloned()
    }

    /// Lists the currently joined topics.
    pub fn topics(&self) -> Vec<Topic> {
        self.rooms.keys().cloned().collect()
    }

    /// Returns the number of joined rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Tears down every room. Rooms that already stopped are skipped.
    pub async fn shutdown_all(&mut self) {
        for (topic, handle) in self.rooms.drain() {
            if let Err(e) = handle.shutdown().await {
                tracing::debug!(%topic, error = %e, "room already gone");
            }
        }
    }
}
