//! Meshroom: peer discovery and mesh connectivity over a pub/sub topic.
//!
//! Peers announce themselves on a shared topic, exchange known-peer
//! lists, and proactively dial every other participant, converging a
//! star or chain of partial connectivity into a full mesh. The crate is
//! a library component: it is handed a transport (pub/sub + dialing +
//! identity, see `meshroom-transport`) and a topic, and runs the
//! reconciliation protocol as an isolated actor task.
//!
//! # Layout
//!
//! - [`peers`] — the de-duplicated, self-excluding peer set.
//! - [`reconcile`] — pure reconciliation decisions (message/event in,
//!   effects out).
//! - [`spawn_room`] / [`RoomHandle`] — the actor that owns the set and
//!   performs the effects, and the handle embedders hold.
//! - [`RoomManager`] — one room per topic over a shared transport.
//!
//! # Example
//!
//! ```rust
//! use meshroom::{RoomConfig, spawn_room};
//! use meshroom_transport::{MemoryHub, Topic};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), meshroom::RoomError> {
//! let hub = MemoryHub::new();
//! let room = spawn_room(
//!     hub.endpoint(),
//!     Topic::new("mesh/lobby"),
//!     RoomConfig::default(),
//! )
//! .await?;
//!
//! println!("announced as {}", room.local_id());
//! room.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connector;
mod error;
mod manager;
pub mod peers;
pub mod reconcile;
mod room;
mod sink;

pub use config::{RoomConfig, RoomState};
pub use error::{RoomError, RoomFault};
pub use manager::RoomManager;
pub use peers::PeerSet;
pub use reconcile::Effect;
pub use room::{RoomHandle, RoomInfo, spawn_room, spawn_room_with_sink};
pub use sink::{ChannelSink, FaultSink, LogSink};
