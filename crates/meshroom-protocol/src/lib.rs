//! Wire protocol for Meshroom's discovery topic.
//!
//! This crate defines the messages peers exchange to find each other:
//!
//! - **Types** ([`Envelope`]) — the two announcement variants that travel
//!   on the topic.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how announcements are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while converting.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw topic payloads) and
//! the reconciliation engine (peer-set decisions). It knows nothing about
//! subscriptions or links — only how to serialize and deserialize
//! announcements.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Engine (peer set)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::Envelope;
