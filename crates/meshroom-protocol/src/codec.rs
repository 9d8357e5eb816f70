//! Codec trait and implementations for serializing/deserializing
//! announcements.
//!
//! The discovery engine doesn't care how envelopes become bytes — it only
//! needs something implementing [`Codec`]. [`JsonCodec`] is the default
//! (and the interop format); a binary codec can be slotted in without
//! touching the engine.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode values to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the engine's actor task owns the codec
/// and may run on any runtime thread. `decode` takes `DeserializeOwned` so
/// the input buffer can be dropped immediately after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type. The engine treats
    /// this as a droppable message, never a crash.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is the format other implementations of the discovery protocol
/// speak, so it is the default. Behind the `json` feature (enabled by
/// default).
///
/// ## Example
///
/// ```rust
/// use meshroom_protocol::{Codec, Envelope, JsonCodec};
/// use meshroom_transport::PeerId;
///
/// let codec = JsonCodec;
/// let envelope = Envelope::peer_joined(PeerId::new("QmA"));
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
