//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding announcements.
///
/// Decode failures are recoverable by construction: the engine reports
/// them and drops the offending message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an envelope into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed payload, missing variant tag,
    /// or fields of the wrong type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
