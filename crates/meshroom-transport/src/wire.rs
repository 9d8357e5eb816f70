//! JSON control frames spoken between [`WsTransport`](crate::WsTransport)
//! and [`Relay`](crate::Relay).
//!
//! Payload bytes are opaque to the relay and travel base64-encoded inside
//! the JSON frame.

use serde::{Deserialize, Serialize};

use crate::{DialPath, PeerId, Topic};

/// Frames sent by a client to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub(crate) enum ClientFrame {
    /// First frame on every connection: registers the peer id.
    Hello { peer: PeerId },

    /// Adds the client to a topic's subscriber set.
    Subscribe { topic: Topic },

    /// Fans `payload` out to every subscriber of `topic`, sender included.
    Publish {
        topic: Topic,
        #[serde(with = "b64")]
        payload: Vec<u8>,
    },

    /// Requests a link to `peer`. Answered with a `dial-result` carrying
    /// the same `seq`.
    Dial {
        seq: u64,
        peer: PeerId,
        path: DialPath,
    },
}

/// Frames sent by the relay to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ev", rename_all = "kebab-case")]
pub(crate) enum ServerFrame {
    /// A payload published on a subscribed topic.
    Message {
        topic: Topic,
        #[serde(with = "b64")]
        payload: Vec<u8>,
    },

    /// A direct link to `peer` came up.
    LinkUp { peer: PeerId },

    /// The direct link to `peer` went down.
    LinkDown { peer: PeerId },

    /// Outcome of a `dial` request.
    DialResult {
        seq: u64,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

mod b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &[u8],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}
