use crate::PeerId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection to the relay or peer was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket layer reported an error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// No peer with this identifier is registered.
    #[error("no peer {0} registered")]
    UnknownPeer(PeerId),

    /// The peer is registered but cannot be dialed.
    #[error("peer {0} is unreachable")]
    Unreachable(PeerId),

    /// The remote side rejected a dial request.
    #[error("dial rejected: {0}")]
    Rejected(String),

    /// A relay frame could not be parsed.
    #[error("malformed frame: {0}")]
    Frame(String),
}
