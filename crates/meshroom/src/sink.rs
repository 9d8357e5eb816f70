//! Fault reporting seam.
//!
//! Rooms report non-fatal incidents through an injected [`FaultSink`]
//! rather than a process-wide logger, so every instance can route its
//! faults independently (and tests can assert on them).

use tokio::sync::mpsc;

use crate::RoomFault;

/// Receives non-fatal fault reports from a running room.
pub trait FaultSink: Send + Sync + 'static {
    /// Called once per fault, from the room actor's task.
    fn report(&self, fault: RoomFault);
}

/// Default sink: emits each fault as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl FaultSink for LogSink {
    fn report(&self, fault: RoomFault) {
        tracing::warn!(%fault, "room fault");
    }
}

/// Forwards faults into an mpsc channel for programmatic consumption.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<RoomFault>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that observes its reports.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RoomFault>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl FaultSink for ChannelSink {
    fn report(&self, fault: RoomFault) {
        // The receiver may be gone; faults are best-effort by contract.
        let _ = self.sender.send(fault);
    }
}
