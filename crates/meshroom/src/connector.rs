//! Dial executor: fire-and-forget link establishment.

use std::sync::Arc;
use std::time::Duration;

use meshroom_transport::{DialPath, PeerId, Swarm};

use crate::{FaultSink, RoomConfig, RoomFault};

/// Spawns one detached task per dial attempt.
///
/// Failures and timeouts are reported to the fault sink and otherwise
/// swallowed: the protocol retries implicitly through future announcements
/// and link events. Dedup lives in the caller's membership check, not
/// here — overlapping messages can legitimately dial the same peer twice,
/// and the transport must tolerate that.
pub(crate) struct Connector<S> {
    swarm: Arc<S>,
    sink: Arc<dyn FaultSink>,
    timeout: Option<Duration>,
    path: DialPath,
}

impl<S: Swarm> Connector<S> {
    pub(crate) fn new(
        swarm: Arc<S>,
        sink: Arc<dyn FaultSink>,
        config: &RoomConfig,
    ) -> Self {
        Self {
            swarm,
            sink,
            timeout: config.dial_timeout,
            path: config.dial_path,
        }
    }

    /// Starts a dial to `peer` without waiting for the outcome.
    pub(crate) fn dial(&self, peer: PeerId) {
        let swarm = Arc::clone(&self.swarm);
        let sink = Arc::clone(&self.sink);
        let timeout = self.timeout;
        let path = self.path;

        tokio::spawn(async move {
            let result = match timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, swarm.connect(&peer, path)).await {
                        Ok(result) => result.map_err(|e| e.to_string()),
                        Err(_) => Err(format!("timed out after {}ms", limit.as_millis())),
                    }
                }
                None => swarm.connect(&peer, path).await.map_err(|e| e.to_string()),
            };

            match result {
                Ok(()) => tracing::debug!(%peer, "dial succeeded"),
                Err(reason) => {
                    tracing::warn!(%peer, %reason, "dial failed");
                    sink.report(RoomFault::Connect { peer, reason });
                }
            }
        });
    }
}
