//! Peer membership and broadcast fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::envelope::{Envelope, PeerId};

/// The set of connected peers and the channels that reach them.
///
/// Each transport connection registers an outbound channel sender here and
/// gets a [`PeerId`] back. Broadcasts are best-effort: a peer whose channel
/// is closed or saturated is evicted from the set instead of stalling the
/// others.
pub struct SignalingHub {
    peers: RwLock<HashMap<PeerId, mpsc::Sender<String>>>,
    next_id: AtomicU64,
}

impl SignalingHub {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a connection and assign it a fresh identifier.
    pub async fn register(&self, sender: mpsc::Sender<String>) -> PeerId {
        let id = PeerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.peers.write().await.insert(id, sender);
        id
    }

    /// Remove a peer. Unknown identifiers are a no-op, so the disconnect
    /// path and broadcast eviction can race without harm.
    pub async fn unregister(&self, id: PeerId) {
        self.peers.write().await.remove(&id);
    }

    /// Number of currently registered peers.
    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Deliver an envelope to every registered peer except `exclude`.
    ///
    /// The envelope is serialized once and handed to each peer's channel
    /// without blocking. Peers that cannot take the message are unregistered
    /// after the delivery pass; failures are logged but never surfaced to
    /// the sender.
    pub async fn broadcast(&self, envelope: &Envelope, exclude: Option<PeerId>) {
        let text = envelope.to_text();

        let targets: Vec<(PeerId, mpsc::Sender<String>)> = {
            let peers = self.peers.read().await;
            peers
                .iter()
                .filter(|(id, _)| Some(**id) != exclude)
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut stale = Vec::new();
        for (id, tx) in targets {
            if let Err(e) = tx.try_send(text.clone()) {
                debug!("evicting peer {}: {}", id, e);
                stale.push(id);
            }
        }

        for id in stale {
            self.unregister(id).await;
        }
    }
}

impl Default for SignalingHub {
    fn default() -> Self {
        Self::new()
    }
}
