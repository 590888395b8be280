//! Connection registry and fan-out.
//!
//! [`ConnectionRegistry`] holds the set of live observer channels. The
//! transport layer registers one `mpsc::Sender<String>` per connected
//! client; the ingest service and the poller broadcast through the
//! [`Broadcaster`] trait. There is exactly one registry per process,
//! constructed in `main` and passed to whoever needs it.
//!
//! Delivery rules:
//! - a message is serialized once per broadcast call;
//! - each per-observer send is bounded by `send_timeout` so one stalled
//!   observer cannot block the rest;
//! - a failed or timed-out send unregisters that observer and is never
//!   surfaced to the broadcast caller;
//! - the observer map stays locked for the whole delivery phase, so any
//!   single observer sees broadcasts in call order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

use crate::messages::OutboundMessage;

/// Handle returned by `register`, used to unregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Fan-out seam used by the ingest service and the poller.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, message: &OutboundMessage);
}

pub struct ConnectionRegistry {
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<String>>>,
    next_id: AtomicU64,
    send_timeout: Duration,
}

impl ConnectionRegistry {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            send_timeout,
        }
    }

    /// Admit a new observer unconditionally.
    pub async fn register(&self, sender: mpsc::Sender<String>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().await.insert(id, sender);
        tracing::info!(observer = id.0, "observer connected");
        id
    }

    /// Remove an observer; unknown ids are ignored.
    pub async fn unregister(&self, id: ObserverId) {
        if self.observers.lock().await.remove(&id).is_some() {
            tracing::info!(observer = id.0, "observer disconnected");
        }
    }

    /// Drop every observer. Subsequent broadcasts are no-ops until new
    /// observers register.
    pub async fn disconnect_all(&self) {
        let mut observers = self.observers.lock().await;
        let dropped = observers.len();
        observers.clear();
        if dropped > 0 {
            tracing::info!(count = dropped, "all observers disconnected");
        }
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.lock().await.len()
    }
}

#[async_trait]
impl Broadcaster for ConnectionRegistry {
    async fn broadcast(&self, message: &OutboundMessage) {
        let mut observers = self.observers.lock().await;
        if observers.is_empty() {
            return;
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!("failed to serialize outbound message: {}", err);
                return;
            }
        };

        let mut failed: Vec<ObserverId> = Vec::new();
        for (&id, sender) in observers.iter() {
            match timeout(self.send_timeout, sender.send(text.clone())).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    tracing::warn!(observer = id.0, "observer channel closed, dropping");
                    failed.push(id);
                }
                Err(_) => {
                    tracing::warn!(observer = id.0, "observer send timed out, dropping");
                    failed.push(id);
                }
            }
        }

        for id in failed {
            observers.remove(&id);
        }
    }
}
