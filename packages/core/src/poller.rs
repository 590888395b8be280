//! Background change poller.
//!
//! Alternate ingestion path for deployments where producers write vitals
//! straight into storage instead of calling the ingest API. The poller
//! periodically fetches rows newer than a watermark and pushes one
//! batched `vitals_update` message through the same registry the ingest
//! path uses. It performs no alert evaluation — only the ingest path can
//! do that — so it is disabled by default (`POLLER_ENABLED`).
//!
//! Lifecycle is Stopped → Running → Stopped: `start` is a no-op on a
//! running poller, `stop` cancels the in-flight wait and returns only
//! once the loop has exited.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

use crate::broadcast::Broadcaster;
use crate::messages::OutboundMessage;
use crate::metrics::AppMetrics;
use crate::repository::VitalsRepository;

/// How far back the watermark starts on poller startup.
const LOOKBACK_SECONDS: i64 = 60;

/// Rows fetched per cycle.
const PAGE_SIZE: i64 = 100;

struct RunningPoller {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct VitalsPoller {
    repo: Arc<VitalsRepository>,
    broadcaster: Arc<dyn Broadcaster>,
    metrics: Arc<AppMetrics>,
    poll_interval: Duration,
    running: Mutex<Option<RunningPoller>>,
}

impl VitalsPoller {
    pub fn new(
        repo: Arc<VitalsRepository>,
        broadcaster: Arc<dyn Broadcaster>,
        metrics: Arc<AppMetrics>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            repo,
            broadcaster,
            metrics,
            poll_interval,
            running: Mutex::new(None),
        }
    }

    /// Start the polling loop. No-op when already running.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::debug!("poller already running, start ignored");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let repo = self.repo.clone();
        let broadcaster = self.broadcaster.clone();
        let metrics = self.metrics.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut watermark = Utc::now() - ChronoDuration::seconds(LOOKBACK_SECONDS);
            let mut interval = time::interval(poll_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        poll_once(&repo, &broadcaster, &metrics, &mut watermark).await;
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }
            tracing::info!("vitals poller stopped");
        });

        *running = Some(RunningPoller {
            shutdown: shutdown_tx,
            handle,
        });
        tracing::info!(interval = ?self.poll_interval, "vitals poller started");
    }

    /// Stop the polling loop and wait for it to exit. No cycle runs after
    /// this returns. No-op when already stopped.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        if let Some(running) = running {
            let _ = running.shutdown.send(true);
            if let Err(err) = running.handle.await {
                tracing::error!("poller task join failed: {}", err);
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

/// Execute one poll cycle. Extracted for testability.
///
/// Storage errors are logged and leave the watermark untouched — the next
/// cycle retries the same window, which at worst redelivers rows that
/// consumers key by reading id.
async fn poll_once(
    repo: &VitalsRepository,
    broadcaster: &Arc<dyn Broadcaster>,
    metrics: &AppMetrics,
    watermark: &mut DateTime<Utc>,
) {
    metrics.poll_cycles.inc();

    let vitals = match repo.fetch_vitals_after(*watermark, PAGE_SIZE).await {
        Ok(vitals) => vitals,
        Err(err) => {
            metrics.poll_errors.inc();
            tracing::error!("poll cycle failed, keeping watermark: {}", err);
            return;
        }
    };

    if vitals.is_empty() {
        return;
    }

    if let Some(max_ts) = vitals.iter().map(|v| v.timestamp).max() {
        *watermark = max_ts;
    }

    let count = vitals.len();
    broadcaster
        .broadcast(&OutboundMessage::vitals_batch(vitals))
        .await;
    metrics.broadcasts_sent.inc();
    tracing::debug!(count, "broadcast batched vitals update");
}
