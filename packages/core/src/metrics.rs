//! Prometheus metrics registry for the vitals monitor.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it to
//! the ingest service, the poller, and the WebSocket handler.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format.

use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

pub struct AppMetrics {
    /// Total vital-sign readings persisted through the ingest path.
    pub readings_ingested: IntCounter,
    /// Total alerts raised by the evaluator and persisted.
    pub alerts_raised: IntCounter,
    /// Total broadcast calls made to the connection registry.
    pub broadcasts_sent: IntCounter,
    /// Total poll cycles executed by the change poller.
    pub poll_cycles: IntCounter,
    /// Total poll cycles that failed on a storage error.
    pub poll_errors: IntCounter,
    /// Observers currently registered.
    pub observers_connected: IntGauge,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let readings_ingested = IntCounter::with_opts(Opts::new(
            "readings_ingested_total",
            "Vital-sign readings persisted via the ingest path",
        ))
        .expect("valid metric opts");
        let alerts_raised = IntCounter::with_opts(Opts::new(
            "alerts_raised_total",
            "Alerts raised by threshold evaluation",
        ))
        .expect("valid metric opts");
        let broadcasts_sent = IntCounter::with_opts(Opts::new(
            "broadcasts_sent_total",
            "Broadcast calls made to the connection registry",
        ))
        .expect("valid metric opts");
        let poll_cycles = IntCounter::with_opts(Opts::new(
            "poll_cycles_total",
            "Change-poller cycles executed",
        ))
        .expect("valid metric opts");
        let poll_errors = IntCounter::with_opts(Opts::new(
            "poll_errors_total",
            "Change-poller cycles that failed on storage errors",
        ))
        .expect("valid metric opts");
        let observers_connected = IntGauge::with_opts(Opts::new(
            "observers_connected",
            "Currently registered observer connections",
        ))
        .expect("valid metric opts");

        for metric in [
            &readings_ingested,
            &alerts_raised,
            &broadcasts_sent,
            &poll_cycles,
            &poll_errors,
        ] {
            registry
                .register(Box::new(metric.clone()))
                .expect("metric registers once");
        }
        registry
            .register(Box::new(observers_connected.clone()))
            .expect("metric registers once");

        Self {
            readings_ingested,
            alerts_raised,
            broadcasts_sent,
            poll_cycles,
            poll_errors,
            observers_connected,
            registry,
        }
    }

    /// Render all metrics in text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("failed to encode metrics: {}", err);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}
