//! HTTP/WebSocket transport surface.
//!
//! Thin wrappers around the ingestion core:
//! - `POST /vitals`         — batch ingestion entrypoint
//! - `GET  /ws`             — observer join (WebSocket)
//! - `GET  /alerts`         — alert listing with filters
//! - `POST /alerts/:id/ack` — acknowledge an alert (broadcasts ALERT_ACK)
//! - `GET  /health`         — liveness probe
//! - `GET  /metrics`        — Prometheus text format

pub mod alerts;
pub mod health;
pub mod vitals;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::broadcast::ConnectionRegistry;
use crate::error::CoreError;
use crate::ingest::VitalsIngestService;
use crate::metrics::AppMetrics;
use crate::repository::VitalsRepository;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<VitalsIngestService>,
    pub repo: Arc<VitalsRepository>,
    pub registry: Arc<ConnectionRegistry>,
    pub metrics: Arc<AppMetrics>,
}

/// Map a core error to its transport outcome.
pub(crate) fn reject(err: CoreError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// Assemble the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(metrics_endpoint))
        .route("/vitals", post(vitals::ingest_vitals))
        .route("/ws", get(ws::ws_handler))
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/:id/ack", post(alerts::acknowledge_alert))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
