//! Alert listing and acknowledgement.
//!
//! Routes:
//! - `GET  /alerts`          — newest-first listing with optional filters
//! - `POST /alerts/:id/ack`  — flip `is_acknowledged` false→true and
//!   broadcast `ALERT_ACK` to all observers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::broadcast::Broadcaster;
use crate::messages::OutboundMessage;
use crate::model::{Alert, Severity};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    pub limit: Option<i64>,
    pub severity: Option<String>,
    pub acknowledged: Option<bool>,
}

/// `GET /alerts` — list alerts, newest first.
///
/// Query params:
/// - `limit`        — max items (default 20, clamped to 100)
/// - `severity`     — optional filter: warning | critical
/// - `acknowledged` — optional bool filter
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertListQuery>,
) -> Result<Json<Vec<Alert>>, (StatusCode, Json<serde_json::Value>)> {
    let severity = match params.severity.as_deref() {
        Some(raw) => Some(raw.parse::<Severity>().map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            )
        })?),
        None => None,
    };

    let alerts = state
        .repo
        .list_alerts(params.limit.unwrap_or(20), severity, params.acknowledged)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        })?;

    Ok(Json(alerts))
}

/// `POST /alerts/:id/ack` — acknowledge an alert.
///
/// Idempotent: the transition is one-way and a repeat call leaves the
/// original acknowledgement timestamp in place. The `ALERT_ACK` message
/// is broadcast only after the update is durable.
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, (StatusCode, Json<serde_json::Value>)> {
    let alert = state
        .repo
        .acknowledge_alert(id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Alert not found" })),
            )
        })?;

    state
        .registry
        .broadcast(&OutboundMessage::AlertAck { id: alert.id })
        .await;
    state.metrics.broadcasts_sent.inc();

    Ok(Json(alert))
}
