//! Batch ingestion endpoint.
//!
//! `POST /vitals` — accepts a non-empty ordered JSON array of readings
//! for one patient and returns the persisted records with assigned ids.
//! Error outcomes follow the core taxonomy: 404 unknown patient, 400
//! empty/cross-patient batch, 500 storage failure.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::model::{NewVital, VitalRecord};

use super::{reject, AppState};

pub async fn ingest_vitals(
    State(state): State<AppState>,
    Json(batch): Json<Vec<NewVital>>,
) -> Result<(StatusCode, Json<Vec<VitalRecord>>), (StatusCode, Json<serde_json::Value>)> {
    let saved = state.ingest.ingest_batch(batch).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(saved)))
}
