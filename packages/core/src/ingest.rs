//! Batch ingestion of vital-sign readings.
//!
//! One call to [`VitalsIngestService::ingest_batch`] is one unit of work:
//! resolve the patient and threshold, persist each reading in submission
//! order, evaluate it, persist any resulting alert, commit — and only
//! after the commit broadcast the per-reading and per-alert messages.
//! A storage failure anywhere rolls the whole batch back and nothing is
//! broadcast.

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::error::CoreError;
use crate::evaluator::{self, evaluate};
use crate::messages::OutboundMessage;
use crate::metrics::AppMetrics;
use crate::model::{NewVital, VitalRecord};
use crate::repository::{self, VitalsRepository};

pub struct VitalsIngestService {
    repo: Arc<VitalsRepository>,
    broadcaster: Arc<dyn Broadcaster>,
    metrics: Arc<AppMetrics>,
}

impl VitalsIngestService {
    pub fn new(
        repo: Arc<VitalsRepository>,
        broadcaster: Arc<dyn Broadcaster>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            repo,
            broadcaster,
            metrics,
        }
    }

    /// Ingest one batch of readings for a single patient.
    ///
    /// Returns the persisted readings with generated ids, in submission
    /// order. Alerts raised by reading *k* are visible to the dedup check
    /// for reading *k+1* because evaluation runs inside the same
    /// transaction as the inserts.
    pub async fn ingest_batch(
        &self,
        batch: Vec<NewVital>,
    ) -> Result<Vec<VitalRecord>, CoreError> {
        let patient_id = match batch.first() {
            Some(first) => first.patient_id.clone(),
            None => return Err(CoreError::invalid_input("empty batch")),
        };
        if batch.iter().any(|v| v.patient_id != patient_id) {
            return Err(CoreError::invalid_input(
                "all readings in a batch must belong to the same patient",
            ));
        }

        let mut tx = self.repo.begin().await?;

        if !repository::patient_exists(&mut tx, &patient_id).await? {
            return Err(CoreError::not_found(format!("patient {}", patient_id)));
        }
        let threshold = repository::get_threshold(&mut tx, &patient_id).await?;

        let mut saved = Vec::with_capacity(batch.len());
        let mut alerts = Vec::new();

        for item in &batch {
            let vital = repository::insert_vital(&mut tx, item).await?;

            let dedup_floor = vital.timestamp - evaluator::dedup_window();
            let has_recent = repository::has_unacked_critical_since(
                &mut tx,
                &patient_id,
                dedup_floor,
            )
            .await?;

            if let Some(draft) = evaluate(&vital, threshold.as_ref(), has_recent) {
                let alert = repository::insert_alert(&mut tx, &draft).await?;
                tracing::info!(
                    patient = %patient_id,
                    severity = alert.severity.as_str(),
                    alert = alert.id,
                    "alert raised"
                );
                alerts.push(alert);
            }

            saved.push(vital);
        }

        tx.commit().await?;

        self.metrics.readings_ingested.inc_by(saved.len() as u64);
        self.metrics.alerts_raised.inc_by(alerts.len() as u64);

        // Broadcast strictly after the durable commit.
        for vital in &saved {
            self.broadcaster
                .broadcast(&OutboundMessage::vital_update(vital))
                .await;
        }
        for alert in &alerts {
            self.broadcaster
                .broadcast(&OutboundMessage::alert_new(alert))
                .await;
        }
        self.metrics
            .broadcasts_sent
            .inc_by((saved.len() + alerts.len()) as u64);

        tracing::debug!(
            patient = %patient_id,
            readings = saved.len(),
            alerts = alerts.len(),
            "batch ingested"
        );

        Ok(saved)
    }
}
