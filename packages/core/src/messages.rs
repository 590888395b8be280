//! Outbound message shapes delivered to observers.
//!
//! Every message is JSON with a `type` discriminator; consumers ignore
//! unknown types. `VITAL_UPDATE` / `ALERT_NEW` / `ALERT_ACK` come from the
//! ingestion path, `vitals_update` is the poller's batched shape.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Alert, Severity, VitalRecord};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "VITAL_UPDATE")]
    VitalUpdate { data: VitalUpdateData },

    #[serde(rename = "ALERT_NEW")]
    AlertNew { data: AlertNewData },

    #[serde(rename = "ALERT_ACK")]
    AlertAck { id: i64 },

    #[serde(rename = "vitals_update")]
    VitalsBatch {
        count: usize,
        data: Vec<VitalRecord>,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct VitalUpdateData {
    pub patient_id: String,
    pub heart_rate: i64,
    pub spo2: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertNewData {
    pub alert_id: i64,
    pub patient_id: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn vital_update(vital: &VitalRecord) -> Self {
        Self::VitalUpdate {
            data: VitalUpdateData {
                patient_id: vital.patient_id.clone(),
                heart_rate: vital.heart_rate,
                spo2: vital.spo2,
                timestamp: vital.timestamp,
            },
        }
    }

    pub fn alert_new(alert: &Alert) -> Self {
        Self::AlertNew {
            data: AlertNewData {
                alert_id: alert.id,
                patient_id: alert.patient_id.clone(),
                severity: alert.severity,
                message: alert.message.clone(),
                timestamp: alert.timestamp,
            },
        }
    }

    pub fn vitals_batch(vitals: Vec<VitalRecord>) -> Self {
        Self::VitalsBatch {
            count: vitals.len(),
            data: vitals,
            timestamp: Utc::now(),
        }
    }
}
