//! Domain types shared across the ingestion pipeline.
//!
//! A [`NewVital`] is what producers submit; a [`VitalRecord`] is the same
//! reading after persistence has assigned it a row id. Readings are
//! immutable facts — nothing in this crate mutates one after insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vital-sign reading as submitted by a producer (no id yet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVital {
    pub patient_id: String,
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: i64,
    pub spo2: f64,
    pub systolic_bp: i64,
    pub diastolic_bp: i64,
    pub body_temp: f64,
}

/// A persisted vital-sign reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalRecord {
    pub id: i64,
    pub patient_id: String,
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: i64,
    pub spo2: f64,
    pub systolic_bp: i64,
    pub diastolic_bp: i64,
    pub body_temp: f64,
}

/// Per-patient alerting bounds. At most one row per patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    pub patient_id: String,
    pub hr_max: i64,
    pub spo2_min: f64,
}

/// Alert severity. Serialized lowercase on the wire and in SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// An alert decision produced by the evaluator, not yet persisted.
#[derive(Debug, Clone)]
pub struct AlertDraft {
    pub patient_id: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A persisted alert row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub patient_id: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
}
