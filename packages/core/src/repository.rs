//! Database repository for patients, thresholds, vitals, and alerts.
//!
//! All SQLite read/write logic lives here. Writes that belong to one
//! ingestion batch go through the transaction-scoped functions
//! ([`insert_vital`], [`insert_alert`], [`has_unacked_critical_since`]),
//! which take a `&mut SqliteConnection` so the ingest service can run
//! them inside a single `BEGIN ... COMMIT`. Pool-scoped reads (poller
//! watermark fetch, alert listing, acknowledgement) are methods on
//! [`VitalsRepository`].
//!
//! Timestamps are stored as RFC 3339 strings in UTC, so lexicographic
//! comparison in SQL matches chronological order.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::model::{Alert, AlertDraft, NewVital, Severity, Threshold, VitalRecord};

/// Repository over the shared SQLite pool.
pub struct VitalsRepository {
    pool: SqlitePool,
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn vital_from_row(row: SqliteRow) -> Option<VitalRecord> {
    let timestamp: String = row.try_get("timestamp").ok()?;
    Some(VitalRecord {
        id: row.try_get("id").ok()?,
        patient_id: row.try_get("patient_id").ok()?,
        sensor_id: row.try_get("sensor_id").ok()?,
        timestamp: parse_ts(&timestamp)?,
        heart_rate: row.try_get("heart_rate").ok()?,
        spo2: row.try_get("spo2").ok()?,
        systolic_bp: row.try_get("systolic_bp").ok()?,
        diastolic_bp: row.try_get("diastolic_bp").ok()?,
        body_temp: row.try_get("body_temp").ok()?,
    })
}

fn alert_from_row(row: SqliteRow) -> Option<Alert> {
    let severity: String = row.try_get("severity").ok()?;
    let timestamp: String = row.try_get("timestamp").ok()?;
    let acknowledged: i64 = row.try_get("is_acknowledged").ok()?;
    let acknowledged_at: Option<String> = row.try_get("acknowledged_at").ok()?;
    Some(Alert {
        id: row.try_get("id").ok()?,
        patient_id: row.try_get("patient_id").ok()?,
        severity: severity.parse().ok()?,
        message: row.try_get("message").ok()?,
        timestamp: parse_ts(&timestamp)?,
        is_acknowledged: acknowledged != 0,
        acknowledged_at: acknowledged_at.as_deref().and_then(parse_ts),
    })
}

// ---- Transaction-scoped ingestion writes ----

/// `true` when the patient row exists.
pub async fn patient_exists(
    conn: &mut SqliteConnection,
    patient_id: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM patients WHERE patient_id = ?")
        .bind(patient_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

/// Fetch the active threshold for a patient, if one is configured.
pub async fn get_threshold(
    conn: &mut SqliteConnection,
    patient_id: &str,
) -> Result<Option<Threshold>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT patient_id, hr_max, spo2_min FROM thresholds WHERE patient_id = ?",
    )
    .bind(patient_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.and_then(|row| {
        Some(Threshold {
            patient_id: row.try_get("patient_id").ok()?,
            hr_max: row.try_get("hr_max").ok()?,
            spo2_min: row.try_get("spo2_min").ok()?,
        })
    }))
}

/// Insert one reading and return it with its generated id.
pub async fn insert_vital(
    conn: &mut SqliteConnection,
    vital: &NewVital,
) -> Result<VitalRecord, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO vitals
         (patient_id, sensor_id, timestamp, heart_rate, spo2, systolic_bp, diastolic_bp, body_temp)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&vital.patient_id)
    .bind(&vital.sensor_id)
    .bind(vital.timestamp.to_rfc3339())
    .bind(vital.heart_rate)
    .bind(vital.spo2)
    .bind(vital.systolic_bp)
    .bind(vital.diastolic_bp)
    .bind(vital.body_temp)
    .execute(conn)
    .await?;

    Ok(VitalRecord {
        id: result.last_insert_rowid(),
        patient_id: vital.patient_id.clone(),
        sensor_id: vital.sensor_id.clone(),
        timestamp: vital.timestamp,
        heart_rate: vital.heart_rate,
        spo2: vital.spo2,
        systolic_bp: vital.systolic_bp,
        diastolic_bp: vital.diastolic_bp,
        body_temp: vital.body_temp,
    })
}

/// Persist an alert draft and return the stored row.
pub async fn insert_alert(
    conn: &mut SqliteConnection,
    draft: &AlertDraft,
) -> Result<Alert, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO alerts (patient_id, severity, message, timestamp)
         VALUES (?, ?, ?, ?)",
    )
    .bind(&draft.patient_id)
    .bind(draft.severity.as_str())
    .bind(&draft.message)
    .bind(draft.timestamp.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(Alert {
        id: result.last_insert_rowid(),
        patient_id: draft.patient_id.clone(),
        severity: draft.severity,
        message: draft.message.clone(),
        timestamp: draft.timestamp,
        is_acknowledged: false,
        acknowledged_at: None,
    })
}

/// Deduplication check: does an unacknowledged critical alert exist for
/// this patient with a timestamp at or after `since`?
///
/// Run inside the ingestion transaction so alerts raised earlier in the
/// same batch are visible to later readings.
pub async fn has_unacked_critical_since(
    conn: &mut SqliteConnection,
    patient_id: &str,
    since: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT 1 FROM alerts
         WHERE patient_id = ?
           AND severity = 'critical'
           AND is_acknowledged = 0
           AND timestamp >= ?
         LIMIT 1",
    )
    .bind(patient_id)
    .bind(since.to_rfc3339())
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

// ---- Pool-scoped operations ----

impl VitalsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a transaction for one ingestion batch.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Register a patient. Used by seeding and tests; patient CRUD has no
    /// HTTP surface in this service.
    pub async fn insert_patient(
        &self,
        patient_id: &str,
        full_name: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO patients (patient_id, full_name, created_at) VALUES (?, ?, ?)",
        )
        .bind(patient_id)
        .bind(full_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace the single threshold row for a patient.
    pub async fn upsert_threshold(
        &self,
        patient_id: &str,
        hr_max: i64,
        spo2_min: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO thresholds (patient_id, hr_max, spo2_min) VALUES (?, ?, ?)
             ON CONFLICT(patient_id) DO UPDATE SET hr_max = excluded.hr_max,
                                                   spo2_min = excluded.spo2_min",
        )
        .bind(patient_id)
        .bind(hr_max)
        .bind(spo2_min)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch readings strictly newer than `watermark`, oldest first,
    /// bounded to `limit` rows. Drives the change poller.
    pub async fn fetch_vitals_after(
        &self,
        watermark: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<VitalRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, patient_id, sensor_id, timestamp, heart_rate, spo2,
                    systolic_bp, diastolic_bp, body_temp
             FROM vitals
             WHERE timestamp > ?
             ORDER BY timestamp ASC
             LIMIT ?",
        )
        .bind(watermark.to_rfc3339())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(vital_from_row).collect())
    }

    /// Fetch one alert by id.
    pub async fn get_alert(&self, id: i64) -> Result<Option<Alert>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, patient_id, severity, message, timestamp, is_acknowledged, acknowledged_at
             FROM alerts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(alert_from_row))
    }

    /// List alerts newest first with optional filters. `limit` is clamped
    /// to 100.
    pub async fn list_alerts(
        &self,
        limit: i64,
        severity: Option<Severity>,
        acknowledged: Option<bool>,
    ) -> Result<Vec<Alert>, sqlx::Error> {
        let limit = limit.clamp(1, 100);

        let mut conditions = vec!["1=1"];
        if severity.is_some() {
            conditions.push("severity = ?");
        }
        if acknowledged.is_some() {
            conditions.push("is_acknowledged = ?");
        }

        let sql = format!(
            "SELECT id, patient_id, severity, message, timestamp, is_acknowledged, acknowledged_at
             FROM alerts
             WHERE {}
             ORDER BY timestamp DESC
             LIMIT ?",
            conditions.join(" AND ")
        );

        let rows = {
            let mut q = sqlx::query(&sql);
            if let Some(sev) = severity {
                q = q.bind(sev.as_str());
            }
            if let Some(ack) = acknowledged {
                q = q.bind(if ack { 1i64 } else { 0i64 });
            }
            q.bind(limit).fetch_all(&self.pool).await?
        };

        Ok(rows.into_iter().filter_map(alert_from_row).collect())
    }

    /// Acknowledge an alert. The transition is one-way false→true and the
    /// first acknowledgement timestamp is preserved on repeat calls.
    /// Returns the updated row, or `None` when the id is unknown.
    pub async fn acknowledge_alert(&self, id: i64) -> Result<Option<Alert>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alerts
             SET is_acknowledged = 1,
                 acknowledged_at = COALESCE(acknowledged_at, ?)
             WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_alert(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::db::create_pool;

    async fn make_repo() -> VitalsRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        VitalsRepository::new(pool)
    }

    fn make_vital(patient_id: &str, seconds_ago: i64) -> NewVital {
        NewVital {
            patient_id: patient_id.to_string(),
            sensor_id: "sensor-1".to_string(),
            timestamp: Utc::now() - Duration::seconds(seconds_ago),
            heart_rate: 80,
            spo2: 97.0,
            systolic_bp: 120,
            diastolic_bp: 80,
            body_temp: 36.8,
        }
    }

    fn make_draft(patient_id: &str, severity: Severity, seconds_ago: i64) -> AlertDraft {
        AlertDraft {
            patient_id: patient_id.to_string(),
            severity,
            message: "test alert".to_string(),
            timestamp: Utc::now() - Duration::seconds(seconds_ago),
        }
    }

    #[tokio::test]
    async fn insert_vital_assigns_increasing_ids() {
        let repo = make_repo().await;
        let mut conn = repo.pool().acquire().await.unwrap();

        let first = insert_vital(&mut conn, &make_vital("p1", 10)).await.unwrap();
        let second = insert_vital(&mut conn, &make_vital("p1", 5)).await.unwrap();

        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn fetch_vitals_after_is_strictly_greater_and_ascending() {
        let repo = make_repo().await;
        let mut conn = repo.pool().acquire().await.unwrap();

        let old = make_vital("p1", 120);
        insert_vital(&mut conn, &old).await.unwrap();
        insert_vital(&mut conn, &make_vital("p1", 30)).await.unwrap();
        insert_vital(&mut conn, &make_vital("p1", 10)).await.unwrap();
        drop(conn);

        // Watermark exactly at the oldest row: that row is excluded.
        let fetched = repo.fetch_vitals_after(old.timestamp, 100).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert!(fetched[0].timestamp < fetched[1].timestamp);
    }

    #[tokio::test]
    async fn fetch_vitals_after_respects_limit() {
        let repo = make_repo().await;
        let mut conn = repo.pool().acquire().await.unwrap();
        for i in 0..5 {
            insert_vital(&mut conn, &make_vital("p1", 50 - i)).await.unwrap();
        }
        drop(conn);

        let watermark = Utc::now() - Duration::minutes(5);
        let fetched = repo.fetch_vitals_after(watermark, 3).await.unwrap();
        assert_eq!(fetched.len(), 3);
    }

    #[tokio::test]
    async fn threshold_upsert_keeps_one_row_per_patient() {
        let repo = make_repo().await;
        repo.insert_patient("p1", "Ada Lovelace").await.unwrap();
        repo.upsert_threshold("p1", 120, 92.0).await.unwrap();
        repo.upsert_threshold("p1", 130, 90.0).await.unwrap();

        let mut conn = repo.pool().acquire().await.unwrap();
        let threshold = get_threshold(&mut conn, "p1").await.unwrap().unwrap();
        assert_eq!(threshold.hr_max, 130);
        assert_eq!(threshold.spo2_min, 90.0);
    }

    #[tokio::test]
    async fn get_threshold_returns_none_when_unconfigured() {
        let repo = make_repo().await;
        let mut conn = repo.pool().acquire().await.unwrap();
        assert!(get_threshold(&mut conn, "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dedup_query_sees_uncommitted_alert_in_same_transaction() {
        let repo = make_repo().await;
        let mut tx = repo.begin().await.unwrap();

        let since = Utc::now() - Duration::minutes(1);
        assert!(!has_unacked_critical_since(&mut tx, "p1", since).await.unwrap());

        insert_alert(&mut tx, &make_draft("p1", Severity::Critical, 0))
            .await
            .unwrap();

        assert!(has_unacked_critical_since(&mut tx, "p1", since).await.unwrap());
        tx.rollback().await.unwrap();

        // Rolled back: nothing visible outside the transaction.
        let mut conn = repo.pool().acquire().await.unwrap();
        assert!(!has_unacked_critical_since(&mut conn, "p1", since).await.unwrap());
    }

    #[tokio::test]
    async fn dedup_query_ignores_warnings_and_acknowledged_criticals() {
        let repo = make_repo().await;
        let mut conn = repo.pool().acquire().await.unwrap();
        let since = Utc::now() - Duration::minutes(1);

        insert_alert(&mut conn, &make_draft("p1", Severity::Warning, 10))
            .await
            .unwrap();
        let critical = insert_alert(&mut conn, &make_draft("p1", Severity::Critical, 10))
            .await
            .unwrap();
        drop(conn);

        repo.acknowledge_alert(critical.id).await.unwrap();

        let mut conn = repo.pool().acquire().await.unwrap();
        assert!(!has_unacked_critical_since(&mut conn, "p1", since).await.unwrap());
    }

    #[tokio::test]
    async fn dedup_query_ignores_criticals_outside_window() {
        let repo = make_repo().await;
        let mut conn = repo.pool().acquire().await.unwrap();

        insert_alert(&mut conn, &make_draft("p1", Severity::Critical, 120))
            .await
            .unwrap();

        let since = Utc::now() - Duration::seconds(60);
        assert!(!has_unacked_critical_since(&mut conn, "p1", since).await.unwrap());
    }

    #[tokio::test]
    async fn acknowledge_alert_is_one_way_and_preserves_first_timestamp() {
        let repo = make_repo().await;
        let mut conn = repo.pool().acquire().await.unwrap();
        let alert = insert_alert(&mut conn, &make_draft("p1", Severity::Critical, 0))
            .await
            .unwrap();
        drop(conn);

        let first = repo.acknowledge_alert(alert.id).await.unwrap().unwrap();
        assert!(first.is_acknowledged);
        let first_ack_at = first.acknowledged_at.unwrap();

        let second = repo.acknowledge_alert(alert.id).await.unwrap().unwrap();
        assert!(second.is_acknowledged);
        assert_eq!(second.acknowledged_at.unwrap(), first_ack_at);
    }

    #[tokio::test]
    async fn acknowledge_alert_returns_none_for_unknown_id() {
        let repo = make_repo().await;
        assert!(repo.acknowledge_alert(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_alerts_filters_by_severity_and_ack_state() {
        let repo = make_repo().await;
        let mut conn = repo.pool().acquire().await.unwrap();
        insert_alert(&mut conn, &make_draft("p1", Severity::Warning, 30))
            .await
            .unwrap();
        let critical = insert_alert(&mut conn, &make_draft("p1", Severity::Critical, 20))
            .await
            .unwrap();
        insert_alert(&mut conn, &make_draft("p2", Severity::Critical, 10))
            .await
            .unwrap();
        drop(conn);

        repo.acknowledge_alert(critical.id).await.unwrap();

        let criticals = repo
            .list_alerts(20, Some(Severity::Critical), None)
            .await
            .unwrap();
        assert_eq!(criticals.len(), 2);
        // Newest first.
        assert!(criticals[0].timestamp > criticals[1].timestamp);

        let unacked = repo.list_alerts(20, None, Some(false)).await.unwrap();
        assert_eq!(unacked.len(), 2);

        let acked_criticals = repo
            .list_alerts(20, Some(Severity::Critical), Some(true))
            .await
            .unwrap();
        assert_eq!(acked_criticals.len(), 1);
        assert_eq!(acked_criticals[0].id, critical.id);
    }

    #[tokio::test]
    async fn patient_exists_reflects_inserts() {
        let repo = make_repo().await;
        repo.insert_patient("p1", "Grace Hopper").await.unwrap();

        let mut conn = repo.pool().acquire().await.unwrap();
        assert!(patient_exists(&mut conn, "p1").await.unwrap());
        assert!(!patient_exists(&mut conn, "p2").await.unwrap());
    }
}
