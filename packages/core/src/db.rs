//! SQLite pool construction and schema migration.
//!
//! `create_pool` is used both by `main.rs` (file-backed database) and by
//! tests (`sqlite::memory:`). The schema is applied on every startup with
//! `CREATE TABLE IF NOT EXISTS`, so a fresh in-memory pool is immediately
//! usable.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS patients (
    patient_id  TEXT PRIMARY KEY,
    full_name   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS thresholds (
    patient_id  TEXT PRIMARY KEY REFERENCES patients(patient_id),
    hr_max      INTEGER NOT NULL,
    spo2_min    REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS vitals (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id   TEXT NOT NULL,
    sensor_id    TEXT NOT NULL,
    timestamp    TEXT NOT NULL,
    heart_rate   INTEGER NOT NULL,
    spo2         REAL NOT NULL,
    systolic_bp  INTEGER NOT NULL,
    diastolic_bp INTEGER NOT NULL,
    body_temp    REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vitals_timestamp ON vitals(timestamp);
CREATE INDEX IF NOT EXISTS idx_vitals_patient ON vitals(patient_id);

CREATE TABLE IF NOT EXISTS alerts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id      TEXT NOT NULL,
    severity        TEXT NOT NULL,
    message         TEXT NOT NULL,
    timestamp       TEXT NOT NULL,
    is_acknowledged INTEGER NOT NULL DEFAULT 0,
    acknowledged_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_alerts_patient_ts ON alerts(patient_id, timestamp);
";

/// Create a connection pool and apply the schema.
///
/// `sqlite::memory:` keeps the whole database in a single shared
/// connection; a file URL gets created on first use.
pub async fn create_pool(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

    // In-memory databases vanish when their last connection closes, so
    // pin the pool to one connection there.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    // The schema string holds one statement per block; execute each
    // separately since prepared statements take a single statement.
    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement).execute(&pool).await?;
        }
    }

    Ok(pool)
}
