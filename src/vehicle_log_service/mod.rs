//! VehicleLogService - Vehicle count persistence
//!
//! ## Responsibilities
//!
//! - Own the `vehicle_logs` table (schema bootstrap)
//! - Append entries with a persistence-time timestamp
//! - Latest / history queries, newest first
//! - Clear all entries
//!
//! Shared by the polling orchestrator and the web API; SQLite serializes
//! writes.

use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

/// Default number of rows returned by history queries
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// One row of `vehicle_logs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VehicleLogEntry {
    pub id: i64,
    pub camera_id: i64,
    pub count: i64,
    /// ISO-8601 UTC, millisecond precision
    pub timestamp: String,
}

/// Vehicle log store
#[derive(Clone)]
pub struct VehicleLogService {
    pool: SqlitePool,
}

impl VehicleLogService {
    /// Create service over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database file at `path`
    pub async fn connect(path: &Path) -> Result<SqlitePool> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        Ok(pool)
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the `vehicle_logs` table if it does not exist
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vehicle_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                camera_id INTEGER NOT NULL,
                count INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Liveness check
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Append an entry stamped with the current time
    pub async fn insert(&self, camera_id: i64, count: i64) -> Result<VehicleLogEntry> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let result = sqlx::query(
            "INSERT INTO vehicle_logs (camera_id, count, timestamp) VALUES (?, ?, ?)",
        )
        .bind(camera_id)
        .bind(count)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        Ok(VehicleLogEntry {
            id: result.last_insert_rowid(),
            camera_id,
            count,
            timestamp,
        })
    }

    /// Most recent entry, if any
    pub async fn latest(&self) -> Result<Option<VehicleLogEntry>> {
        let entry = sqlx::query_as::<_, VehicleLogEntry>(
            r#"
            SELECT id, camera_id, count, timestamp
            FROM vehicle_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Up to `limit` most recent entries, newest first
    pub async fn history(&self, limit: u32) -> Result<Vec<VehicleLogEntry>> {
        let entries = sqlx::query_as::<_, VehicleLogEntry>(
            r#"
            SELECT id, camera_id, count, timestamp
            FROM vehicle_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Delete every entry; returns the number of rows removed
    pub async fn clear_all(&self) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM vehicle_logs")
            .execute(&self.pool)
            .await?
            .rows_affected();

        // sqlite_sequence only exists after the first AUTOINCREMENT insert
        if let Err(e) = sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'vehicle_logs'")
            .execute(&self.pool)
            .await
        {
            tracing::warn!(error = %e, "Failed to reset vehicle_logs id sequence");
        }

        tracing::info!(deleted = deleted, "Vehicle log history cleared");

        Ok(deleted)
    }

    /// In-memory store with schema, for tests
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Self {
        // one long-lived connection: every sqlite::memory: connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let service = Self::new(pool);
        service.init_schema().await.unwrap();
        service
    }
}
