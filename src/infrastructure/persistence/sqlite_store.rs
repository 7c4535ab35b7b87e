use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::domain::entities::event::ServiceEvent;
use crate::domain::ports::store::{EventStore, StoreError};

use super::migrations;

/// SQLite-backed persistent event log.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    /// Create a new `SQLite` store at the given path.
    ///
    /// Expands `~`, creates parent directories, opens connection,
    /// sets WAL mode and pragmas, and initializes schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if the database cannot be opened or initialized.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let expanded = shellexpand::tilde(path);
        let db_path = PathBuf::from(expanded.as_ref());

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        }

        let conn =
            Connection::open(&db_path).map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database. Nothing survives the process.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if the schema cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::initialize_schema(&conn)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn save(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        conn.execute(
            "INSERT INTO service_events \
             (service, event_type, success, recorded_at, timestamp, message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.service_name(),
                event.kind().as_str(),
                event.success(),
                event.timestamp().timestamp_micros(),
                event.timestamp().to_rfc3339(),
                event.message(),
            ],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        drop(conn);
        Ok(())
    }

    async fn failures_since(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;

        let mut stmt = conn
            .prepare(
                "SELECT recorded_at FROM service_events \
                 WHERE service = ?1 AND event_type = 'failure' AND recorded_at >= ?2 \
                 ORDER BY recorded_at ASC",
            )
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![service, since.timestamp_micros()], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let mut failures = Vec::new();
        for row in rows {
            let micros = row.map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            let ts = DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| StoreError::ReadFailed(format!("invalid timestamp {micros}")))?;
            failures.push(ts);
        }
        Ok(failures)
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        let removed = conn
            .execute(
                "DELETE FROM service_events WHERE recorded_at < ?1",
                params![cutoff.timestamp_micros()],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        drop(conn);
        Ok(removed as u64)
    }
}
