use rusqlite::Connection;

/// Initialize the database schema, creating tables if they don't exist.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS service_events (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            service      TEXT    NOT NULL,
            event_type   TEXT    NOT NULL,
            success      INTEGER NOT NULL,
            recorded_at  INTEGER NOT NULL,
            timestamp    TEXT    NOT NULL,
            message      TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_service_events_lookup
            ON service_events(service, event_type, recorded_at);
        CREATE INDEX IF NOT EXISTS idx_service_events_recorded_at
            ON service_events(recorded_at);",
    )?;
    Ok(())
}
