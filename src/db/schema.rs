//! Durable store schema: two append-only tables.
//!
//! Rows are only ever inserted. The pipeline never updates or deletes a
//! message or vital row; the in-memory record is the session's source of
//! truth and the store is a best-effort write-through.

use rusqlite::Connection;

use super::DatabaseError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY,
    patient_id  TEXT NOT NULL,
    sender      TEXT NOT NULL,
    content     TEXT NOT NULL,
    type        TEXT NOT NULL,
    file_name   TEXT,
    timestamp   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_patient ON messages(patient_id);

CREATE TABLE IF NOT EXISTS vitals (
    patient_id  TEXT NOT NULL,
    type        TEXT NOT NULL,
    value       REAL NOT NULL,
    unit        TEXT NOT NULL,
    timestamp   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vitals_patient ON vitals(patient_id);
";

/// Create tables if they do not exist yet.
pub fn init_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_both_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('messages', 'vitals')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn init_schema_is_reentrant() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }
}
