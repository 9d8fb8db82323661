//! Durable message/vitals store with change-feed echo.
//!
//! Write-through is best effort: the caller treats every insert as
//! fire-and-forget and the in-memory record stays the session's source of
//! truth when the store is unreachable. Committed message rows are echoed
//! into the feed hub, which is how this process's own writes come back
//! through the realtime path.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::schema::init_schema;
use super::DatabaseError;
use crate::models::{ContentKind, Message, SenderRole, VitalReading, VitalType};
use crate::realtime::{FeedEvent, FeedHub};

pub struct TriageStore {
    conn: Mutex<Connection>,
    feed: Option<FeedHub>,
}

impl TriageStore {
    /// Open (and if needed create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed: None,
        })
    }

    /// In-memory store, used in tests and degraded sessions.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed: None,
        })
    }

    /// Echo committed message rows into the given hub.
    pub fn with_feed(mut self, feed: FeedHub) -> Self {
        self.feed = Some(feed);
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Insert one message row and echo it to the feed.
    pub fn insert_message(&self, patient_id: Uuid, message: &Message) -> Result<(), DatabaseError> {
        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO messages (id, patient_id, sender, content, type, file_name, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id.to_string(),
                    patient_id.to_string(),
                    message.sender.as_str(),
                    message.content,
                    message.kind.as_str(),
                    message.file_name,
                    message.timestamp,
                ],
            )?;
        }

        if let Some(feed) = &self.feed {
            feed.publish(FeedEvent {
                patient_id,
                message: message.clone(),
            });
        }
        Ok(())
    }

    /// Insert vital rows in one transaction.
    pub fn insert_vitals(
        &self,
        patient_id: Uuid,
        readings: &[VitalReading],
    ) -> Result<(), DatabaseError> {
        if readings.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO vitals (patient_id, type, value, unit, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for reading in readings {
                stmt.execute(params![
                    patient_id.to_string(),
                    reading.vital_type.as_str(),
                    reading.value,
                    reading.unit,
                    reading.recorded_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All stored messages for a patient in insertion order.
    pub fn fetch_messages(&self, patient_id: Uuid) -> Result<Vec<Message>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, sender, content, type, file_name, timestamp
             FROM messages WHERE patient_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![patient_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, chrono::NaiveDateTime>(5)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, sender, content, kind, file_name, timestamp) = row?;
            messages.push(Message {
                id: Uuid::parse_str(&id).map_err(|_| DatabaseError::InvalidEnum {
                    field: "id".into(),
                    value: id,
                })?,
                sender: SenderRole::from_str(&sender)?,
                content,
                kind: ContentKind::from_str(&kind)?,
                file_name,
                timestamp,
            });
        }
        Ok(messages)
    }

    /// All stored vitals for a patient in insertion order.
    pub fn fetch_vitals(&self, patient_id: Uuid) -> Result<Vec<VitalReading>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT type, value, unit, timestamp
             FROM vitals WHERE patient_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![patient_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, chrono::NaiveDateTime>(3)?,
            ))
        })?;

        let mut readings = Vec::new();
        for row in rows {
            let (kind, value, unit, recorded_at) = row?;
            let vital_type =
                VitalType::from_str(&kind).ok_or_else(|| DatabaseError::InvalidEnum {
                    field: "type".into(),
                    value: kind,
                })?;
            readings.push(VitalReading {
                vital_type,
                value,
                unit,
                recorded_at,
            });
        }
        Ok(readings)
    }

}

#[cfg(test)]
impl TriageStore {
    /// Drop the underlying tables so every subsequent insert fails,
    /// simulating a store that became unreachable mid-session.
    pub(crate) fn simulate_outage(&self) {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("DROP TABLE messages; DROP TABLE vitals;")
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKind, SenderRole};

    fn store() -> TriageStore {
        TriageStore::open_in_memory().unwrap()
    }

    fn text(content: &str) -> Message {
        Message::new(SenderRole::Patient, content, ContentKind::Text, None)
    }

    #[test]
    fn message_round_trip() {
        let store = store();
        let patient_id = Uuid::new_v4();
        let msg = Message::new(
            SenderRole::Doctor,
            "Please check your glucose tonight.",
            ContentKind::Text,
            None,
        );

        store.insert_message(patient_id, &msg).unwrap();
        let fetched = store.fetch_messages(patient_id).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, msg.id);
        assert_eq!(fetched[0].sender, SenderRole::Doctor);
        assert_eq!(fetched[0].content, msg.content);
    }

    #[test]
    fn messages_keep_insertion_order() {
        let store = store();
        let patient_id = Uuid::new_v4();
        for i in 0..5 {
            store.insert_message(patient_id, &text(&format!("m{i}"))).unwrap();
        }
        let fetched = store.fetch_messages(patient_id).unwrap();
        let contents: Vec<&str> = fetched.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn media_message_keeps_file_name() {
        let store = store();
        let patient_id = Uuid::new_v4();
        let msg = Message::new(
            SenderRole::Patient,
            "",
            ContentKind::Image,
            Some("rash.jpg".to_string()),
        );
        store.insert_message(patient_id, &msg).unwrap();
        let fetched = store.fetch_messages(patient_id).unwrap();
        assert_eq!(fetched[0].kind, ContentKind::Image);
        assert_eq!(fetched[0].file_name.as_deref(), Some("rash.jpg"));
    }

    #[test]
    fn duplicate_message_id_is_rejected_by_store() {
        let store = store();
        let patient_id = Uuid::new_v4();
        let msg = text("only once");
        store.insert_message(patient_id, &msg).unwrap();
        assert!(store.insert_message(patient_id, &msg).is_err());
    }

    #[test]
    fn vitals_round_trip_with_duplicates_retained() {
        let store = store();
        let patient_id = Uuid::new_v4();
        let reading = VitalReading::now(VitalType::Glucose, 220.0, "mg/dL");
        store
            .insert_vitals(patient_id, &[reading.clone(), reading])
            .unwrap();
        let fetched = store.fetch_vitals(patient_id).unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].vital_type, VitalType::Glucose);
        assert_eq!(fetched[0].value, 220.0);
    }

    #[test]
    fn insert_message_echoes_to_feed() {
        let hub = FeedHub::new();
        let mut rx = hub.subscribe();
        let store = TriageStore::open_in_memory().unwrap().with_feed(hub);

        let patient_id = Uuid::new_v4();
        let msg = text("echoed");
        store.insert_message(patient_id, &msg).unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.patient_id, patient_id);
        assert_eq!(event.message.id, msg.id);
    }

    #[test]
    fn fetches_are_scoped_per_patient() {
        let store = store();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.insert_message(a, &text("for a")).unwrap();
        assert_eq!(store.fetch_messages(a).unwrap().len(), 1);
        assert!(store.fetch_messages(b).unwrap().is_empty());
    }

    #[test]
    fn inserts_fail_cleanly_during_outage() {
        let store = store();
        store.simulate_outage();
        let result = store.insert_message(Uuid::new_v4(), &text("lost"));
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.db");
        let patient_id = Uuid::new_v4();
        let msg = text("durable");

        {
            let store = TriageStore::open(&path).unwrap();
            store.insert_message(patient_id, &msg).unwrap();
        }

        let reopened = TriageStore::open(&path).unwrap();
        let fetched = reopened.fetch_messages(patient_id).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, msg.id);
    }
}
