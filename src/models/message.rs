use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ContentKind, SenderRole};

/// A single chat message on a patient's channel.
///
/// Immutable after creation. The id is the sole deduplication key used when
/// reconciling the realtime change feed against local appends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: SenderRole,
    pub content: String,
    pub kind: ContentKind,
    pub file_name: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl Message {
    /// Construct a message with a fresh id and current timestamp.
    pub fn new(
        sender: SenderRole,
        content: impl Into<String>,
        kind: ContentKind,
        file_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            content: content.into(),
            kind,
            file_name,
            timestamp: Utc::now().naive_utc(),
        }
    }

    /// A SYSTEM text message, used for triage replies and acknowledgments.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SenderRole::System, content, ContentKind::Text, None)
    }
}
