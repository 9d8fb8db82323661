use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::RiskLevel;
use super::insight::ClinicalInsight;
use super::message::Message;
use super::vital_sign::VitalReading;

/// The shared patient record both asynchronous sources write to.
///
/// Mutated only under the per-patient lock in [`crate::ledger::PatientLedger`].
/// The message sequence is append-only and never reordered; the vitals
/// sequence is append-only and timestamp-sortable but not required to be
/// globally sorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    pub conditions: Vec<String>,
    /// Weak reference to the supervising clinician, not ownership.
    pub doctor_id: Option<Uuid>,
    pub messages: Vec<Message>,
    pub vitals: Vec<VitalReading>,
    pub risk_status: RiskLevel,
    /// Invariant: true iff `risk_status` is HIGH or CRITICAL.
    pub flagged: bool,
    pub latest_insight: Option<ClinicalInsight>,
    pub last_interaction: NaiveDateTime,
}

impl PatientRecord {
    pub fn new(name: impl Into<String>, age: u32, conditions: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            age,
            conditions,
            doctor_id: None,
            messages: Vec::new(),
            vitals: Vec::new(),
            risk_status: RiskLevel::Low,
            flagged: false,
            latest_insight: None,
            last_interaction: Utc::now().naive_utc(),
        }
    }

    /// Append a message and bump `last_interaction`. The single append path
    /// for both the gateway and the reducer's SYSTEM replies.
    pub fn append_message(&mut self, message: Message) {
        self.last_interaction = message.timestamp;
        self.messages.push(message);
    }

    pub fn contains_message(&self, id: Uuid) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Idempotent append used when merging the realtime change feed.
    /// Returns false (no-op) if a message with this id is already present.
    pub fn merge_message(&mut self, message: Message) -> bool {
        if self.contains_message(message.id) {
            return false;
        }
        self.append_message(message);
        true
    }

    /// Append readings without touching existing entries. No deduplication:
    /// repeated identical readings are all retained.
    pub fn append_vitals(&mut self, readings: Vec<VitalReading>) {
        self.vitals.extend(readings);
    }

    /// Compact digest handed to the analysis collaborator: age, known
    /// conditions, and the last few vitals.
    pub fn history_digest(&self, max_vitals: usize) -> String {
        let conditions = if self.conditions.is_empty() {
            "none on record".to_string()
        } else {
            self.conditions.join(", ")
        };

        let recent: Vec<String> = self
            .vitals
            .iter()
            .rev()
            .take(max_vitals)
            .map(|v| format!("{} {} {}", v.vital_type.as_str(), v.value, v.unit))
            .collect();
        let vitals = if recent.is_empty() {
            "none recorded".to_string()
        } else {
            recent.join("; ")
        };

        format!(
            "Age {}. Known conditions: {}. Recent vitals: {}.",
            self.age, conditions, vitals
        )
    }
}
