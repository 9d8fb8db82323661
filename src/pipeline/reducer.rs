//! Risk-state reducer: apply one insight to a patient record.
//!
//! Risk is overwritten unconditionally — no monotonic ratchet. A later LOW
//! reading legitimately downgrades a previous HIGH; whether a downgrade from
//! CRITICAL should require corroboration is an open clinical question, kept
//! as the source behavior on purpose.

use crate::models::{ClinicalInsight, Message, PatientRecord, VitalReading};

/// Merge an insight and its extracted vitals into the record, then append
/// the patient-facing SYSTEM reply through the same append path as the
/// gateway. Pure merge; no suspension, no failure modes.
///
/// Returns the appended SYSTEM reply so the caller can persist it.
pub fn apply(
    record: &mut PatientRecord,
    insight: ClinicalInsight,
    vitals: Vec<VitalReading>,
) -> Message {
    record.risk_status = insight.risk_level;
    record.flagged = insight.risk_level.is_elevated();

    let reply = Message::system(insight.suggested_response.clone());
    record.latest_insight = Some(insight);

    record.append_vitals(vitals);
    record.append_message(reply.clone());
    reply
}
