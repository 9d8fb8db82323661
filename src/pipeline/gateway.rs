//! Ingestion gateway: validate, stamp, append, decide the follow-up.
//!
//! The append is the optimistic update — it lands in the ledger before this
//! function returns, so readers see the message before any downstream
//! analysis completes. The follow-up decision is returned to the caller
//! rather than executed here, keeping persistence and analysis as separate
//! reactions to the append instead of inline continuations.

use uuid::Uuid;

use super::TriageError;
use crate::ledger::PatientLedger;
use crate::models::{ContentKind, Message, SenderRole};

/// What the service should do after an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Patient-authored text: run risk analysis with this digest.
    Analyze {
        message_text: String,
        history_context: String,
    },
    /// Patient-authored media: acknowledge after a bounded delay.
    AcknowledgeMedia,
    /// Doctor and system messages trigger nothing.
    None,
}

/// Accept one message event.
///
/// Stamps identity and time, appends to the record under the per-patient
/// lock, and returns the constructed message plus the follow-up decision.
/// Synchronous; never suspends.
pub fn submit(
    ledger: &PatientLedger,
    digest_vitals: usize,
    patient_id: Uuid,
    sender: SenderRole,
    content: &str,
    kind: ContentKind,
    file_name: Option<String>,
) -> Result<(Message, FollowUp), TriageError> {
    // Media kinds bypass the text-content constraint.
    if kind == ContentKind::Text && content.trim().is_empty() {
        return Err(TriageError::EmptyContent);
    }

    let message = Message::new(sender, content, kind, file_name);

    // Append and assemble the history digest in one critical section, so the
    // digest reflects the record exactly as of this submission.
    let history_context = ledger.update(patient_id, |record| {
        record.append_message(message.clone());
        record.history_digest(digest_vitals)
    })?;

    let follow_up = match (sender, kind) {
        (SenderRole::Patient, ContentKind::Text) => FollowUp::Analyze {
            message_text: message.content.clone(),
            history_context,
        },
        (SenderRole::Patient, _) => FollowUp::AcknowledgeMedia,
        _ => FollowUp::None,
    };

    Ok((message, follow_up))
}
