//! Per-patient feed subscription with idempotent merge and safe teardown.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::FeedHub;
use crate::ledger::{LedgerError, PatientLedger};
use crate::models::Message;

/// Handle for one active patient's feed merger task.
///
/// Teardown is idempotent: safe to call repeatedly, safe on a handle that
/// never carried a task, and runs automatically on drop.
pub struct FeedSubscription {
    patient_id: Uuid,
    task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    /// A handle with no running task (a subscription that never succeeded).
    pub fn inert(patient_id: Uuid) -> Self {
        Self {
            patient_id,
            task: None,
        }
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    /// Stop consuming the feed for this patient. Idempotent.
    pub fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(patient_id = %self.patient_id, "Realtime subscription torn down");
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Subscribe to the hub and merge this patient's INSERT events into the
/// ledger until torn down.
///
/// Events for other patients are ignored; the subscription is scoped to
/// exactly one active patient at a time.
pub fn subscribe(hub: &FeedHub, ledger: Arc<PatientLedger>, patient_id: Uuid) -> FeedSubscription {
    let mut rx = hub.subscribe();
    let task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if event.patient_id != patient_id {
                        continue;
                    }
                    on_insert(&ledger, patient_id, event.message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        patient_id = %patient_id,
                        skipped,
                        "Realtime feed lagged; events dropped"
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tracing::debug!(patient_id = %patient_id, "Realtime subscription established");
    FeedSubscription {
        patient_id,
        task: Some(task),
    }
}

/// Merge one feed row into the record. Duplicate ids (including echoes of
/// this process's own writes) are a no-op, not an error.
pub fn on_insert(ledger: &PatientLedger, patient_id: Uuid, message: Message) {
    let message_id = message.id;
    match ledger.update(patient_id, |record| record.merge_message(message)) {
        Ok(true) => {
            tracing::debug!(patient_id = %patient_id, message_id = %message_id, "Feed row merged");
        }
        Ok(false) => {
            tracing::trace!(
                patient_id = %patient_id,
                message_id = %message_id,
                "Feed row already present; discarded"
            );
        }
        Err(LedgerError::UnknownPatient(_)) => {
            // Row for a patient this session never provisioned. Nothing to
            // merge into; the durable store still has it.
            tracing::debug!(patient_id = %patient_id, "Feed row for unknown patient ignored");
        }
        Err(e) => {
            tracing::warn!(patient_id = %patient_id, error = %e, "Feed merge failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKind, PatientRecord, SenderRole};
    use crate::realtime::FeedEvent;
    use std::time::Duration;

    fn patient_message(content: &str) -> Message {
        Message::new(SenderRole::Patient, content, ContentKind::Text, None)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[test]
    fn on_insert_is_idempotent() {
        let ledger = PatientLedger::new();
        let id = ledger
            .register(PatientRecord::new("Kofi Mensah", 44, vec![]))
            .unwrap();
        let msg = patient_message("from the feed");

        on_insert(&ledger, id, msg.clone());
        on_insert(&ledger, id, msg.clone());
        on_insert(&ledger, id, msg);

        assert_eq!(ledger.snapshot(id).unwrap().messages.len(), 1);
    }

    #[test]
    fn on_insert_for_unknown_patient_is_noop() {
        let ledger = PatientLedger::new();
        on_insert(&ledger, Uuid::new_v4(), patient_message("orphan"));
    }

    #[test]
    fn duplicate_feed_events_around_local_append_keep_one_copy() {
        let ledger = PatientLedger::new();
        let id = ledger
            .register(PatientRecord::new("Kofi Mensah", 44, vec![]))
            .unwrap();
        let msg = patient_message("raced");

        // Feed delivery, then the local optimistic append of the same row,
        // then a second feed delivery.
        on_insert(&ledger, id, msg.clone());
        ledger
            .update(id, |record| record.merge_message(msg.clone()))
            .unwrap();
        on_insert(&ledger, id, msg);

        assert_eq!(ledger.snapshot(id).unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn subscription_merges_only_active_patient() {
        let hub = FeedHub::new();
        let ledger = Arc::new(PatientLedger::new());
        let active = ledger
            .register(PatientRecord::new("Kofi Mensah", 44, vec![]))
            .unwrap();
        let other = ledger
            .register(PatientRecord::new("Rosa Mendes", 71, vec![]))
            .unwrap();

        let _sub = subscribe(&hub, ledger.clone(), active);

        hub.publish(FeedEvent {
            patient_id: active,
            message: patient_message("for active"),
        });
        hub.publish(FeedEvent {
            patient_id: other,
            message: patient_message("for other"),
        });
        settle().await;

        assert_eq!(ledger.snapshot(active).unwrap().messages.len(), 1);
        assert_eq!(ledger.snapshot(other).unwrap().messages.len(), 0);
    }

    #[tokio::test]
    async fn redelivered_event_is_merged_once() {
        let hub = FeedHub::new();
        let ledger = Arc::new(PatientLedger::new());
        let id = ledger
            .register(PatientRecord::new("Kofi Mensah", 44, vec![]))
            .unwrap();

        let _sub = subscribe(&hub, ledger.clone(), id);

        let msg = patient_message("delivered twice");
        for _ in 0..2 {
            hub.publish(FeedEvent {
                patient_id: id,
                message: msg.clone(),
            });
        }
        settle().await;

        assert_eq!(ledger.snapshot(id).unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn teardown_stops_merging_and_is_idempotent() {
        let hub = FeedHub::new();
        let ledger = Arc::new(PatientLedger::new());
        let id = ledger
            .register(PatientRecord::new("Kofi Mensah", 44, vec![]))
            .unwrap();

        let mut sub = subscribe(&hub, ledger.clone(), id);
        sub.teardown();
        sub.teardown();
        settle().await;

        hub.publish(FeedEvent {
            patient_id: id,
            message: patient_message("after teardown"),
        });
        settle().await;

        assert_eq!(ledger.snapshot(id).unwrap().messages.len(), 0);
    }

    #[test]
    fn inert_subscription_teardown_is_safe() {
        let mut sub = FeedSubscription::inert(Uuid::new_v4());
        sub.teardown();
        sub.teardown();
    }
}
