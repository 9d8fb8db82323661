//! Triage service: wires the gateway and reducer to the async reactions.
//!
//! `submit` performs the optimistic append synchronously, then every side
//! effect (persistence, analysis, acknowledgment) is a separately spawned
//! reaction, so failure in one never affects another. Collaborator failure
//! of any shape lands as the deterministic fallback insight — nothing in
//! this pipeline is permitted to be fatal to the session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::analysis::{AnalysisOutcome, TriageAnalyzer};
use crate::config::TriageConfig;
use crate::db::TriageStore;
use crate::ledger::PatientLedger;
use crate::models::{ContentKind, Message, PatientRecord, SenderRole, VitalReading};
use crate::pipeline::gateway::{self, FollowUp};
use crate::pipeline::{reducer, TriageError};
use crate::realtime::{subscription, FeedHub, FeedSubscription};

/// SYSTEM acknowledgment for media messages, which bypass analysis.
const MEDIA_ACK_TEXT: &str =
    "Received your attachment. Your care team will review it shortly.";

/// One session's triage pipeline.
///
/// Construct once, share via `Arc`. Methods that spawn reactions take
/// `&Arc<Self>` and must run inside a tokio runtime.
pub struct TriageService {
    ledger: Arc<PatientLedger>,
    analyzer: Arc<dyn TriageAnalyzer>,
    store: Arc<TriageStore>,
    feed: FeedHub,
    config: TriageConfig,
    /// The single active patient's feed subscription.
    active: Mutex<Option<FeedSubscription>>,
}

impl TriageService {
    /// Build the service. The store is wired to echo committed message rows
    /// into this service's feed hub.
    pub fn new(
        config: TriageConfig,
        analyzer: Arc<dyn TriageAnalyzer>,
        store: TriageStore,
    ) -> Arc<Self> {
        let feed = FeedHub::new();
        Arc::new(Self {
            ledger: Arc::new(PatientLedger::new()),
            analyzer,
            store: Arc::new(store.with_feed(feed.clone())),
            feed,
            config,
            active: Mutex::new(None),
        })
    }

    /// Provision a record for this session.
    pub fn register_patient(&self, record: PatientRecord) -> Result<Uuid, TriageError> {
        Ok(self.ledger.register(record)?)
    }

    /// Cloned snapshot of a patient record.
    pub fn patient(&self, patient_id: Uuid) -> Result<PatientRecord, TriageError> {
        Ok(self.ledger.snapshot(patient_id)?)
    }

    pub fn patient_ids(&self) -> Vec<Uuid> {
        self.ledger.patient_ids()
    }

    /// The change-feed hub. External deployments bridge their remote feed
    /// into this hub; the store's own write echoes already flow through it.
    pub fn feed(&self) -> &FeedHub {
        &self.feed
    }

    /// The durable store backing this session.
    pub fn store(&self) -> &TriageStore {
        &self.store
    }

    // ── Ingestion ───────────────────────────────────────────

    /// Accept a message. Returns the stamped message synchronously; the
    /// append is visible to readers before this returns. Persistence and
    /// (for patient text) analysis are fire-and-forget reactions.
    pub fn submit(
        self: &Arc<Self>,
        patient_id: Uuid,
        sender: SenderRole,
        content: &str,
        kind: ContentKind,
        file_name: Option<String>,
    ) -> Result<Message, TriageError> {
        let (message, follow_up) = gateway::submit(
            &self.ledger,
            self.config.digest_vitals,
            patient_id,
            sender,
            content,
            kind,
            file_name,
        )?;

        self.spawn_persist_message(patient_id, message.clone());

        match follow_up {
            FollowUp::Analyze {
                message_text,
                history_context,
            } => self.spawn_analysis(patient_id, message_text, history_context),
            FollowUp::AcknowledgeMedia => self.spawn_media_ack(patient_id),
            FollowUp::None => {}
        }

        Ok(message)
    }

    // ── Analysis reaction ───────────────────────────────────

    fn spawn_analysis(self: &Arc<Self>, patient_id: Uuid, message_text: String, history: String) {
        let service = self.clone();
        tokio::spawn(async move {
            let outcome = service.run_analysis(message_text, history).await;
            let AnalysisOutcome { insight, vitals } = outcome;
            let vitals_for_store = vitals.clone();
            let risk = insight.risk_level;

            match service
                .ledger
                .update(patient_id, move |record| reducer::apply(record, insight, vitals))
            {
                Ok(reply) => {
                    tracing::info!(patient_id = %patient_id, risk = %risk.as_str(), "Insight applied");
                    service.spawn_persist_message(patient_id, reply);
                    service.spawn_persist_vitals(patient_id, vitals_for_store);
                }
                Err(e) => {
                    tracing::warn!(patient_id = %patient_id, error = %e, "Insight discarded; record unavailable");
                }
            }
        });
    }

    /// Run the collaborator off the runtime under the configured deadline.
    /// Every failure shape degrades to the deterministic fallback.
    async fn run_analysis(&self, message: String, history: String) -> AnalysisOutcome {
        let analyzer = self.analyzer.clone();
        let deadline = Duration::from_secs(self.config.analysis_timeout_secs);
        let call = tokio::task::spawn_blocking(move || analyzer.analyze(&message, &history));

        match tokio::time::timeout(deadline, call).await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Analysis failed; using fallback insight");
                AnalysisOutcome::fallback()
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Analysis task panicked; using fallback insight");
                AnalysisOutcome::fallback()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.analysis_timeout_secs,
                    "Analysis timed out; using fallback insight"
                );
                AnalysisOutcome::fallback()
            }
        }
    }

    // ── Media acknowledgment reaction ───────────────────────

    fn spawn_media_ack(self: &Arc<Self>, patient_id: Uuid) {
        let service = self.clone();
        let delay = Duration::from_millis(self.config.media_ack_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let ack = Message::system(MEDIA_ACK_TEXT);
            let appended = {
                let ack = ack.clone();
                service
                    .ledger
                    .update(patient_id, move |record| record.append_message(ack))
            };
            match appended {
                Ok(()) => service.spawn_persist_message(patient_id, ack),
                Err(e) => {
                    tracing::warn!(patient_id = %patient_id, error = %e, "Media ack discarded");
                }
            }
        });
    }

    // ── Persistence reactions (fire-and-forget) ─────────────

    fn spawn_persist_message(&self, patient_id: Uuid, message: Message) {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.insert_message(patient_id, &message) {
                tracing::warn!(
                    patient_id = %patient_id,
                    message_id = %message.id,
                    error = %e,
                    "Message write-through failed; session state remains authoritative"
                );
            }
        });
    }

    fn spawn_persist_vitals(&self, patient_id: Uuid, readings: Vec<VitalReading>) {
        if readings.is_empty() {
            return;
        }
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.insert_vitals(patient_id, &readings) {
                tracing::warn!(
                    patient_id = %patient_id,
                    count = readings.len(),
                    error = %e,
                    "Vitals write-through failed; session state remains authoritative"
                );
            }
        });
    }

    // ── Active-patient realtime subscription ────────────────

    /// Subscribe the realtime feed to this patient, tearing down the prior
    /// patient's subscription first. Idempotent for the same patient.
    ///
    /// After subscribing, the record is reconciled against the store so rows
    /// written while this patient was inactive (or lost to feed lag) are
    /// merged back in. Subscribe-then-reconcile: a row that lands between
    /// the two steps is seen twice and deduplicated, never missed.
    pub fn set_active_patient(self: &Arc<Self>, patient_id: Uuid) -> Result<(), TriageError> {
        if !self.ledger.contains(patient_id) {
            return Err(TriageError::UnknownPatient(patient_id));
        }

        {
            let mut active = self
                .active
                .lock()
                .map_err(|e| TriageError::Internal(e.to_string()))?;

            if let Some(current) = active.as_ref() {
                if current.patient_id() == patient_id {
                    return Ok(());
                }
            }
            if let Some(mut previous) = active.take() {
                previous.teardown();
            }
            *active = Some(subscription::subscribe(
                &self.feed,
                self.ledger.clone(),
                patient_id,
            ));
        }

        self.reconcile_from_store(patient_id);
        Ok(())
    }

    /// Merge stored message rows this record is missing, in stored insertion
    /// order. Read failure is non-fatal: the session continues on in-memory
    /// state, same as a write failure.
    fn reconcile_from_store(&self, patient_id: Uuid) {
        match self.store.fetch_messages(patient_id) {
            Ok(rows) => {
                let merged = self.ledger.update(patient_id, |record| {
                    rows.into_iter()
                        .filter(|row| record.merge_message(row.clone()))
                        .count()
                });
                if let Ok(merged) = merged {
                    if merged > 0 {
                        tracing::info!(
                            patient_id = %patient_id,
                            merged,
                            "Stored rows reconciled into record"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    patient_id = %patient_id,
                    error = %e,
                    "Store read-back failed; session state remains authoritative"
                );
            }
        }
    }

    /// Tear down the active subscription, if any. Safe to call repeatedly.
    pub fn clear_active_patient(&self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(mut subscription) = active.take() {
                subscription.teardown();
            }
        }
    }

    pub fn active_patient(&self) -> Option<Uuid> {
        self.active
            .lock()
            .ok()
            .and_then(|active| active.as_ref().map(|s| s.patient_id()))
    }
}
