//! Per-patient keyed record store.
//!
//! Two independent asynchronous sources (the local ingestion→analysis chain
//! and the realtime change feed) write to the same `PatientRecord`. Every
//! read-modify-write goes through `update`, which holds the per-patient
//! mutex for the duration of the closure, so concurrent updates cannot be
//! computed from a stale snapshot and lost. Critical sections are short and
//! never held across awaits; readers take cloned snapshots.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use uuid::Uuid;

use crate::models::PatientRecord;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unknown patient: {0}")]
    UnknownPatient(Uuid),

    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

/// Keyed store of patient records, one lock per patient.
pub struct PatientLedger {
    records: RwLock<HashMap<Uuid, Arc<Mutex<PatientRecord>>>>,
}

impl PatientLedger {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Register a record at provisioning time. Returns the patient id.
    pub fn register(&self, record: PatientRecord) -> Result<Uuid, LedgerError> {
        let id = record.id;
        let mut map = self.records.write().map_err(|_| LedgerError::LockPoisoned)?;
        map.insert(id, Arc::new(Mutex::new(record)));
        Ok(id)
    }

    pub fn contains(&self, patient_id: Uuid) -> bool {
        self.records
            .read()
            .map(|map| map.contains_key(&patient_id))
            .unwrap_or(false)
    }

    /// All registered patient ids (unordered).
    pub fn patient_ids(&self) -> Vec<Uuid> {
        self.records
            .read()
            .map(|map| map.keys().copied().collect())
            .unwrap_or_default()
    }

    fn slot(&self, patient_id: Uuid) -> Result<Arc<Mutex<PatientRecord>>, LedgerError> {
        let map = self.records.read().map_err(|_| LedgerError::LockPoisoned)?;
        map.get(&patient_id)
            .cloned()
            .ok_or(LedgerError::UnknownPatient(patient_id))
    }

    /// Run a read-modify-write atomically under the per-patient lock.
    pub fn update<R>(
        &self,
        patient_id: Uuid,
        f: impl FnOnce(&mut PatientRecord) -> R,
    ) -> Result<R, LedgerError> {
        let slot = self.slot(patient_id)?;
        let mut record = slot.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(f(&mut record))
    }

    /// Cloned snapshot for readers, so no caller holds the lock across awaits.
    pub fn snapshot(&self, patient_id: Uuid) -> Result<PatientRecord, LedgerError> {
        self.update(patient_id, |record| record.clone())
    }
}

impl Default for PatientLedger {
    fn default() -> Self {
        Self::new()
    }
}
