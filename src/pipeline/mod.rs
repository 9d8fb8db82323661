//! Pipeline core: ingestion gateway and risk-state reducer.
//!
//! Both halves are pure with respect to the runtime — they validate,
//! construct, and merge, but never suspend. [`crate::service::TriageService`]
//! wires them to the async reactions (analysis, acknowledgment, persistence).

pub mod gateway;
pub mod reducer;

use thiserror::Error;
use uuid::Uuid;

use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Unknown patient: {0}")]
    UnknownPatient(Uuid),

    #[error("Text messages require non-empty content")]
    EmptyContent,

    #[error("Internal state error: {0}")]
    Internal(String),
}

impl From<LedgerError> for TriageError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnknownPatient(id) => TriageError::UnknownPatient(id),
            LedgerError::LockPoisoned => TriageError::Internal(e.to_string()),
        }
    }
}
