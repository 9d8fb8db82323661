//! Carebridge — the clinical interaction pipeline behind a patient/clinician
//! care-coordination channel.
//!
//! One pipeline, six parts: message ingestion, automated risk analysis with a
//! deterministic fallback, risk-state reduction, vitals accumulation,
//! best-effort persistence, and idempotent reconciliation of the realtime
//! change feed. Everything else (rendering, auth, media capture) lives in the
//! hosting application.

pub mod analysis; // external risk-analysis collaborator
pub mod config;
pub mod db;
pub mod ledger; // per-patient keyed record store
pub mod models;
pub mod pipeline; // gateway + reducer
pub mod realtime; // change-feed hub + subscription
pub mod service;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and integration harnesses.
///
/// Honors `RUST_LOG` when set; falls back to the crate default filter.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
