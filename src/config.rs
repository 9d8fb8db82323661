use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Carebridge";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Carebridge/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Carebridge")
}

/// Get the default path of the durable message/vitals store.
pub fn store_path() -> PathBuf {
    app_data_dir().join("triage.db")
}

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,carebridge=debug"
}

/// Tunables for the triage pipeline.
///
/// The analysis timeout is imposed by this crate; the collaborator itself
/// specifies none. Expiry routes through the same fallback path as any other
/// collaborator failure.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Base URL of the risk-analysis collaborator.
    pub analysis_base_url: String,
    /// Hard deadline for one analysis call, in seconds.
    pub analysis_timeout_secs: u64,
    /// Delay before acknowledging a non-text (media) message, in milliseconds.
    pub media_ack_delay_ms: u64,
    /// How many recent vitals go into the history digest sent to analysis.
    pub digest_vitals: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            analysis_base_url: "http://localhost:8087".to_string(),
            analysis_timeout_secs: 30,
            media_ack_delay_ms: 1_500,
            digest_vitals: 3,
        }
    }
}
