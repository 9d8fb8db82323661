//! External risk-analysis collaborator: trait seam, wire format, fallback.
//!
//! The collaborator is a black box consumed over HTTP. Its failure modes
//! (timeout, transport error, malformed response) never propagate to the
//! pipeline as fatal errors; the invoker degrades to the deterministic
//! fallback insight so the patient message is never left clinically
//! unacknowledged.

pub mod http;

pub use http::HttpAnalysisClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ClinicalInsight, RiskLevel, VitalReading, VitalType};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Cannot reach analysis service at {0}")]
    Connection(String),

    #[error("Analysis request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Analysis service error: HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Malformed analysis response: {0}")]
    ResponseParsing(String),
}

/// Insight plus any vitals the collaborator extracted from the message text.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub insight: ClinicalInsight,
    pub vitals: Vec<VitalReading>,
}

impl AnalysisOutcome {
    /// The deterministic safe default used on any collaborator failure.
    pub fn fallback() -> Self {
        Self {
            insight: ClinicalInsight::fallback(),
            vitals: Vec::new(),
        }
    }
}

/// Seam for the risk-analysis capability.
///
/// Synchronous by design: implementations block for the duration of the
/// remote call and the pipeline invokes them via `spawn_blocking` under a
/// timeout. Tests substitute scripted implementations.
pub trait TriageAnalyzer: Send + Sync {
    fn analyze(&self, message: &str, history_context: &str)
        -> Result<AnalysisOutcome, AnalysisError>;
}

// ═══════════════════════════════════════════
// Wire format
// ═══════════════════════════════════════════

/// Request body sent to the collaborator.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest<'a> {
    pub message: &'a str,
    pub history_context: &'a str,
}

/// Raw collaborator response. Risk level and vital types arrive as strings
/// and are validated during conversion, so one unknown tag cannot fail the
/// whole response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub summary: String,
    pub risk_level: String,
    pub confidence_score: f64,
    pub themes: Vec<String>,
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub missing_data: Vec<String>,
    #[serde(default)]
    pub clinical_action_suggestion: Option<String>,
    pub suggested_response: String,
    pub extracted_vitals: Vec<WireVital>,
}

#[derive(Debug, Deserialize)]
pub struct WireVital {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

impl AnalysisResponse {
    /// Validate and convert into an outcome.
    ///
    /// An unknown risk level is a malformed response (error → fallback
    /// upstream). An unknown vital type only drops that reading; it never
    /// corrupts the record or fails the analysis. Extracted vitals carry no
    /// source timestamp and are stamped here, at analysis completion.
    pub fn into_outcome(self) -> Result<AnalysisOutcome, AnalysisError> {
        let risk_level = match self.risk_level.trim().to_ascii_uppercase().as_str() {
            "LOW" => RiskLevel::Low,
            "MEDIUM" => RiskLevel::Medium,
            "HIGH" => RiskLevel::High,
            "CRITICAL" => RiskLevel::Critical,
            other => {
                return Err(AnalysisError::ResponseParsing(format!(
                    "unknown risk level: {other:?}"
                )))
            }
        };

        let vitals = self
            .extracted_vitals
            .into_iter()
            .filter_map(|wire| match VitalType::from_wire(&wire.kind) {
                Some(vital_type) => {
                    let unit = wire
                        .unit
                        .filter(|u| !u.trim().is_empty())
                        .unwrap_or_else(|| vital_type.default_unit().to_string());
                    Some(VitalReading::now(vital_type, wire.value, unit))
                }
                None => {
                    tracing::debug!(kind = %wire.kind, "Dropping vital with unknown type tag");
                    None
                }
            })
            .collect();

        let insight = ClinicalInsight {
            summary: self.summary,
            risk_level,
            confidence_score: self.confidence_score.clamp(0.0, 1.0),
            reasoning: self.reasoning,
            themes: self.themes,
            missing_data: self.missing_data,
            clinical_action_suggestion: self
                .clinical_action_suggestion
                .unwrap_or_else(|| "None".to_string()),
            suggested_response: self.suggested_response,
        };

        Ok(AnalysisOutcome { insight, vitals })
    }
}
