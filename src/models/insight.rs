use serde::{Deserialize, Serialize};

use super::enums::RiskLevel;

/// Structured output of risk analysis on a single patient message.
///
/// Replaces the record's previous insight wholesale on every successful
/// analysis; never merged field-by-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalInsight {
    pub summary: String,
    pub risk_level: RiskLevel,
    /// In [0,1]. Zero means the insight is a fallback, not a real analysis.
    pub confidence_score: f64,
    pub reasoning: Vec<String>,
    pub themes: Vec<String>,
    pub missing_data: Vec<String>,
    pub clinical_action_suggestion: String,
    /// Patient-facing reply, appended to the channel as a SYSTEM message.
    pub suggested_response: String,
}

impl ClinicalInsight {
    /// Deterministic safe default produced when analysis fails.
    ///
    /// A triage system must never leave a patient message clinically
    /// unacknowledged, so collaborator failure degrades to this insight
    /// instead of surfacing an error.
    pub fn fallback() -> Self {
        Self {
            summary: "Automated analysis was unavailable for this message.".to_string(),
            risk_level: RiskLevel::Medium,
            confidence_score: 0.0,
            reasoning: vec!["Analysis failed — fallback".to_string()],
            themes: vec!["System Error".to_string()],
            missing_data: vec!["Complete analysis unavailable".to_string()],
            clinical_action_suggestion: "Manual Review".to_string(),
            suggested_response:
                "Thank you for your message. Your care team has received it and will review it shortly."
                    .to_string(),
        }
    }

    /// True if this insight came from the fallback path.
    pub fn is_fallback(&self) -> bool {
        self.confidence_score == 0.0 && self.themes.iter().any(|t| t == "System Error")
    }
}
