//! HTTP client for the risk-analysis collaborator.

use super::{AnalysisError, AnalysisOutcome, AnalysisRequest, AnalysisResponse, TriageAnalyzer};
use crate::config::TriageConfig;

/// Blocking HTTP client for the analysis service.
///
/// Blocking on purpose: analysis runs on the blocking thread pool under a
/// runtime-imposed deadline, so the client's own timeout is a second line of
/// defense against a hung connection.
pub struct HttpAnalysisClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpAnalysisClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &TriageConfig) -> Result<Self, AnalysisError> {
        Self::new(&config.analysis_base_url, config.analysis_timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TriageAnalyzer for HttpAnalysisClient {
    fn analyze(
        &self,
        message: &str,
        history_context: &str,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let url = format!("{}/analyze", self.base_url);
        let body = AnalysisRequest {
            message,
            history_context,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                AnalysisError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                AnalysisError::Timeout(self.timeout_secs)
            } else {
                AnalysisError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnalysisResponse = response
            .json()
            .map_err(|e| AnalysisError::ResponseParsing(e.to_string()))?;

        parsed.into_outcome()
    }
}
