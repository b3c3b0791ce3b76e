//! HTTP client for the scrum-master AI service.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::Feedback;
use crate::error::{MeetError, Result};

#[derive(Debug, Serialize)]
struct GenerateFeedbackRequest<'a> {
    transcription: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateFeedbackResponse {
    feedback: String,
    #[serde(default)]
    questions: Vec<String>,
}

/// Response of the transcript analyzer used by the summary webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub text: String,
}

pub struct ScrumClient {
    client: reqwest::Client,
    base_url: String,
    analyze_url: Option<String>,
}

impl ScrumClient {
    pub fn new(base_url: &str, analyze_url: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client for scrum service")?;
        let base_url = base_url.trim_end_matches('/').to_string();

        debug!("Created scrum client with base URL: {}", base_url);

        Ok(Self {
            client,
            base_url,
            analyze_url: analyze_url.filter(|u| !u.is_empty()),
        })
    }

    pub fn generate_feedback_url(&self) -> String {
        format!("{}/api/v1/generate-feedback", self.base_url)
    }

    pub fn has_analyzer(&self) -> bool {
        self.analyze_url.is_some()
    }

    pub async fn generate_feedback(&self, transcription: &str) -> Result<Feedback> {
        let url = self.generate_feedback_url();
        info!(
            "Requesting feedback from scrum service ({} chars): {}",
            transcription.len(),
            url
        );

        let response = self
            .client
            .post(&url)
            .json(&GenerateFeedbackRequest { transcription })
            .send()
            .await
            .map_err(|e| {
                error!("Scrum service request failed: {}", e);
                MeetError::GenerationFailed(format!("failed to send request: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Scrum service returned {}: {}", status, body);
            return Err(MeetError::GenerationFailed(format!(
                "unexpected status code: {}, body: {}",
                status, body
            )));
        }

        let result: GenerateFeedbackResponse = response.json().await.map_err(|e| {
            MeetError::GenerationFailed(format!("failed to decode response: {}", e))
        })?;

        info!(
            "Feedback generated: {} chars, {} questions",
            result.feedback.len(),
            result.questions.len()
        );

        Ok(Feedback {
            feedback: result.feedback,
            questions: result.questions,
        })
    }

    /// Forwards a meeting summary payload to the analyzer. Returns `None`
    /// when no analyzer is configured.
    pub async fn analyze<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> anyhow::Result<Option<AnalyzeResponse>> {
        let Some(url) = &self.analyze_url else {
            return Ok(None);
        };

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .context("Failed to send to analyze endpoint")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("analyze endpoint returned status: {}", status);
        }

        let analysis = response
            .json::<AnalyzeResponse>()
            .await
            .context("Failed to decode analyze response")?;

        Ok(Some(analysis))
    }
}
