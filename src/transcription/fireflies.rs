use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::{JoinedMeeting, TranscriptionProvider};
use crate::error::{MeetError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.fireflies.ai/graphql";

const ADD_TO_LIVE_MEETING: &str = r#"
mutation AddToLiveMeeting($meetingLink: String!) {
    addToLiveMeeting(meeting_link: $meetingLink) {
        success
        message
    }
}
"#;

const ACTIVE_MEETINGS: &str = r#"
query ActiveMeetings {
    active_meetings {
        id
        meeting_link
    }
}
"#;

const TRANSCRIPT: &str = r#"
query Transcript($transcriptId: String!) {
    transcript(id: $transcriptId) {
        id
        title
        sentences {
            text
            speaker_name
            speaker_id
            start_time
            end_time
        }
    }
}
"#;

#[derive(Debug, Clone)]
pub struct FirefliesConfig {
    pub api_key: String,
    pub endpoint: String,
    /// How many times `active_meetings` is polled after the join mutation.
    pub poll_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for FirefliesConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_attempts: 5,
            poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorExtensions {
    #[serde(default)]
    code: Option<String>,
}

impl GraphQlError {
    fn is_not_found(&self) -> bool {
        let code = self
            .code
            .as_deref()
            .or_else(|| self.extensions.as_ref().and_then(|e| e.code.as_deref()));
        match code {
            Some(code) => code.eq_ignore_ascii_case("object_not_found"),
            None => self.message.to_ascii_lowercase().contains("not found"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddToLiveMeetingData {
    #[serde(rename = "addToLiveMeeting")]
    add_to_live_meeting: AddToLiveMeetingResult,
}

#[derive(Debug, Deserialize)]
struct AddToLiveMeetingResult {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActiveMeetingsData {
    #[serde(default)]
    active_meetings: Vec<ActiveMeeting>,
}

#[derive(Debug, Deserialize)]
struct ActiveMeeting {
    id: String,
    meeting_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptData {
    transcript: Option<Transcript>,
}

#[derive(Debug, Deserialize)]
struct Transcript {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    sentences: Vec<Sentence>,
}

/// One spoken sentence in a transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct Sentence {
    pub text: String,
    #[serde(default)]
    pub speaker_name: Option<String>,
    #[serde(default)]
    pub speaker_id: Option<i64>,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
}

/// Renders sentences as `[speaker]: text` lines.
pub fn render_sentences(sentences: &[Sentence]) -> String {
    sentences
        .iter()
        .map(|s| {
            format!(
                "[{}]: {}\n",
                s.speaker_name.as_deref().unwrap_or("Unknown"),
                s.text
            )
        })
        .collect()
}

/// Fireflies.ai notetaker driven through its GraphQL API.
pub struct FirefliesProvider {
    client: reqwest::Client,
    config: FirefliesConfig,
}

impl FirefliesProvider {
    pub fn new(config: FirefliesConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client for Fireflies")?;

        info!(
            "Initialized Fireflies provider with endpoint: {} (api key set: {})",
            config.endpoint,
            !config.api_key.is_empty()
        );

        Ok(Self { client, config })
    }

    async fn send<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let parsed: GraphQlResponse<T> = self.execute(query, variables).await?;

        if let Some(first) = parsed.errors.first() {
            error!("Fireflies GraphQL error: {}", first.message);
            return Err(graphql_error(first));
        }

        parsed
            .data
            .ok_or_else(|| MeetError::ProviderUnavailable("response has no data".to_string()))
    }

    /// Posts one GraphQL operation. Transport, HTTP status and decoding
    /// failures are errors; GraphQL `errors` are left to the caller.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<GraphQlResponse<T>> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|e| {
                error!("Fireflies request failed: {}", e);
                MeetError::ProviderUnavailable(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MeetError::ProviderUnavailable(e.to_string()))?;

        if !status.is_success() {
            error!("Fireflies API request failed with status {}: {}", status, body);
            return Err(MeetError::ProviderUnavailable(format!(
                "API request failed with status {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            MeetError::ProviderUnavailable(format!("failed to decode response: {}", e))
        })
    }

    async fn find_active_meeting_id(&self, meeting_url: &str) -> Result<Option<String>> {
        let data: ActiveMeetingsData = self.send(ACTIVE_MEETINGS, json!({})).await?;
        Ok(find_meeting(&data.active_meetings, meeting_url))
    }
}

fn graphql_error(err: &GraphQlError) -> MeetError {
    MeetError::ProviderUnavailable(format!("graphql error: {}", err.message))
}

fn find_meeting(meetings: &[ActiveMeeting], meeting_url: &str) -> Option<String> {
    meetings
        .iter()
        .find(|m| m.meeting_link.as_deref() == Some(meeting_url))
        .map(|m| m.id.clone())
}

#[async_trait]
impl TranscriptionProvider for FirefliesProvider {
    fn name(&self) -> &'static str {
        "Fireflies"
    }

    async fn join(&self, meeting_url: &str) -> Result<JoinedMeeting> {
        info!("Sending Fireflies bot to meeting: {}", meeting_url);

        let data: AddToLiveMeetingData = self
            .send(ADD_TO_LIVE_MEETING, json!({ "meetingLink": meeting_url }))
            .await?;

        let result = data.add_to_live_meeting;
        if !result.success {
            return Err(MeetError::ProviderUnavailable(format!(
                "failed to add bot to meeting: {}",
                result.message.unwrap_or_default()
            )));
        }

        info!(
            "Bot join request accepted: {}",
            result.message.as_deref().unwrap_or("")
        );

        // The bot shows up in active_meetings a few seconds after the mutation.
        for attempt in 1..=self.config.poll_attempts {
            sleep(self.config.poll_interval).await;

            match self.find_active_meeting_id(meeting_url).await {
                Ok(Some(id)) => {
                    info!("Bot ID found after {} attempt(s): {}", attempt, id);
                    return Ok(JoinedMeeting {
                        session_id: id.clone(),
                        meeting_id: id,
                    });
                }
                Ok(None) => debug!("Bot not active yet (attempt {})", attempt),
                Err(e) => warn!("Failed to query active meetings: {}", e),
            }
        }

        Err(MeetError::JoinTimeout {
            attempts: self.config.poll_attempts,
        })
    }

    async fn fetch_transcript(&self, session_id: &str) -> Result<String> {
        info!("Fetching transcript for {}", session_id);

        let parsed: GraphQlResponse<TranscriptData> = self
            .execute(TRANSCRIPT, json!({ "transcriptId": session_id }))
            .await?;

        // Fireflies answers with a not-found error until the transcript exists.
        if let Some(first) = parsed.errors.first() {
            if first.is_not_found() {
                warn!("Transcript {} not available yet: {}", session_id, first.message);
                return Err(MeetError::TranscriptNotReady(session_id.to_string()));
            }
            error!("Fireflies GraphQL error: {}", first.message);
            return Err(graphql_error(first));
        }

        let transcript = parsed
            .data
            .and_then(|data| data.transcript)
            .ok_or_else(|| MeetError::TranscriptNotReady(session_id.to_string()))?;

        let text = render_sentences(&transcript.sentences);
        info!(
            "Transcript {} ({}) retrieved: {} sentences, {} chars",
            transcript.id,
            transcript.title.as_deref().unwrap_or("untitled"),
            transcript.sentences.len(),
            text.len()
        );

        Ok(text)
    }
}
