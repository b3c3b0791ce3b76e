//! Transcription provider abstraction.
//!
//! A provider sends a notetaker bot into a live meeting and later serves
//! the transcript it recorded, keyed by the bot/session ID it assigned.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod fireflies;

pub use fireflies::{FirefliesConfig, FirefliesProvider};

/// Identifiers assigned by the provider when a bot joins a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedMeeting {
    pub session_id: String,
    pub meeting_id: String,
}

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Join the meeting at `meeting_url`.
    ///
    /// Fails with `ProviderUnavailable` when the request cannot be made and
    /// with `JoinTimeout` when the bot never appears as active.
    async fn join(&self, meeting_url: &str) -> Result<JoinedMeeting>;

    /// Fetch the full transcript text for a session.
    async fn fetch_transcript(&self, session_id: &str) -> Result<String>;
}
