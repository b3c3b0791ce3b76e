//! Error taxonomy shared by the monitor and its collaborators.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeetError {
    /// The session is not tracked by this process.
    #[error("bot {0} not found")]
    NotFound(String),

    #[error("transcription provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider accepted the join request but the bot never showed up
    /// in its active meetings.
    #[error("bot did not become active after {attempts} polling attempts")]
    JoinTimeout { attempts: u32 },

    #[error("transcript not ready for {0}")]
    TranscriptNotReady(String),

    #[error("feedback generation failed: {0}")]
    GenerationFailed(String),

    #[error("feedback delivery failed: {0}")]
    DeliveryFailed(String),
}

pub type Result<T> = std::result::Result<T, MeetError>;
