//! Feedback generation and delivery.
//!
//! After a meeting has run for a while its transcript is turned into
//! feedback plus follow-up questions by the scrum-master service, and the
//! result is delivered to the bound Telegram chat.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{MeetError, Result};
use crate::telegram::{format, ChatTarget, TelegramClient};

pub mod scrum_client;

pub use scrum_client::{AnalyzeResponse, ScrumClient};

/// Generated feedback for one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub feedback: String,
    pub questions: Vec<String>,
}

#[async_trait]
pub trait FeedbackNotifier: Send + Sync {
    /// Turn a transcript into feedback text and follow-up questions.
    async fn generate_feedback(&self, transcript: &str) -> Result<Feedback>;

    /// Deliver generated feedback for a session to the end-user sink.
    async fn deliver(&self, session_id: &str, feedback: &Feedback) -> Result<()>;
}

/// Generates feedback through the scrum service and posts it to Telegram.
///
/// Without a Telegram client, or before a chat is bound, the message is
/// written to the log instead.
pub struct ScrumNotifier {
    scrum: Arc<ScrumClient>,
    telegram: Option<Arc<TelegramClient>>,
    chat: ChatTarget,
}

impl ScrumNotifier {
    pub fn new(
        scrum: Arc<ScrumClient>,
        telegram: Option<Arc<TelegramClient>>,
        chat: ChatTarget,
    ) -> Self {
        Self {
            scrum,
            telegram,
            chat,
        }
    }
}

#[async_trait]
impl FeedbackNotifier for ScrumNotifier {
    async fn generate_feedback(&self, transcript: &str) -> Result<Feedback> {
        self.scrum.generate_feedback(transcript).await
    }

    async fn deliver(&self, session_id: &str, feedback: &Feedback) -> Result<()> {
        let message = format::feedback_message(&feedback.feedback, &feedback.questions);

        let Some(telegram) = &self.telegram else {
            info!("Feedback for {}:\n{}", session_id, message);
            return Ok(());
        };

        let Some(chat_id) = self.chat.get().await else {
            warn!(
                "Telegram chat ID not set, logging feedback for {} instead",
                session_id
            );
            info!("Feedback for {}:\n{}", session_id, message);
            return Ok(());
        };

        telegram
            .send_message(&chat_id, &message)
            .await
            .map_err(|e| MeetError::DeliveryFailed(format!("{:#}", e)))?;

        info!("Feedback for {} sent to chat {}", session_id, chat_id);
        Ok(())
    }
}
