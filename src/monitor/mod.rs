//! Meeting session monitor.
//!
//! Tracks the meeting bots this process has started and drives the
//! join → wait → deliver feedback lifecycle:
//! start (bot joins) → delayed feedback action fires once → stop (entry removed)
//!
//! The session map sits behind one reader/writer lock that is only held for
//! in-memory work, never across a provider or notifier call.

mod session;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{MeetError, Result};
use crate::feedback::FeedbackNotifier;
use crate::transcription::{JoinedMeeting, TranscriptionProvider};

use session::Session;
pub use session::SessionStatus;

/// How long a bot listens before feedback is generated.
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_secs(10 * 60);

/// What a run of the feedback action ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// The session was stopped (or never tracked); nothing was done.
    NotTracked,
    /// An earlier run already claimed this session's feedback.
    AlreadySent,
    /// The timer belonged to a session that has since been replaced.
    Superseded,
    /// The provider returned no transcript text.
    EmptyTranscript,
    /// A transcript, generation or delivery call failed; not retried.
    Failed,
    Delivered,
}

struct Inner {
    provider: Arc<dyn TranscriptionProvider>,
    notifier: Arc<dyn FeedbackNotifier>,
    sessions: RwLock<HashMap<String, Session>>,
    feedback_delay: Duration,
}

/// Handle to the set of tracked sessions. Cloning shares the same state.
#[derive(Clone)]
pub struct SessionMonitor {
    inner: Arc<Inner>,
}

impl SessionMonitor {
    pub fn new(
        provider: Arc<dyn TranscriptionProvider>,
        notifier: Arc<dyn FeedbackNotifier>,
        feedback_delay: Duration,
    ) -> Self {
        debug!(
            "Creating session monitor (provider: {}, feedback delay: {}s)",
            provider.name(),
            feedback_delay.as_secs()
        );

        Self {
            inner: Arc::new(Inner {
                provider,
                notifier,
                sessions: RwLock::new(HashMap::new()),
                feedback_delay,
            }),
        }
    }

    pub fn feedback_delay(&self) -> Duration {
        self.inner.feedback_delay
    }

    /// Send a bot into the meeting and start tracking it.
    ///
    /// Nothing is tracked if the provider fails to join.
    pub async fn start_meeting(&self, meeting_url: &str) -> Result<JoinedMeeting> {
        info!("Starting meeting monitoring: {}", meeting_url);

        let joined = self
            .inner
            .provider
            .join(meeting_url)
            .await
            .inspect_err(|e| error!("Failed to join meeting {}: {}", meeting_url, e))?;

        let mut sessions = self.inner.sessions.write().await;

        let pending = CancellationToken::new();
        let session = Session::new(
            joined.session_id.clone(),
            joined.meeting_id.clone(),
            meeting_url.to_string(),
            pending.clone(),
        );

        if let Some(previous) = sessions.insert(joined.session_id.clone(), session) {
            warn!(
                "Provider reused bot ID {}, replacing its session",
                previous.session_id
            );
            previous.pending.cancel();
        }

        self.schedule_feedback(joined.session_id.clone(), pending);

        info!(
            "Bot {} joined meeting {} ({} tracked), feedback in {}s",
            joined.session_id,
            joined.meeting_id,
            sessions.len(),
            self.inner.feedback_delay.as_secs()
        );

        Ok(joined)
    }

    /// Stop tracking a session and cancel its pending feedback.
    ///
    /// If the feedback action is already running it is left to finish.
    pub async fn stop_meeting(&self, session_id: &str) -> Result<()> {
        info!("Stopping meeting: {}", session_id);

        let mut sessions = self.inner.sessions.write().await;
        let Some(session) = sessions.remove(session_id) else {
            warn!("Bot {} not found", session_id);
            return Err(MeetError::NotFound(session_id.to_string()));
        };

        session.pending.cancel();

        info!(
            "Bot {} stopped after {}s (feedback sent: {})",
            session_id,
            session.started.elapsed().as_secs(),
            session.feedback_sent
        );
        Ok(())
    }

    /// Fetch the transcript straight from the provider. The session does
    /// not have to be tracked here.
    pub async fn get_transcription(&self, session_id: &str) -> Result<String> {
        info!("Fetching transcription for {}", session_id);

        self.inner
            .provider
            .fetch_transcript(session_id)
            .await
            .inspect_err(|e| error!("Failed to fetch transcription for {}: {}", session_id, e))
    }

    pub async fn get_status(&self, session_id: &str) -> Result<SessionStatus> {
        let sessions = self.inner.sessions.read().await;
        match sessions.get(session_id) {
            Some(session) => Ok(session.status()),
            None => {
                warn!("Session {} not found for status check", session_id);
                Err(MeetError::NotFound(session_id.to_string()))
            }
        }
    }

    /// All tracked sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<SessionStatus> {
        let sessions = self.inner.sessions.read().await;
        let mut statuses: Vec<SessionStatus> = sessions.values().map(Session::status).collect();
        statuses.sort_by(|a, b| {
            b.elapsed
                .cmp(&a.elapsed)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        statuses
    }

    /// Cancel every pending feedback action and forget all sessions.
    pub async fn shutdown(&self) {
        let mut sessions = self.inner.sessions.write().await;
        let count = sessions.len();
        for (_, session) in sessions.drain() {
            session.pending.cancel();
        }
        info!("Session monitor shut down ({} sessions dropped)", count);
    }

    /// The delayed feedback action.
    ///
    /// Runs at most once per session: the flag is claimed under the write
    /// lock before any I/O, so a second run or a run after stop is a no-op.
    pub async fn send_feedback(&self, session_id: &str) -> FeedbackOutcome {
        self.run_feedback(session_id, None).await
    }

    /// `owner` is the token of the session that scheduled this run. Once it
    /// is cancelled the entry under `session_id` is no longer ours to claim.
    async fn run_feedback(
        &self,
        session_id: &str,
        owner: Option<&CancellationToken>,
    ) -> FeedbackOutcome {
        info!("Feedback action fired for {}", session_id);

        {
            let mut sessions = self.inner.sessions.write().await;
            match sessions.get_mut(session_id) {
                None => {
                    warn!("Meeting session {} not found, skipping feedback", session_id);
                    return FeedbackOutcome::NotTracked;
                }
                Some(_) if owner.is_some_and(|token| token.is_cancelled()) => {
                    info!(
                        "Session {} was replaced before its feedback ran, skipping",
                        session_id
                    );
                    return FeedbackOutcome::Superseded;
                }
                Some(session) if session.feedback_sent => {
                    info!("Feedback already sent for {}", session_id);
                    return FeedbackOutcome::AlreadySent;
                }
                Some(session) => session.feedback_sent = true,
            }
        }

        let transcript = match self.inner.provider.fetch_transcript(session_id).await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to get transcription for {}: {}", session_id, e);
                return FeedbackOutcome::Failed;
            }
        };

        if transcript.trim().is_empty() {
            warn!("No transcription available for {}", session_id);
            return FeedbackOutcome::EmptyTranscript;
        }

        let feedback = match self.inner.notifier.generate_feedback(&transcript).await {
            Ok(feedback) => feedback,
            Err(e) => {
                error!("Failed to generate feedback for {}: {}", session_id, e);
                return FeedbackOutcome::Failed;
            }
        };

        info!(
            "Feedback generated for {}: {} chars, {} questions",
            session_id,
            feedback.feedback.len(),
            feedback.questions.len()
        );

        if let Err(e) = self.inner.notifier.deliver(session_id, &feedback).await {
            error!("Failed to deliver feedback for {}: {}", session_id, e);
            return FeedbackOutcome::Failed;
        }

        info!("Feedback delivered for {}", session_id);
        FeedbackOutcome::Delivered
    }

    fn schedule_feedback(&self, session_id: String, pending: CancellationToken) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.feedback_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = pending.cancelled() => {
                    debug!("Feedback for {} cancelled", session_id);
                }
                _ = tokio::time::sleep(delay) => {
                    // Monitor already dropped: nothing left to report to.
                    if let Some(inner) = weak.upgrade() {
                        SessionMonitor { inner }
                            .run_feedback(&session_id, Some(&pending))
                            .await;
                    }
                }
            }
        });
    }
}
