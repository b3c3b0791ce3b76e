//! Tracked session state and its read-only snapshot.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One tracked meeting engagement, from join until stop.
pub(crate) struct Session {
    pub session_id: String,
    pub meeting_id: String,
    pub meeting_url: String,
    pub started_at: DateTime<Utc>,
    /// Monotonic start, used for elapsed time.
    pub started: Instant,
    /// Flipped to true once, by the feedback action, under the write lock.
    pub feedback_sent: bool,
    /// Cancels the scheduled feedback action if it has not fired yet.
    pub pending: CancellationToken,
}

impl Session {
    pub fn new(
        session_id: String,
        meeting_id: String,
        meeting_url: String,
        pending: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            meeting_id,
            meeting_url,
            started_at: Utc::now(),
            started: Instant::now(),
            feedback_sent: false,
            pending,
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.session_id.clone(),
            meeting_id: self.meeting_id.clone(),
            meeting_url: self.meeting_url.clone(),
            started_at: self.started_at,
            feedback_sent: self.feedback_sent,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Point-in-time view of a tracked session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub session_id: String,
    pub meeting_id: String,
    pub meeting_url: String,
    pub started_at: DateTime<Utc>,
    pub feedback_sent: bool,
    pub elapsed: Duration,
}
