use super::*;
use crate::feedback::Feedback;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct FakeProvider {
    joins: AtomicUsize,
    fetches: AtomicUsize,
    fail_join: bool,
    /// Hand out this bot ID on every join instead of `bot-N`.
    reused_id: Option<String>,
    /// `None` makes fetches fail with `TranscriptNotReady`.
    transcript: Option<String>,
}

impl FakeProvider {
    fn with_transcript(text: &str) -> Self {
        Self {
            transcript: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TranscriptionProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn join(&self, _meeting_url: &str) -> Result<JoinedMeeting> {
        if self.fail_join {
            return Err(MeetError::ProviderUnavailable("connection refused".to_string()));
        }
        let n = self.joins.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(JoinedMeeting {
            session_id: self
                .reused_id
                .clone()
                .unwrap_or_else(|| format!("bot-{}", n)),
            meeting_id: format!("m-{}", n),
        })
    }

    async fn fetch_transcript(&self, session_id: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.transcript
            .clone()
            .ok_or_else(|| MeetError::TranscriptNotReady(session_id.to_string()))
    }
}

#[derive(Default)]
struct FakeNotifier {
    generated: Mutex<Vec<String>>,
    delivered: Mutex<Vec<(String, Feedback)>>,
    fail_generation: bool,
    fail_delivery: bool,
}

impl FakeNotifier {
    fn generated(&self) -> Vec<String> {
        self.generated.lock().unwrap().clone()
    }

    fn delivered(&self) -> Vec<(String, Feedback)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedbackNotifier for FakeNotifier {
    async fn generate_feedback(&self, transcript: &str) -> Result<Feedback> {
        self.generated.lock().unwrap().push(transcript.to_string());
        if self.fail_generation {
            return Err(MeetError::GenerationFailed("model overloaded".to_string()));
        }
        Ok(Feedback {
            feedback: "good job".to_string(),
            questions: vec!["q1?".to_string()],
        })
    }

    async fn deliver(&self, session_id: &str, feedback: &Feedback) -> Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .push((session_id.to_string(), feedback.clone()));
        if self.fail_delivery {
            return Err(MeetError::DeliveryFailed("chat not found".to_string()));
        }
        Ok(())
    }
}

fn setup(
    provider: FakeProvider,
    notifier: FakeNotifier,
) -> (SessionMonitor, Arc<FakeProvider>, Arc<FakeNotifier>) {
    let provider = Arc::new(provider);
    let notifier = Arc::new(notifier);
    let monitor = SessionMonitor::new(
        provider.clone(),
        notifier.clone(),
        DEFAULT_FEEDBACK_DELAY,
    );
    (monitor, provider, notifier)
}

async fn wait_past_delay() {
    tokio::time::sleep(DEFAULT_FEEDBACK_DELAY + Duration::from_secs(1)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[test]
fn test_default_feedback_delay_is_ten_minutes() {
    assert_eq!(DEFAULT_FEEDBACK_DELAY, Duration::from_secs(600));
}

#[tokio::test(start_paused = true)]
async fn test_start_then_status_is_fresh() {
    let (monitor, _, _) = setup(FakeProvider::with_transcript("hello"), FakeNotifier::default());

    let joined = monitor
        .start_meeting("https://meet.example/abc")
        .await
        .unwrap();
    assert_eq!(joined.session_id, "bot-1");
    assert_eq!(joined.meeting_id, "m-1");

    let status = monitor.get_status("bot-1").await.unwrap();
    assert!(!status.feedback_sent);
    assert!(status.elapsed < Duration::from_secs(1));
    assert_eq!(status.meeting_url, "https://meet.example/abc");
    assert_eq!(status.meeting_id, "m-1");
}

#[tokio::test]
async fn test_join_failure_tracks_nothing() {
    let provider = FakeProvider {
        fail_join: true,
        ..Default::default()
    };
    let (monitor, _, _) = setup(provider, FakeNotifier::default());

    let err = monitor
        .start_meeting("https://meet.example/abc")
        .await
        .unwrap_err();
    assert!(matches!(err, MeetError::ProviderUnavailable(_)));
    assert!(monitor.list_sessions().await.is_empty());
}

#[tokio::test]
async fn test_stop_unknown_is_not_found() {
    let (monitor, _, _) = setup(FakeProvider::default(), FakeNotifier::default());

    let err = monitor.stop_meeting("nope").await.unwrap_err();
    assert!(matches!(err, MeetError::NotFound(id) if id == "nope"));
}

#[tokio::test]
async fn test_stop_twice_reports_not_found() {
    let (monitor, _, _) = setup(FakeProvider::default(), FakeNotifier::default());
    monitor.start_meeting("https://meet.example/abc").await.unwrap();

    assert!(monitor.stop_meeting("bot-1").await.is_ok());
    assert!(matches!(
        monitor.stop_meeting("bot-1").await,
        Err(MeetError::NotFound(_))
    ));
    assert!(matches!(
        monitor.get_status("bot-1").await,
        Err(MeetError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_feedback_fires_after_delay() {
    let (monitor, _, notifier) = setup(
        FakeProvider::with_transcript("hello world"),
        FakeNotifier::default(),
    );
    monitor.start_meeting("https://meet.example/abc").await.unwrap();

    tokio::time::sleep(DEFAULT_FEEDBACK_DELAY - Duration::from_secs(1)).await;
    assert!(!monitor.get_status("bot-1").await.unwrap().feedback_sent);
    assert!(notifier.delivered().is_empty());

    wait_past_delay().await;

    assert!(monitor.get_status("bot-1").await.unwrap().feedback_sent);
    let delivered = notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "bot-1");
}

#[tokio::test(start_paused = true)]
async fn test_feedback_action_runs_once() {
    let (monitor, provider, notifier) = setup(
        FakeProvider::with_transcript("hello world"),
        FakeNotifier::default(),
    );
    monitor.start_meeting("https://meet.example/abc").await.unwrap();

    assert_eq!(monitor.send_feedback("bot-1").await, FeedbackOutcome::Delivered);
    assert_eq!(monitor.send_feedback("bot-1").await, FeedbackOutcome::AlreadySent);

    // The scheduled run finds the flag already set as well.
    wait_past_delay().await;

    assert_eq!(notifier.delivered().len(), 1);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reused_bot_id_replaces_session() {
    let provider = FakeProvider {
        reused_id: Some("bot-x".to_string()),
        ..FakeProvider::with_transcript("hello world")
    };
    let (monitor, _, notifier) = setup(provider, FakeNotifier::default());

    monitor.start_meeting("https://meet.example/one").await.unwrap();
    let first_token = monitor.inner.sessions.read().await["bot-x"].pending.clone();

    tokio::time::sleep(Duration::from_secs(300)).await;
    monitor.start_meeting("https://meet.example/two").await.unwrap();
    assert!(first_token.is_cancelled());

    // A timer from the replaced session that already fired must not claim
    // the replacement's feedback.
    assert_eq!(
        monitor.run_feedback("bot-x", Some(&first_token)).await,
        FeedbackOutcome::Superseded
    );
    let status = monitor.get_status("bot-x").await.unwrap();
    assert!(!status.feedback_sent);
    assert_eq!(status.meeting_url, "https://meet.example/two");
    assert!(notifier.generated().is_empty());

    // The first schedule would have fired here; only the second one counts.
    tokio::time::sleep(Duration::from_secs(301)).await;
    assert!(!monitor.get_status("bot-x").await.unwrap().feedback_sent);

    wait_past_delay().await;
    assert!(monitor.get_status("bot-x").await.unwrap().feedback_sent);
    assert_eq!(notifier.delivered().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_delay_prevents_feedback() {
    let (monitor, provider, notifier) = setup(
        FakeProvider::with_transcript("hello world"),
        FakeNotifier::default(),
    );
    monitor.start_meeting("https://meet.example/abc").await.unwrap();
    monitor.stop_meeting("bot-1").await.unwrap();

    assert_eq!(monitor.send_feedback("bot-1").await, FeedbackOutcome::NotTracked);
    wait_past_delay().await;

    assert!(notifier.generated().is_empty());
    assert!(notifier.delivered().is_empty());
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_get_transcription_does_not_require_tracking() {
    let (monitor, provider, _) = setup(
        FakeProvider::with_transcript("[Ann]: hi\n"),
        FakeNotifier::default(),
    );

    let text = monitor.get_transcription("never-started").await.unwrap();
    assert_eq!(text, "[Ann]: hi\n");
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_transcription_propagates_provider_error() {
    let (monitor, _, _) = setup(FakeProvider::default(), FakeNotifier::default());

    let err = monitor.get_transcription("bot-9").await.unwrap_err();
    assert!(matches!(err, MeetError::TranscriptNotReady(_)));
}

#[tokio::test(start_paused = true)]
async fn test_empty_transcript_skips_generation() {
    let (monitor, _, notifier) = setup(FakeProvider::with_transcript(""), FakeNotifier::default());
    monitor.start_meeting("https://meet.example/abc").await.unwrap();

    assert_eq!(
        monitor.send_feedback("bot-1").await,
        FeedbackOutcome::EmptyTranscript
    );
    assert!(notifier.generated().is_empty());
    // The attempt is spent even though nothing was delivered.
    assert!(monitor.get_status("bot-1").await.unwrap().feedback_sent);
}

#[tokio::test(start_paused = true)]
async fn test_transcript_error_is_terminal() {
    let (monitor, provider, notifier) = setup(FakeProvider::default(), FakeNotifier::default());
    monitor.start_meeting("https://meet.example/abc").await.unwrap();

    assert_eq!(monitor.send_feedback("bot-1").await, FeedbackOutcome::Failed);
    assert_eq!(monitor.send_feedback("bot-1").await, FeedbackOutcome::AlreadySent);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    assert!(notifier.generated().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_generation_failure_skips_delivery() {
    let notifier = FakeNotifier {
        fail_generation: true,
        ..Default::default()
    };
    let (monitor, _, notifier) = setup(FakeProvider::with_transcript("hello"), notifier);
    monitor.start_meeting("https://meet.example/abc").await.unwrap();

    assert_eq!(monitor.send_feedback("bot-1").await, FeedbackOutcome::Failed);
    assert_eq!(notifier.generated(), vec!["hello".to_string()]);
    assert!(notifier.delivered().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delivery_failure_is_not_retried() {
    let notifier = FakeNotifier {
        fail_delivery: true,
        ..Default::default()
    };
    let (monitor, _, notifier) = setup(FakeProvider::with_transcript("hello"), notifier);
    monitor.start_meeting("https://meet.example/abc").await.unwrap();

    assert_eq!(monitor.send_feedback("bot-1").await, FeedbackOutcome::Failed);
    wait_past_delay().await;

    assert_eq!(notifier.delivered().len(), 1);
    assert!(monitor.get_status("bot-1").await.unwrap().feedback_sent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_are_all_tracked() {
    let (monitor, _, _) = setup(FakeProvider::default(), FakeNotifier::default());

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let monitor = monitor.clone();
            tokio::spawn(async move {
                monitor
                    .start_meeting(&format!("https://meet.example/{}", i))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(monitor.list_sessions().await.len(), 32);
    for n in 1..=32 {
        let status = monitor.get_status(&format!("bot-{}", n)).await.unwrap();
        assert_eq!(status.meeting_id, format!("m-{}", n));
        assert!(!status.feedback_sent);
    }

    monitor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_list_sessions_oldest_first() {
    let (monitor, _, _) = setup(FakeProvider::default(), FakeNotifier::default());
    monitor.start_meeting("https://meet.example/a").await.unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    monitor.start_meeting("https://meet.example/b").await.unwrap();

    let sessions = monitor.list_sessions().await;
    let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["bot-1", "bot-2"]);
    assert!(sessions[0].elapsed >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_feedback() {
    let (monitor, provider, notifier) = setup(
        FakeProvider::with_transcript("hello"),
        FakeNotifier::default(),
    );
    monitor.start_meeting("https://meet.example/a").await.unwrap();
    monitor.start_meeting("https://meet.example/b").await.unwrap();

    monitor.shutdown().await;
    wait_past_delay().await;

    assert!(monitor.list_sessions().await.is_empty());
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
    assert!(notifier.delivered().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_feedback_delay() {
    let provider = Arc::new(FakeProvider::with_transcript("hello"));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = SessionMonitor::new(provider, notifier.clone(), Duration::from_secs(5));
    assert_eq!(monitor.feedback_delay(), Duration::from_secs(5));

    monitor.start_meeting("https://meet.example/a").await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    tokio::task::yield_now().await;

    assert_eq!(notifier.delivered().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_scenario() {
    let (monitor, _, notifier) = setup(
        FakeProvider::with_transcript("hello world"),
        FakeNotifier::default(),
    );

    let joined = monitor
        .start_meeting("https://meet.example/abc")
        .await
        .unwrap();
    assert_eq!(
        joined,
        JoinedMeeting {
            session_id: "bot-1".to_string(),
            meeting_id: "m-1".to_string(),
        }
    );

    let status = monitor.get_status("bot-1").await.unwrap();
    assert!(!status.feedback_sent);
    assert!(status.elapsed < Duration::from_secs(1));

    assert_eq!(monitor.send_feedback("bot-1").await, FeedbackOutcome::Delivered);
    assert_eq!(notifier.generated(), vec!["hello world".to_string()]);
    assert_eq!(
        notifier.delivered(),
        vec![(
            "bot-1".to_string(),
            Feedback {
                feedback: "good job".to_string(),
                questions: vec!["q1?".to_string()],
            }
        )]
    );

    let status = monitor.get_status("bot-1").await.unwrap();
    assert!(status.feedback_sent);
    assert!(status.elapsed < Duration::from_secs(1));
}
