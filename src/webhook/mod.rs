//! Meeting summary webhook.
//!
//! When the notetaker finishes a meeting it posts a summary payload. The
//! gateway forwards it to the transcript analyzer and relays both the
//! summary and the analysis to the bound Telegram chat.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::feedback::ScrumClient;
use crate::telegram::format::{analysis_message, escape_html};
use crate::telegram::{ChatTarget, TelegramClient};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingSummary {
    pub session_id: String,
    pub trigger: String,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub participants: Vec<Participant>,
    pub owner: Participant,
    pub summary: String,
    pub action_items: Vec<TextItem>,
    pub key_questions: Vec<TextItem>,
    pub topics: Vec<TextItem>,
    pub report_url: String,
    pub chapter_summaries: Vec<Chapter>,
    pub transcript: Transcript,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextItem {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    pub title: String,
    pub description: String,
    pub topics: Vec<TextItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Transcript {
    pub speakers: Vec<Speaker>,
    pub speaker_blocks: Vec<SpeakerBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Speaker {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerBlock {
    pub start_time: String,
    pub end_time: String,
    pub speaker: Speaker,
    pub words: String,
}

fn write_person(out: &mut String, person: &Participant) {
    out.push_str(&escape_html(&person.name));
    if !person.email.is_empty() {
        let _ = write!(out, " ({})", escape_html(&person.email));
    }
}

/// Renders the summary as a Telegram HTML message. Empty sections are left out.
pub fn summary_message(req: &MeetingSummary) -> String {
    let mut out = String::from("<b>📝 Meeting Summary</b>\n\n");

    let _ = writeln!(out, "<b>Title:</b> {}", escape_html(&req.title));
    let _ = writeln!(out, "<b>Session ID:</b> {}", escape_html(&req.session_id));
    let _ = writeln!(
        out,
        "<b>Time:</b> {} - {}\n",
        escape_html(&req.start_time),
        escape_html(&req.end_time)
    );

    if !req.owner.name.is_empty() {
        out.push_str("<b>Owner:</b> ");
        write_person(&mut out, &req.owner);
        out.push_str("\n\n");
    }

    if !req.participants.is_empty() {
        out.push_str("<b>Participants:</b>\n");
        for p in &req.participants {
            out.push_str("• ");
            write_person(&mut out, p);
            out.push('\n');
        }
        out.push('\n');
    }

    if !req.summary.is_empty() {
        let _ = write!(out, "<b>Summary:</b>\n{}\n\n", escape_html(&req.summary));
    }

    for (heading, items) in [
        ("Action Items", &req.action_items),
        ("Key Questions", &req.key_questions),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "<b>{}:</b>", heading);
        for (i, item) in items.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, escape_html(&item.text));
        }
        out.push('\n');
    }

    if !req.topics.is_empty() {
        out.push_str("<b>Topics:</b>\n");
        for item in &req.topics {
            let _ = writeln!(out, "• {}", escape_html(&item.text));
        }
        out.push('\n');
    }

    if !req.report_url.is_empty() {
        let _ = writeln!(
            out,
            "<b>Report:</b> <a href=\"{}\">View Full Report</a>",
            escape_html(&req.report_url)
        );
    }

    out
}

/// What happened to one webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub analyzed: bool,
    pub summary_sent: bool,
    pub analysis_sent: bool,
}

pub struct SummaryRelay {
    scrum: Arc<ScrumClient>,
    telegram: Option<Arc<TelegramClient>>,
    chat: ChatTarget,
}

impl SummaryRelay {
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

    /// Analyze and forward a summary. Every downstream failure is logged
    /// and skipped; the caller always gets a report.
    pub async fn relay(&self, summary: &MeetingSummary) -> RelayReport {
        let mut report = RelayReport::default();

        info!(
            "Meeting summary received for session {} ({})",
            summary.session_id, summary.title
        );

        let analysis = match self.scrum.analyze(summary).await {
            Ok(analysis) => analysis,
            Err(e) => {
                error!("Failed to send to analyze endpoint: {:#}", e);
                None
            }
        };
        report.analyzed = analysis.is_some();

        let Some(telegram) = &self.telegram else {
            warn!("Telegram is not configured, skipping message send");
            return report;
        };

        let Some(chat_id) = self.chat.get().await else {
            warn!("Telegram chat ID not set, skipping message send");
            return report;
        };

        match telegram
            .send_message(&chat_id, &summary_message(summary))
            .await
        {
            Ok(()) => report.summary_sent = true,
            Err(e) => error!("Failed to send summary to telegram: {:#}", e),
        }

        if let Some(text) = analysis.map(|a| a.text).filter(|t| !t.is_empty()) {
            match telegram.send_message(&chat_id, &analysis_message(&text)).await {
                Ok(()) => report.analysis_sent = true,
                Err(e) => error!("Failed to send analysis to telegram: {:#}", e),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MeetingSummary {
        serde_json::from_str(
            r#"{
                "session_id": "s-1",
                "title": "Daily <standup>",
                "start_time": "10:00",
                "end_time": "10:15",
                "owner": {"name": "Ann", "email": "ann@example.com"},
                "participants": [{"name": "Bob"}, {"name": "Cid", "email": "cid@example.com"}],
                "summary": "Shipped A & B",
                "action_items": [{"text": "Fix build"}],
                "key_questions": [{"text": "Who reviews?"}],
                "topics": [{"text": "Release"}],
                "report_url": "https://report.example/1"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_summary_message_full() {
        let message = summary_message(&sample());

        assert!(message.starts_with("<b>📝 Meeting Summary</b>\n\n"));
        assert!(message.contains("<b>Title:</b> Daily &lt;standup&gt;\n"));
        assert!(message.contains("<b>Time:</b> 10:00 - 10:15\n\n"));
        assert!(message.contains("<b>Owner:</b> Ann (ann@example.com)\n\n"));
        assert!(message.contains("• Bob\n• Cid (cid@example.com)\n"));
        assert!(message.contains("<b>Summary:</b>\nShipped A &amp; B\n\n"));
        assert!(message.contains("<b>Action Items:</b>\n1. Fix build\n"));
        assert!(message.contains("<b>Key Questions:</b>\n1. Who reviews?\n"));
        assert!(message.contains("<b>Topics:</b>\n• Release\n"));
        assert!(message.ends_with(
            "<b>Report:</b> <a href=\"https://report.example/1\">View Full Report</a>\n"
        ));
    }

    #[test]
    fn test_summary_message_skips_empty_sections() {
        let message = summary_message(&MeetingSummary {
            session_id: "s-2".to_string(),
            title: "Retro".to_string(),
            ..Default::default()
        });

        assert!(message.contains("<b>Session ID:</b> s-2"));
        assert!(!message.contains("Owner"));
        assert!(!message.contains("Participants"));
        assert!(!message.contains("Action Items"));
        assert!(!message.contains("Report"));
    }

    #[tokio::test]
    async fn test_relay_without_telegram_or_analyzer() {
        let scrum = Arc::new(ScrumClient::new("http://127.0.0.1:9", None).unwrap());
        let relay = SummaryRelay::new(scrum, None, ChatTarget::default());

        assert_eq!(relay.relay(&sample()).await, RelayReport::default());
    }

    #[tokio::test]
    async fn test_relay_without_chat_sends_nothing() {
        let scrum = Arc::new(ScrumClient::new("http://127.0.0.1:9", None).unwrap());
        let telegram = Arc::new(
            TelegramClient::new("t".to_string(), Some("http://127.0.0.1:9".to_string())).unwrap(),
        );
        let relay = SummaryRelay::new(scrum, Some(telegram), ChatTarget::default());

        let report = relay.relay(&sample()).await;
        assert!(!report.summary_sent);
        assert!(!report.analysis_sent);
    }
}
