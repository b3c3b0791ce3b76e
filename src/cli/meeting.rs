//! CLI handler for meeting commands.
//!
//! All commands communicate with a running gateway over its HTTP API.

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;
use serde_json::{json, Value};

use crate::cli::args::{MeetingCliArgs, MeetingCommand};
use crate::config::Config;

pub async fn handle_meeting_command(args: MeetingCliArgs) -> Result<()> {
    let base_url = match args.api_url {
        Some(url) => url,
        None => default_api_url()?,
    };
    let client = ApiClient::new(&base_url)?;

    match args.command {
        MeetingCommand::Start { url } => start_meeting(&client, &url).await,
        MeetingCommand::Stop { bot_id } => stop_meeting(&client, &bot_id).await,
        MeetingCommand::Status { bot_id } => show_status(&client, &bot_id).await,
        MeetingCommand::Transcript { bot_id } => show_transcript(&client, &bot_id).await,
        MeetingCommand::List => list_meetings(&client).await,
    }
}

fn default_api_url() -> Result<String> {
    let config = Config::load()?;
    Ok(format!("http://127.0.0.1:{}", config.server.port))
}

struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid gateway URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid gateway URL: {}", base_url);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    /// Builds `<base>/api/v1/<segments...>`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid gateway URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> Result<Value> {
        let response = self
            .client
            .get(self.url(segments)?)
            .send()
            .await
            .context("Failed to connect to meet gateway. Is it running?")?;
        read_json(response).await
    }

    async fn post(&self, segments: &[&str], body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(self.url(segments)?)
            .json(body)
            .send()
            .await
            .context("Failed to connect to meet gateway. Is it running?")?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let json: Value = response
        .json()
        .await
        .with_context(|| format!("Invalid response from gateway (status {})", status))?;

    if !status.is_success() {
        bail!("{}", error_message(&json));
    }

    Ok(json)
}

fn error_message(json: &Value) -> &str {
    json.get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error")
}

fn str_field<'a>(json: &'a Value, key: &str) -> &'a str {
    json.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

async fn start_meeting(client: &ApiClient, url: &str) -> Result<()> {
    let json = client
        .post(&["meetings", "start"], &json!({ "meeting_url": url }))
        .await
        .context("Failed to start meeting")?;

    println!(
        "Bot joined (bot id: {}, meeting id: {})",
        str_field(&json, "bot_id"),
        str_field(&json, "meeting_id")
    );
    println!("{}", str_field(&json, "message"));

    Ok(())
}

async fn stop_meeting(client: &ApiClient, bot_id: &str) -> Result<()> {
    client
        .post(&["meetings", bot_id, "stop"], &json!({}))
        .await
        .context("Failed to stop meeting")?;

    println!("Bot {} left the meeting", bot_id);
    Ok(())
}

async fn show_status(client: &ApiClient, bot_id: &str) -> Result<()> {
    let json = client
        .get(&["meetings", bot_id, "status"])
        .await
        .context("Failed to get meeting status")?;

    print_session(&json);
    Ok(())
}

async fn show_transcript(client: &ApiClient, bot_id: &str) -> Result<()> {
    let json = client
        .get(&["meetings", bot_id, "transcription"])
        .await
        .context("Failed to get transcript")?;

    let text = str_field(&json, "full_text");
    if text.is_empty() {
        println!("Transcript is empty so far.");
    } else {
        print!("{}", text);
    }

    Ok(())
}

async fn list_meetings(client: &ApiClient) -> Result<()> {
    let json = client
        .get(&["meetings"])
        .await
        .context("Failed to list meetings")?;

    let meetings = json
        .get("meetings")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    if meetings.is_empty() {
        println!("No meetings are being tracked.");
        return Ok(());
    }

    for meeting in &meetings {
        let elapsed = meeting
            .get("elapsed_seconds")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let feedback = meeting
            .get("feedback_sent")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        println!(
            "{} [{}] {} - {}{}",
            str_field(meeting, "bot_id"),
            str_field(meeting, "meeting_id"),
            format_elapsed(elapsed),
            str_field(meeting, "meeting_url"),
            if feedback { " (feedback sent)" } else { "" }
        );
    }

    Ok(())
}

fn print_session(json: &Value) {
    let elapsed = json
        .get("elapsed_seconds")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let feedback = json
        .get("feedback_sent")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    println!("Bot: {}", str_field(json, "bot_id"));
    println!("Meeting: {}", str_field(json, "meeting_id"));
    println!("URL: {}", str_field(json, "meeting_url"));
    println!("Started: {}", str_field(json, "started_at"));
    println!("Elapsed: {}", format_elapsed(elapsed));
    println!("Feedback sent: {}", if feedback { "yes" } else { "no" });
}
