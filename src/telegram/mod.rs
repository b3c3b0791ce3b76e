//! Telegram Bot API client and the chat the gateway delivers to.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub mod format;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Shared handle to the currently bound chat.
#[derive(Clone, Default)]
pub struct ChatTarget {
    inner: Arc<RwLock<Option<String>>>,
}

impl ChatTarget {
    pub fn new(chat_id: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chat_id.filter(|id| !id.is_empty()))),
        }
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, chat_id: String) {
        *self.inner.write().await = Some(chat_id);
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

/// A group chat the bot has seen a message in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredChat {
    pub chat_id: String,
    pub title: String,
}

pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String, api_base: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client for Telegram")?;
        let api_base = api_base
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            api_base,
            token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Sends an HTML-formatted message.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        debug!("Sending Telegram message to {} ({} chars)", chat_id, text.len());

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage {
                chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await
            .context("Failed to send telegram message")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("telegram API returned status {}: {}", status, body);
        }

        Ok(())
    }

    /// Finds the most recent group chat the bot received a message in.
    pub async fn discover_group_chat(&self) -> Result<Option<DiscoveredChat>> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .send()
            .await
            .context("Failed to fetch updates from Telegram")?;

        let updates: UpdatesResponse = response
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        if !updates.ok {
            bail!("Telegram getUpdates returned ok=false");
        }

        let chat = latest_group_chat(&updates.result);
        if let Some(chat) = &chat {
            info!("Discovered Telegram group chat {} ({})", chat.chat_id, chat.title);
        }
        Ok(chat)
    }
}

fn latest_group_chat(updates: &[Update]) -> Option<DiscoveredChat> {
    updates
        .iter()
        .rev()
        .filter_map(|u| u.message.as_ref())
        .find(|m| m.chat.kind == "group" || m.chat.kind == "supergroup")
        .map(|m| DiscoveredChat {
            chat_id: m.chat.id.to_string(),
            title: m.chat.title.clone().unwrap_or_default(),
        })
}
