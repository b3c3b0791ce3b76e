use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::monitor::DEFAULT_FEEDBACK_DELAY;
use crate::transcription::fireflies;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub fireflies: FirefliesSettings,
    pub scrum: ScrumConfig,
    pub telegram: TelegramConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirefliesSettings {
    pub api_key: String,
    pub endpoint: String,
    /// Polls of the active meetings list after asking the bot to join.
    pub join_poll_attempts: u32,
    pub join_poll_interval_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrumConfig {
    pub url: String,
    pub port: u16,
    /// Meeting summary analyzer used by the webhook. Empty disables it.
    pub analyze_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token. Telegram delivery is disabled while empty.
    pub bot_token: String,
    pub api_base: String,
    /// Chat to deliver to until one is bound through the API.
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub feedback_delay_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for FirefliesSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: fireflies::DEFAULT_ENDPOINT.to_string(),
            join_poll_attempts: 5,
            join_poll_interval_seconds: 2,
        }
    }
}

impl Default for ScrumConfig {
    fn default() -> Self {
        Self {
            url: "localhost".to_string(),
            port: 8000,
            analyze_url: String::new(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feedback_delay_seconds: DEFAULT_FEEDBACK_DELAY.as_secs(),
        }
    }
}

impl ScrumConfig {
    pub fn base_url(&self) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            format!("{}:{}", self.url.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.url, self.port)
        }
    }
}

impl FirefliesSettings {
    pub fn provider_config(&self) -> fireflies::FirefliesConfig {
        fireflies::FirefliesConfig {
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            poll_attempts: self.join_poll_attempts.max(1),
            poll_interval: Duration::from_secs(self.join_poll_interval_seconds),
        }
    }
}

impl MonitorConfig {
    pub fn feedback_delay(&self) -> Duration {
        Duration::from_secs(self.feedback_delay_seconds)
    }
}

impl Config {
    /// Loads the config file (creating it with defaults when missing), then
    /// applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_file(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Overrides values from the environment. `lookup` returns the value of
    /// a variable if set.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().context("PORT must be a port number")?;
        }
        if let Some(key) = lookup("FIREFLIES_API_KEY") {
            self.fireflies.api_key = key;
        }
        if let Some(endpoint) = lookup("FIREFLIES_URL") {
            self.fireflies.endpoint = endpoint;
        }
        if let Some(url) = lookup("SCRUM_URL") {
            self.scrum.url = url;
        }
        if let Some(port) = lookup("SCRUM_PORT") {
            self.scrum.port = port.parse().context("SCRUM_PORT must be a port number")?;
        }
        if let Some(url) = lookup("SCRUM_ANALYZE_URL") {
            self.scrum.analyze_url = url;
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }
        if let Some(delay) = lookup("FEEDBACK_DELAY_SECONDS") {
            self.monitor.feedback_delay_seconds = delay
                .parse()
                .context("FEEDBACK_DELAY_SECONDS must be a number of seconds")?;
        }

        if self.fireflies.api_key.is_empty() {
            warn!("Fireflies API key is not set; joining meetings will fail");
        }

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
