use crate::api::{ApiServer, AppState};
use crate::config::Config;
use crate::feedback::{ScrumClient, ScrumNotifier};
use crate::monitor::SessionMonitor;
use crate::telegram::{ChatTarget, TelegramClient};
use crate::transcription::FirefliesProvider;
use crate::webhook::SummaryRelay;
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting meet gateway");

    let config = Config::load()?;

    let provider = Arc::new(FirefliesProvider::new(config.fireflies.provider_config())?);
    let scrum = Arc::new(ScrumClient::new(
        &config.scrum.base_url(),
        Some(config.scrum.analyze_url.clone()),
    )?);
    let telegram = build_telegram(&config)?;
    let chat = ChatTarget::new(Some(config.telegram.chat_id.clone()));

    let notifier = Arc::new(ScrumNotifier::new(
        scrum.clone(),
        telegram.clone(),
        chat.clone(),
    ));
    let relay = Arc::new(SummaryRelay::new(scrum, telegram.clone(), chat.clone()));

    let monitor = SessionMonitor::new(provider, notifier, config.monitor.feedback_delay());

    let api_server = ApiServer::new(
        &config,
        AppState {
            monitor: monitor.clone(),
            relay,
            telegram,
            chat,
        },
    );

    info!(
        "Meet gateway is ready! Feedback is sent {}s after a bot joins",
        monitor.feedback_delay().as_secs()
    );

    let result = api_server.start(shutdown_signal()).await;
    if let Err(e) = &result {
        error!("API server failed: {:#}", e);
    }

    monitor.shutdown().await;
    info!("Meet gateway stopped");

    result
}

fn build_telegram(config: &Config) -> Result<Option<Arc<TelegramClient>>> {
    if config.telegram.bot_token.is_empty() {
        warn!("Telegram bot token not configured; feedback will only be logged");
        return Ok(None);
    }

    let client = TelegramClient::new(
        config.telegram.bot_token.clone(),
        Some(config.telegram.api_base.clone()),
    )?;
    Ok(Some(Arc::new(client)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
