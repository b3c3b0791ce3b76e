//! REST API server for the meet gateway.
//!
//! Provides HTTP endpoints for:
//! - Meeting bot control (start, stop, status, transcript, list)
//! - Meeting summary webhook
//! - Telegram chat binding
//! - Health check

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::monitor::SessionMonitor;
use crate::telegram::{ChatTarget, TelegramClient};
use crate::webhook::SummaryRelay;
use anyhow::{Context, Result};
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

pub use routes::meetings::MeetingsState;
pub use routes::telegram::TelegramState;
pub use routes::webhook::WebhookState;

/// Everything the HTTP handlers reach into.
#[derive(Clone)]
pub struct AppState {
    pub monitor: SessionMonitor,
    pub relay: Arc<SummaryRelay>,
    pub telegram: Option<Arc<TelegramClient>>,
    pub chat: ChatTarget,
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/health", get(health))
        .merge(routes::meetings::router(MeetingsState {
            monitor: state.monitor,
        }))
        .merge(routes::webhook::router(WebhookState { relay: state.relay }))
        .merge(routes::telegram::router(TelegramState {
            telegram: state.telegram,
            chat: state.chat,
        }));

    Router::new()
        .route("/", get(status))
        .route("/version", get(version))
        .nest("/api/v1", v1)
        .layer(ServiceBuilder::new())
}

pub struct ApiServer {
    host: String,
    port: u16,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: &Config, state: AppState) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            state,
        }
    }

    /// Serves until `shutdown` resolves, then lets in-flight requests finish.
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state);
        let addr = format!("{}:{}", self.host, self.port);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind API server to {}", addr))?;

        info!("API server listening on http://{}", addr);
        info!("Endpoints:");
        info!("  POST /api/v1/meetings/start                - Send bot into a meeting");
        info!("  POST /api/v1/meetings/:bot_id/stop         - Remove bot from a meeting");
        info!("  GET  /api/v1/meetings/:bot_id/transcription - Fetch transcript");
        info!("  GET  /api/v1/meetings/:bot_id/status       - Session status");
        info!("  GET  /api/v1/meetings                      - List sessions");
        info!("  POST /api/v1/webhook                       - Meeting summary webhook");
        info!("  GET  /api/v1/telegram/chat-id              - Discover Telegram group");
        info!("  POST /api/v1/telegram/chat-id              - Set Telegram chat");
        info!("  GET  /api/v1/health                        - Health check");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("API server failed")?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meet-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "meet-gateway"
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": true }))
}
