//! Telegram chat binding endpoints.

use crate::api::error::{ApiError, ApiResult};
use crate::telegram::{ChatTarget, TelegramClient};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

const CONNECTED_MESSAGE: &str =
    "🤖 <b>AI Scrum Master connected!</b>\n\nMeeting summaries and feedback will be posted to this chat.";

#[derive(Clone)]
pub struct TelegramState {
    pub telegram: Option<Arc<TelegramClient>>,
    pub chat: ChatTarget,
}

#[derive(Debug, Deserialize)]
pub struct SetChatRequest {
    #[serde(default)]
    pub chat_id: String,
}

pub fn router(state: TelegramState) -> Router {
    Router::new()
        .route("/telegram/chat-id", get(discover_chat).post(set_chat))
        .with_state(state)
}

async fn discover_chat(State(state): State<TelegramState>) -> ApiResult<Json<Value>> {
    let telegram = state
        .telegram
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("telegram bot token is not configured"))?;

    let discovered = telegram.discover_group_chat().await.map_err(|e| {
        error!("Telegram chat discovery failed: {:#}", e);
        ApiError::bad_gateway(format!("failed to reach telegram: {:#}", e))
    })?;

    let Some(chat) = discovered else {
        return Ok(Json(json!({
            "is_connected": false,
            "message": "No group chat found. Add the bot to a group and send a message first.",
        })));
    };

    state.chat.set(chat.chat_id.clone()).await;
    info!("Telegram chat bound to {} ({})", chat.chat_id, chat.title);

    if let Err(e) = telegram.send_message(&chat.chat_id, CONNECTED_MESSAGE).await {
        warn!("Failed to send connection confirmation: {:#}", e);
    }

    Ok(Json(json!({
        "chat_id": chat.chat_id,
        "is_connected": true,
        "message": format!("Connected to group: {}", chat.title),
    })))
}

async fn set_chat(
    State(state): State<TelegramState>,
    body: Result<Json<SetChatRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) =
        body.map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))?;

    let chat_id = req.chat_id.trim();
    if chat_id.is_empty() {
        return Err(ApiError::bad_request("chat_id is required"));
    }

    state.chat.set(chat_id.to_string()).await;
    info!("Telegram chat set to {}", chat_id);

    Ok(Json(json!({
        "success": true,
        "chat_id": chat_id,
    })))
}
