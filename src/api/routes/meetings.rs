//! Meeting bot endpoints.
//!
//! Provides HTTP endpoints for:
//! - Sending a bot into a meeting (POST /meetings/start)
//! - Stopping a tracked bot (POST /meetings/:bot_id/stop)
//! - Fetching a transcript (GET /meetings/:bot_id/transcription)
//! - Getting session status (GET /meetings/:bot_id/status)
//! - Listing tracked sessions (GET /meetings)

use crate::api::error::{ApiError, ApiResult};
use crate::monitor::{SessionMonitor, SessionStatus};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Shared state for meeting routes.
#[derive(Clone)]
pub struct MeetingsState {
    pub monitor: SessionMonitor,
}

#[derive(Debug, Deserialize)]
pub struct StartMeetingRequest {
    #[serde(default)]
    pub meeting_url: String,
}

pub fn router(state: MeetingsState) -> Router {
    Router::new()
        .route("/meetings", get(list_meetings))
        .route("/meetings/start", post(start_meeting))
        .route("/meetings/:bot_id/stop", post(stop_meeting))
        .route("/meetings/:bot_id/transcription", get(get_transcription))
        .route("/meetings/:bot_id/status", get(meeting_status))
        .with_state(state)
}

fn describe_delay(delay: Duration) -> String {
    match delay.as_secs() {
        1 => "1 second".to_string(),
        60 => "1 minute".to_string(),
        secs if secs > 0 && secs % 60 == 0 => format!("{} minutes", secs / 60),
        secs => format!("{} seconds", secs),
    }
}

fn status_json(status: &SessionStatus) -> Value {
    json!({
        "bot_id": status.session_id,
        "meeting_id": status.meeting_id,
        "meeting_url": status.meeting_url,
        "started_at": status.started_at.to_rfc3339(),
        "feedback_sent": status.feedback_sent,
        "elapsed_seconds": status.elapsed.as_secs(),
    })
}

async fn start_meeting(
    State(state): State<MeetingsState>,
    body: Result<Json<StartMeetingRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))?;

    let meeting_url = req.meeting_url.trim();
    if meeting_url.is_empty() {
        return Err(ApiError::bad_request("meeting_url is required"));
    }

    info!("Start meeting request received: {}", meeting_url);

    let joined = state.monitor.start_meeting(meeting_url).await?;

    Ok(Json(json!({
        "success": true,
        "bot_id": joined.session_id,
        "meeting_id": joined.meeting_id,
        "message": format!(
            "Bot joined meeting successfully. Feedback will be sent after {}.",
            describe_delay(state.monitor.feedback_delay())
        ),
    })))
}

async fn stop_meeting(
    State(state): State<MeetingsState>,
    Path(bot_id): Path<String>,
) -> ApiResult<Json<Value>> {
    info!("Stop meeting request received: {}", bot_id);

    state.monitor.stop_meeting(&bot_id).await?;

    Ok(Json(json!({
        "success": true,
        "meeting_id": bot_id,
        "message": "Bot left meeting successfully.",
    })))
}

async fn get_transcription(
    State(state): State<MeetingsState>,
    Path(bot_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let full_text = state.monitor.get_transcription(&bot_id).await?;

    Ok(Json(json!({
        "success": true,
        "meeting_id": bot_id,
        "full_text": full_text,
    })))
}

async fn meeting_status(
    State(state): State<MeetingsState>,
    Path(bot_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let status = state.monitor.get_status(&bot_id).await?;

    let mut body = status_json(&status);
    body["success"] = Value::Bool(true);
    Ok(Json(body))
}

async fn list_meetings(State(state): State<MeetingsState>) -> Json<Value> {
    let meetings: Vec<Value> = state
        .monitor
        .list_sessions()
        .await
        .iter()
        .map(status_json)
        .collect();

    Json(json!({ "meetings": meetings }))
}
