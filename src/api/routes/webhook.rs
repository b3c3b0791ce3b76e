//! Meeting summary webhook endpoint.

use crate::api::error::{ApiError, ApiResult};
use crate::webhook::{MeetingSummary, SummaryRelay};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct WebhookState {
    pub relay: Arc<SummaryRelay>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(receive_summary))
        .with_state(state)
}

async fn receive_summary(
    State(state): State<WebhookState>,
    body: Result<Json<MeetingSummary>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(summary) =
        body.map_err(|e| ApiError::bad_request(format!("invalid webhook payload: {}", e)))?;

    let report = state.relay.relay(&summary).await;
    debug!("Webhook relay finished: {:?}", report);

    Ok(Json(json!({ "message": "received" })))
}
