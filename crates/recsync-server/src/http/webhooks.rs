//! `POST /webhooks`: single-record pushes from the external system.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use recsync_engine::IngestOutcome;

use super::{ApiError, AppState};

/// Header carrying the tenant token.
pub const TOKEN_HEADER: &str = "integration-app-token";

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    success: bool,
    #[serde(flatten)]
    outcome: IngestOutcome,
}

pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let token = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok());

    // An unparseable body still goes through authentication first
    let payload = body.map(|Json(v)| v).unwrap_or(Value::Null);

    let outcome = state.ingest().await?.handle(token, &payload).await?;

    Ok(Json(WebhookResponse {
        success: true,
        outcome,
    }))
}
