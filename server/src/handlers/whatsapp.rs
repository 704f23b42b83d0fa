use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::whatsapp_service::{self, VerifyQuery, WebhookPayload};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::success;

pub async fn verify(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> AppResult<Response> {
    let challenge = whatsapp_service::verify(&state.config, &query)?;
    Ok(challenge.into_response())
}

/// Always answers 200 so Meta does not retry deliveries.
pub async fn receive(State(state): State<AppState>, Json(payload): Json<WebhookPayload>) -> Response {
    let relayed = whatsapp_service::handle_inbound(&state.config, &state.http, &payload).await;
    success(json!({ "relayed": relayed }), "Webhook received")
}
