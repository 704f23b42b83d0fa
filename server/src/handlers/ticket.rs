use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::ticket::{PurchaseRequest, ScanRequest};
use crate::services::{checkin, ticket_service};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, success};

pub async fn purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PurchaseRequest>,
) -> AppResult<Response> {
    let receipt = ticket_service::purchase(&state.pool, &user, req).await?;
    Ok(created(receipt, "Tickets purchased"))
}

pub async fn my_tickets(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let tickets = ticket_service::list_user_tickets(&state.pool, user.id).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let ticket = ticket_service::get_ticket(&state.pool, &user, id).await?;
    Ok(success(ticket, "Ticket retrieved"))
}

/// Raw SVG, not wrapped in the JSON envelope.
pub async fn ticket_qr(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let svg = ticket_service::ticket_qr(&state.pool, &user, id).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

pub async fn scan(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ScanRequest>,
) -> AppResult<Response> {
    let result = checkin::scan_ticket(&state.pool, &state.scan_guard, &user, req).await?;
    let message = result.message.clone();
    Ok(success(result, message))
}
