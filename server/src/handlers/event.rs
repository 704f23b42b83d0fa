use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::event::{AccessCodeRequest, CreateEventRequest, EventQuery, UpdateEventRequest};
use crate::models::ApprovalDecision;
use crate::services::event_service::{self, ReviewSide};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, empty_success, success};

pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> AppResult<Response> {
    let event = event_service::create_event(&state.pool, &user, req).await?;
    Ok(created(event, "Event submitted for approval"))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> AppResult<Response> {
    let events = event_service::list_public_events(&state.pool, &query).await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let event = event_service::get_event_for_viewer(&state.pool, id, viewer.as_ref()).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn my_events(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let events = event_service::list_organizer_events(&state.pool, user.id).await?;
    Ok(success(events, "Events retrieved"))
}

/// Events waiting for the caller's sign-off as venue owner.
pub async fn venue_requests(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let events = event_service::list_venue_requests(&state.pool, user.id).await?;
    Ok(success(events, "Venue requests retrieved"))
}

pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> AppResult<Response> {
    let event = event_service::update_event(&state.pool, &user, id, req).await?;
    Ok(success(event, "Event updated"))
}

pub async fn venue_approval(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(decision): Json<ApprovalDecision>,
) -> AppResult<Response> {
    let event = event_service::review_event(&state.pool, &user, id, ReviewSide::Venue, decision).await?;
    Ok(success(event, "Venue decision recorded"))
}

pub async fn cancel_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let event = event_service::cancel_event(&state.pool, &user, id).await?;
    Ok(success(event, "Event cancelled"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    event_service::delete_event(&state.pool, &user, id).await?;
    Ok(empty_success("Event deleted"))
}

pub async fn request_access(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AccessCodeRequest>,
) -> AppResult<Response> {
    let access = event_service::grant_access(&state.pool, &user, id, &req.access_code).await?;
    Ok(success(access, "Access granted"))
}

pub async fn checkin_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let stats = event_service::checkin_stats(&state.pool, &user, id).await?;
    Ok(success(stats, "Check-in stats retrieved"))
}
