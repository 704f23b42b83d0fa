use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::venue::{CreateSlotRequest, CreateVenueRequest, UpdateVenueRequest, VenueQuery};
use crate::services::venue_service;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, empty_success, success};

pub async fn create_venue(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateVenueRequest>,
) -> AppResult<Response> {
    let venue = venue_service::create_venue(&state.pool, &user, req).await?;
    Ok(created(venue, "Venue submitted for approval"))
}

pub async fn list_venues(
    State(state): State<AppState>,
    Query(query): Query<VenueQuery>,
) -> AppResult<Response> {
    let venues = venue_service::list_venues(&state.pool, &query).await?;
    Ok(success(venues, "Venues retrieved"))
}

pub async fn get_venue(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let details = venue_service::get_venue_details(&state.pool, id, viewer.as_ref()).await?;
    Ok(success(details, "Venue retrieved"))
}

pub async fn update_venue(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVenueRequest>,
) -> AppResult<Response> {
    let venue = venue_service::update_venue(&state.pool, &user, id, req).await?;
    Ok(success(venue, "Venue updated"))
}

pub async fn delete_venue(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    venue_service::delete_venue(&state.pool, &user, id).await?;
    Ok(empty_success("Venue deleted"))
}

pub async fn add_slot(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateSlotRequest>,
) -> AppResult<Response> {
    let slot = venue_service::add_slot(&state.pool, &user, id, req).await?;
    Ok(created(slot, "Slot added"))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, slot_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Response> {
    venue_service::delete_slot(&state.pool, &user, id, slot_id).await?;
    Ok(empty_success("Slot removed"))
}
