use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::booking::CreateBookingRequest;
use crate::services::booking_service;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, success};

pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(venue_id): Path<Uuid>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<Response> {
    let booking = booking_service::create_booking(&state.pool, &user, venue_id, req).await?;
    Ok(created(booking, "Booking confirmed"))
}

pub async fn my_bookings(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let bookings = booking_service::list_user_bookings(&state.pool, user.id).await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let booking = booking_service::cancel_booking(&state.pool, &user, id).await?;
    Ok(success(booking, "Booking cancelled"))
}
