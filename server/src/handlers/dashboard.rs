use axum::{extract::State, response::Response};

use crate::auth::AuthUser;
use crate::services::{booking_service, dashboard_service, payout_service, venue_service};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::success;

pub async fn summary(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let summary = dashboard_service::summary(&state.pool, user.id).await?;
    Ok(success(summary, "Dashboard summary retrieved"))
}

pub async fn bookings(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let bookings = booking_service::list_owner_bookings(&state.pool, user.id).await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn payments(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let payments = payout_service::list_beneficiary_payments(&state.pool, user.id).await?;
    Ok(success(payments, "Payments retrieved"))
}

pub async fn payouts(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let payouts = payout_service::list_beneficiary_payouts(&state.pool, user.id).await?;
    Ok(success(payouts, "Payouts retrieved"))
}

pub async fn venues(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let venues = venue_service::list_owner_venues(&state.pool, user.id).await?;
    Ok(success(venues, "Venues retrieved"))
}
