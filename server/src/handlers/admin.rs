use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::models::brand::{ReviewVerificationRequest, VerificationQuery};
use crate::models::dashboard::SetActiveRequest;
use crate::models::payment::{CreatePayoutRequest, PayoutQuery};
use crate::models::ApprovalDecision;
use crate::services::event_service::{self, ReviewSide};
use crate::services::{brand_service, dashboard_service, payout_service, venue_service};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::pagination::{Page, PageParams};
use crate::utils::response::{created, success};

pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Response> {
    let stats = dashboard_service::admin_stats(&state.pool).await?;
    Ok(success(stats, "Platform stats retrieved"))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<PageParams>,
) -> AppResult<Response> {
    let users = dashboard_service::list_users(&state.pool, &page).await?;
    Ok(success(Page::new(users, &page), "Users retrieved"))
}

pub async fn set_user_active(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetActiveRequest>,
) -> AppResult<Response> {
    let user = dashboard_service::set_user_active(&state.pool, &admin, id, req.active).await?;
    Ok(success(user, "User updated"))
}

pub async fn pending_venues(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Response> {
    let venues = venue_service::list_pending_venues(&state.pool).await?;
    Ok(success(venues, "Pending venues retrieved"))
}

pub async fn review_venue(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(decision): Json<ApprovalDecision>,
) -> AppResult<Response> {
    let venue = venue_service::review_venue(&state.pool, &admin, id, decision).await?;
    Ok(success(venue, "Venue decision recorded"))
}

pub async fn pending_events(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Response> {
    let events = event_service::list_pending_admin_review(&state.pool).await?;
    Ok(success(events, "Pending events retrieved"))
}

pub async fn review_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(decision): Json<ApprovalDecision>,
) -> AppResult<Response> {
    let event = event_service::review_event(&state.pool, &admin, id, ReviewSide::Admin, decision).await?;
    Ok(success(event, "Event decision recorded"))
}

pub async fn list_verifications(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<VerificationQuery>,
) -> AppResult<Response> {
    let requests = brand_service::list_requests(&state.pool, query.status).await?;
    Ok(success(requests, "Verification requests retrieved"))
}

pub async fn review_verification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewVerificationRequest>,
) -> AppResult<Response> {
    let request = brand_service::review_request(&state.pool, &admin, id, review).await?;
    Ok(success(request, "Verification decision recorded"))
}

pub async fn create_payout(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreatePayoutRequest>,
) -> AppResult<Response> {
    let payout =
        payout_service::create_payout(&state.pool, req.beneficiary_id, state.config.commission_percent)
            .await?;
    Ok(created(payout, "Payout created"))
}

pub async fn mark_payout_paid(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let payout = payout_service::mark_paid(&state.pool, id).await?;
    Ok(success(payout, "Payout marked as paid"))
}

pub async fn list_payouts(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<PayoutQuery>,
) -> AppResult<Response> {
    let payouts = payout_service::list_payouts(&state.pool, query.status).await?;
    Ok(success(payouts, "Payouts retrieved"))
}
