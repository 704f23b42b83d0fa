use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::notification::NotificationQuery;
use crate::services::notification_service;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::success;

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Response> {
    let notifications =
        notification_service::list_for_user(&state.pool, user.id, query.unread_only).await?;
    Ok(success(notifications, "Notifications retrieved"))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let notification = notification_service::mark_read(&state.pool, user.id, id).await?;
    Ok(success(notification, "Notification marked as read"))
}

pub async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let updated = notification_service::mark_all_read(&state.pool, user.id).await?;
    Ok(success(json!({ "updated": updated }), "Notifications marked as read"))
}
