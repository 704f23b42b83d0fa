use axum::{
    extract::{Multipart, State},
    response::Response,
};

use crate::auth::AuthUser;
use crate::services::upload_service;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::created;

/// Stores the multipart field named `file`; other fields are ignored.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field.bytes().await?;

        let stored = upload_service::save_upload(&state.config, &content_type, &data).await?;
        tracing::info!(user_id = %user.id, url = %stored.url, "File uploaded");
        return Ok(created(stored, "File uploaded"));
    }

    Err(AppError::ValidationError("Multipart field 'file' is required".to_string()))
}
