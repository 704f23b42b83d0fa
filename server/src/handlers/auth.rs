use axum::{extract::State, response::Response, Json};

use crate::auth::AuthUser;
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, User};
use crate::services::auth_service;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, success};

fn issue_token(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let token = state.jwt.generate_token(&user)?;
    Ok(AuthResponse {
        token,
        expires_in: state.jwt.ttl_seconds(),
        user,
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let user = auth_service::register(&state.pool, &state.config, req).await?;
    Ok(created(issue_token(&state, user)?, "Account created"))
}

pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> AppResult<Response> {
    let user = auth_service::login(&state.pool, req).await?;
    Ok(success(issue_token(&state, user)?, "Logged in"))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let user = auth_service::get_user(&state.pool, user.id).await?;
    Ok(success(user, "Profile retrieved"))
}

pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Response> {
    let user = auth_service::update_profile(&state.pool, user.id, req).await?;
    Ok(success(user, "Profile updated"))
}
