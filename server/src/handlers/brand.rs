use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::brand::{BrandQuery, CreatePostRequest, UpdateBrandRequest, VerificationApplication};
use crate::services::brand_service;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::pagination::{Page, PageParams};
use crate::utils::response::{created, empty_success, success};

pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    Json(app): Json<VerificationApplication>,
) -> AppResult<Response> {
    let request = brand_service::apply_for_verification(&state.pool, &user, app).await?;
    Ok(created(request, "Verification request submitted"))
}

pub async fn my_requests(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let requests = brand_service::list_user_requests(&state.pool, user.id).await?;
    Ok(success(requests, "Verification requests retrieved"))
}

pub async fn list_brands(
    State(state): State<AppState>,
    Query(query): Query<BrandQuery>,
) -> AppResult<Response> {
    let brands = brand_service::list_brands(&state.pool, &query).await?;
    Ok(success(brands, "Brands retrieved"))
}

pub async fn get_brand(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let brand = brand_service::get_brand(&state.pool, id).await?;
    Ok(success(brand, "Brand retrieved"))
}

pub async fn update_my_brand(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateBrandRequest>,
) -> AppResult<Response> {
    let brand = brand_service::update_own_brand(&state.pool, &user, req).await?;
    Ok(success(brand, "Brand updated"))
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Response> {
    let post = brand_service::create_post(&state.pool, &user, req).await?;
    Ok(created(post, "Post published"))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> AppResult<Response> {
    let posts = brand_service::list_posts(&state.pool, id, &page).await?;
    Ok(success(Page::new(posts, &page), "Posts retrieved"))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    brand_service::delete_post(&state.pool, &user, id).await?;
    Ok(empty_success("Post deleted"))
}
