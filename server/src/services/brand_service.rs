use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::brand::{
    Brand, BrandQuery, CreatePostRequest, Post, ReviewVerificationRequest, UpdateBrandRequest,
    VerificationApplication, VerificationRequest, VerificationStatus,
};
use crate::models::notification::{NewNotification, NotificationKind};
use crate::services::notification_service::notify;
use crate::utils::error::{AppError, AppResult};
use crate::utils::pagination::PageParams;
use crate::utils::validation::validate_length;

const MAX_DOCUMENTS: usize = 10;
const MAX_MEDIA: usize = 10;

pub fn validate_application(app: &VerificationApplication) -> AppResult<()> {
    validate_length("Brand name", &app.brand_name, 2, 80)?;
    if let Some(bio) = app.bio.as_deref() {
        validate_length("Bio", bio, 0, 1000)?;
    }
    if app.document_urls.len() > MAX_DOCUMENTS {
        return Err(AppError::ValidationError(format!(
            "At most {} documents can be attached",
            MAX_DOCUMENTS
        )));
    }
    Ok(())
}

pub fn validate_post(req: &CreatePostRequest) -> AppResult<()> {
    validate_length("Content", &req.content, 1, 2000)?;
    if req.media_urls.len() > MAX_MEDIA {
        return Err(AppError::ValidationError(format!(
            "At most {} media items can be attached",
            MAX_MEDIA
        )));
    }
    Ok(())
}

pub async fn apply_for_verification(
    pool: &PgPool,
    user: &AuthUser,
    app: VerificationApplication,
) -> AppResult<VerificationRequest> {
    validate_application(&app)?;

    sqlx::query_as::<_, VerificationRequest>(
        "INSERT INTO verification_requests (id, user_id, kind, brand_name, bio, document_urls)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(app.kind)
    .bind(app.brand_name.trim())
    .bind(app.bio.as_deref().map(str::trim))
    .bind(&app.document_urls)
    .fetch_one(pool)
    .await
    .map_err(|e| match e.as_database_error() {
        // One pending request per user, enforced by a partial unique index.
        Some(db) if db.is_unique_violation() => {
            AppError::Conflict("You already have a pending verification request".to_string())
        }
        _ => AppError::DatabaseError(e),
    })
}

pub async fn list_user_requests(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<VerificationRequest>> {
    let requests = sqlx::query_as::<_, VerificationRequest>(
        "SELECT * FROM verification_requests WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(requests)
}

pub async fn list_requests(
    pool: &PgPool,
    status: Option<VerificationStatus>,
) -> AppResult<Vec<VerificationRequest>> {
    let requests = sqlx::query_as::<_, VerificationRequest>(
        "SELECT * FROM verification_requests
         WHERE ($1::verification_status IS NULL OR status = $1)
         ORDER BY created_at",
    )
    .bind(status)
    .fetch_all(pool)
    .await?;
    Ok(requests)
}

pub async fn review_request(
    pool: &PgPool,
    admin: &AuthUser,
    id: Uuid,
    review: ReviewVerificationRequest,
) -> AppResult<VerificationRequest> {
    let status = if review.approve {
        VerificationStatus::Approved
    } else {
        VerificationStatus::Rejected
    };

    let mut tx = pool.begin().await?;
    let request = sqlx::query_as::<_, VerificationRequest>(
        "UPDATE verification_requests
         SET status = $2, reviewer_id = $3, review_note = $4, reviewed_at = NOW()
         WHERE id = $1 AND status = 'pending'
         RETURNING *",
    )
    .bind(id)
    .bind(status)
    .bind(admin.id)
    .bind(&review.note)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::Conflict("Verification request is not pending".to_string()))?;

    let notification = if review.approve {
        let brand = sqlx::query_as::<_, Brand>(
            "INSERT INTO brands (id, owner_id, name, kind, bio, is_verified)
             VALUES ($1, $2, $3, $4, $5, TRUE)
             ON CONFLICT (owner_id) DO UPDATE SET
                 name = EXCLUDED.name,
                 kind = EXCLUDED.kind,
                 bio = COALESCE(EXCLUDED.bio, brands.bio),
                 is_verified = TRUE,
                 updated_at = NOW()
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.brand_name)
        .bind(request.kind)
        .bind(&request.bio)
        .fetch_one(&mut *tx)
        .await?;

        NewNotification::in_app(
            request.user_id,
            NotificationKind::VerificationApproved,
            "You're verified",
            format!("{} can now publish events and posts.", brand.name),
        )
        .about(brand.id)
    } else {
        NewNotification::in_app(
            request.user_id,
            NotificationKind::VerificationRejected,
            "Verification declined",
            review
                .note
                .clone()
                .unwrap_or_else(|| "Your verification request was declined.".to_string()),
        )
        .about(request.id)
    };
    notify(&mut *tx, notification).await?;
    tx.commit().await?;

    info!(request_id = %id, admin_id = %admin.id, approved = review.approve, "Verification reviewed");
    Ok(request)
}

pub async fn list_brands(pool: &PgPool, query: &BrandQuery) -> AppResult<Vec<Brand>> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let brands = sqlx::query_as::<_, Brand>(
        "SELECT * FROM brands
         WHERE is_verified = TRUE AND ($1::brand_kind IS NULL OR kind = $1)
         ORDER BY name
         LIMIT $2 OFFSET $3",
    )
    .bind(query.kind)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok(brands)
}

pub async fn get_brand(pool: &PgPool, id: Uuid) -> AppResult<Brand> {
    sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE id = $1 AND is_verified = TRUE")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Brand '{}' was not found", id)))
}

async fn own_verified_brand(pool: &PgPool, owner_id: Uuid) -> AppResult<Brand> {
    sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE owner_id = $1 AND is_verified = TRUE")
        .bind(owner_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::Forbidden("You do not have a verified brand".to_string()))
}

pub async fn update_own_brand(pool: &PgPool, user: &AuthUser, req: UpdateBrandRequest) -> AppResult<Brand> {
    if let Some(bio) = req.bio.as_deref() {
        validate_length("Bio", bio, 0, 1000)?;
    }
    let brand = own_verified_brand(pool, user.id).await?;

    let updated = sqlx::query_as::<_, Brand>(
        "UPDATE brands SET
             bio = COALESCE($2, bio),
             avatar_url = COALESCE($3, avatar_url),
             social_links = COALESCE($4, social_links),
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(brand.id)
    .bind(req.bio.as_deref().map(str::trim))
    .bind(req.avatar_url)
    .bind(req.social_links)
    .fetch_one(pool)
    .await?;
    Ok(updated)
}

pub async fn create_post(pool: &PgPool, user: &AuthUser, req: CreatePostRequest) -> AppResult<Post> {
    validate_post(&req)?;
    let brand = own_verified_brand(pool, user.id).await?;

    let post = sqlx::query_as::<_, Post>(
        "INSERT INTO posts (id, brand_id, author_id, content, media_urls)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(brand.id)
    .bind(user.id)
    .bind(req.content.trim())
    .bind(&req.media_urls)
    .fetch_one(pool)
    .await?;

    info!(post_id = %post.id, brand_id = %brand.id, "Post published");
    Ok(post)
}

pub async fn list_posts(pool: &PgPool, brand_id: Uuid, page: &PageParams) -> AppResult<Vec<Post>> {
    let posts = sqlx::query_as::<_, Post>(
        "SELECT * FROM posts
         WHERE brand_id = $1 AND is_deleted = FALSE
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(brand_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok(posts)
}

pub async fn delete_post(pool: &PgPool, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let author_id: Uuid =
        sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post '{}' was not found", id)))?;
    user.ensure_owner(author_id, "post")?;

    sqlx::query("UPDATE posts SET is_deleted = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::brand::BrandKind;

    #[test]
    fn test_application_rules() {
        let mut app = VerificationApplication {
            kind: BrandKind::Band,
            brand_name: "The Ikoyi Horns".to_string(),
            bio: None,
            document_urls: vec!["/uploads/id.pdf".to_string()],
        };
        assert!(validate_application(&app).is_ok());

        app.document_urls = vec!["/uploads/x.pdf".to_string(); MAX_DOCUMENTS + 1];
        assert!(validate_application(&app).is_err());

        app.document_urls.clear();
        app.brand_name = " ".to_string();
        assert!(validate_application(&app).is_err());
    }

    #[test]
    fn test_post_rules() {
        let ok = CreatePostRequest {
            content: "Tickets for Friday are live!".to_string(),
            media_urls: vec![],
        };
        assert!(validate_post(&ok).is_ok());

        let empty = CreatePostRequest {
            content: "   ".to_string(),
            media_urls: vec![],
        };
        assert!(validate_post(&empty).is_err());

        let long = CreatePostRequest {
            content: "a".repeat(2001),
            media_urls: vec![],
        };
        assert!(validate_post(&long).is_err());
    }
}
