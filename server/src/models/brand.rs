use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "brand_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BrandKind {
    Brand,
    Band,
    Organizer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "verification_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Brand {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub kind: BrandKind,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: Vec<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Onboarding application that turns a user into a verified brand.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: BrandKind,
    pub brand_name: String,
    pub bio: Option<String>,
    pub document_urls: Vec<String>,
    pub status: VerificationStatus,
    pub reviewer_id: Option<Uuid>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub media_urls: Vec<String>,
    #[serde(skip_serializing, default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationApplication {
    pub kind: BrandKind,
    pub brand_name: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub document_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewVerificationRequest {
    pub approve: bool,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBrandRequest {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BrandQuery {
    pub kind: Option<BrandKind>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    pub status: Option<VerificationStatus>,
}
