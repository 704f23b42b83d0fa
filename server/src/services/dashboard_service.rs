use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::dashboard::{AdminStats, DashboardSummary};
use crate::models::user::User;
use crate::utils::error::{AppError, AppResult};
use crate::utils::pagination::PageParams;

pub async fn summary(pool: &PgPool, user_id: Uuid) -> AppResult<DashboardSummary> {
    let summary = sqlx::query_as::<_, DashboardSummary>(
        "SELECT
             (SELECT COUNT(*) FROM venues WHERE owner_id = $1 AND is_deleted = FALSE) AS venues,
             (SELECT COUNT(*) FROM events WHERE organizer_id = $1 AND is_deleted = FALSE) AS events,
             (SELECT COUNT(*) FROM bookings b JOIN venues v ON v.id = b.venue_id
                 WHERE v.owner_id = $1 AND b.status = 'confirmed') AS bookings_received,
             (SELECT COUNT(*) FROM bookings b JOIN venues v ON v.id = b.venue_id
                 WHERE v.owner_id = $1 AND b.status = 'confirmed' AND b.starts_at > NOW())
                 AS upcoming_bookings,
             (SELECT COALESCE(SUM(tickets_sold), 0)::BIGINT FROM events
                 WHERE organizer_id = $1 AND is_deleted = FALSE AND status <> 'cancelled')
                 AS tickets_sold,
             (SELECT COALESCE(SUM(amount), 0) FROM payments
                 WHERE beneficiary_id = $1 AND status = 'completed') AS gross_revenue,
             (SELECT COALESCE(SUM(net_amount), 0) FROM payouts
                 WHERE beneficiary_id = $1 AND status = 'pending') AS pending_payouts,
             (SELECT COALESCE(SUM(net_amount), 0) FROM payouts
                 WHERE beneficiary_id = $1 AND status = 'paid') AS paid_payouts",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(summary)
}

pub async fn admin_stats(pool: &PgPool) -> AppResult<AdminStats> {
    let stats = sqlx::query_as::<_, AdminStats>(
        "SELECT
             (SELECT COUNT(*) FROM users) AS users,
             (SELECT COUNT(*) FROM venues
                 WHERE approval_status = 'pending' AND is_deleted = FALSE) AS pending_venues,
             (SELECT COUNT(*) FROM events
                 WHERE admin_approval = 'pending' AND status = 'pending' AND is_deleted = FALSE)
                 AS pending_events,
             (SELECT COUNT(*) FROM verification_requests WHERE status = 'pending')
                 AS pending_verifications,
             (SELECT COALESCE(SUM(tickets_sold), 0)::BIGINT FROM events WHERE is_deleted = FALSE)
                 AS tickets_sold,
             (SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'completed')
                 AS gross_revenue,
             (SELECT COALESCE(SUM(commission_amount), 0) FROM payouts WHERE status <> 'failed')
                 AS commission_earned",
    )
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

pub async fn list_users(pool: &PgPool, page: &PageParams) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn set_user_active(pool: &PgPool, admin: &AuthUser, id: Uuid, active: bool) -> AppResult<User> {
    if admin.id == id && !active {
        return Err(AppError::ValidationError(
            "Admins cannot deactivate their own account".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(active)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User '{}' was not found", id)))?;

    info!(user_id = %id, admin_id = %admin.id, active, "User activity changed");
    Ok(user)
}
