use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::notification::{NewNotification, Notification};
use crate::utils::error::{AppError, AppResult};

/// Writes a notification on the caller's connection so it commits or rolls
/// back together with the change it announces.
pub async fn notify(conn: &mut PgConnection, notification: NewNotification) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, channel, title, body, reference_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::new_v4())
    .bind(notification.user_id)
    .bind(notification.kind)
    .bind(notification.channel)
    .bind(&notification.title)
    .bind(&notification.body)
    .bind(notification.reference_id)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        user_id = %notification.user_id,
        kind = ?notification.kind,
        channel = ?notification.channel,
        "Notification queued"
    );
    Ok(())
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    unread_only: bool,
) -> AppResult<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications
         WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
         ORDER BY created_at DESC
         LIMIT 200",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(pool)
    .await?;
    Ok(notifications)
}

pub async fn mark_read(pool: &PgPool, user_id: Uuid, id: Uuid) -> AppResult<Notification> {
    sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = TRUE
         WHERE id = $1 AND user_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Notification '{}' was not found", id)))
}

pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
