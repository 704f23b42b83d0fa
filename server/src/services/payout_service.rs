use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::payment::{Payment, Payout, PayoutSplit, PayoutStatus, CURRENCY};
use crate::services::notification_service::notify;
use crate::utils::error::{AppError, AppResult};

/// Settles every completed, not yet settled payment owed to `beneficiary_id`
/// into one pending payout.
pub async fn create_payout(
    pool: &PgPool,
    beneficiary_id: Uuid,
    commission_percent: Decimal,
) -> AppResult<Payout> {
    let mut tx = pool.begin().await?;

    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments
         WHERE beneficiary_id = $1 AND status = 'completed' AND payout_id IS NULL
         FOR UPDATE",
    )
    .bind(beneficiary_id)
    .fetch_all(&mut *tx)
    .await?;
    if payments.is_empty() {
        return Err(AppError::Conflict("Nothing to pay out for this user".to_string()));
    }

    let gross: Decimal = payments.iter().map(|p| p.amount).sum();
    let split = PayoutSplit::compute(gross, commission_percent);
    let payment_ids: Vec<Uuid> = payments.iter().map(|p| p.id).collect();

    let payout = sqlx::query_as::<_, Payout>(
        "INSERT INTO payouts
             (id, beneficiary_id, gross_amount, commission_percent, commission_amount,
              net_amount, currency, status, payments_count)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(beneficiary_id)
    .bind(split.gross)
    .bind(commission_percent)
    .bind(split.commission)
    .bind(split.net)
    .bind(CURRENCY)
    .bind(PayoutStatus::Pending)
    .bind(payment_ids.len() as i32)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE payments SET payout_id = $1, updated_at = NOW() WHERE id = ANY($2)")
        .bind(payout.id)
        .bind(&payment_ids)
        .execute(&mut *tx)
        .await?;

    notify(
        &mut *tx,
        NewNotification::in_app(
            beneficiary_id,
            NotificationKind::PayoutCreated,
            "Payout scheduled",
            format!(
                "{} {} net ({} gross, {} commission) is on its way.",
                split.net, CURRENCY, split.gross, split.commission
            ),
        )
        .about(payout.id),
    )
    .await?;
    tx.commit().await?;

    info!(
        payout_id = %payout.id,
        beneficiary_id = %beneficiary_id,
        gross = %split.gross,
        net = %split.net,
        payments = payment_ids.len(),
        "Payout created"
    );
    Ok(payout)
}

pub async fn mark_paid(pool: &PgPool, id: Uuid) -> AppResult<Payout> {
    let mut tx = pool.begin().await?;

    let Some(payout) = sqlx::query_as::<_, Payout>(
        "UPDATE payouts SET status = 'paid', paid_at = NOW()
         WHERE id = $1 AND status = 'pending'
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payouts WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        return Err(if exists {
            AppError::Conflict("Only pending payouts can be marked as paid".to_string())
        } else {
            AppError::NotFound(format!("Payout '{}' was not found", id))
        });
    };

    notify(
        &mut *tx,
        NewNotification::in_app(
            payout.beneficiary_id,
            NotificationKind::PayoutPaid,
            "Payout sent",
            format!("{} {} has been paid out.", payout.net_amount, payout.currency),
        )
        .about(payout.id),
    )
    .await?;
    tx.commit().await?;

    info!(payout_id = %id, "Payout marked as paid");
    Ok(payout)
}

pub async fn list_payouts(pool: &PgPool, status: Option<PayoutStatus>) -> AppResult<Vec<Payout>> {
    let payouts = sqlx::query_as::<_, Payout>(
        "SELECT * FROM payouts WHERE ($1::payout_status IS NULL OR status = $1)
         ORDER BY created_at DESC",
    )
    .bind(status)
    .fetch_all(pool)
    .await?;
    Ok(payouts)
}

pub async fn list_beneficiary_payouts(pool: &PgPool, beneficiary_id: Uuid) -> AppResult<Vec<Payout>> {
    let payouts = sqlx::query_as::<_, Payout>(
        "SELECT * FROM payouts WHERE beneficiary_id = $1 ORDER BY created_at DESC",
    )
    .bind(beneficiary_id)
    .fetch_all(pool)
    .await?;
    Ok(payouts)
}

pub async fn list_beneficiary_payments(pool: &PgPool, beneficiary_id: Uuid) -> AppResult<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE beneficiary_id = $1 ORDER BY created_at DESC LIMIT 500",
    )
    .bind(beneficiary_id)
    .fetch_all(pool)
    .await?;
    Ok(payments)
}
