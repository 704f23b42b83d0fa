use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::booking::{booking_amount, Booking, BookingStatus, CreateBookingRequest};
use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::payment::{PaymentStatus, CURRENCY};
use crate::models::venue::{Venue, VenueSlot};
use crate::services::notification_service::notify;
use crate::utils::error::{AppError, AppResult};

pub async fn create_booking(
    pool: &PgPool,
    user: &AuthUser,
    venue_id: Uuid,
    req: CreateBookingRequest,
) -> AppResult<Booking> {
    let reference = req.payment_reference.trim();
    if reference.is_empty() || reference.len() > 128 {
        return Err(AppError::ValidationError(
            "A payment reference of at most 128 characters is required".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let venue = sqlx::query_as::<_, Venue>("SELECT * FROM venues WHERE id = $1 AND is_deleted = FALSE")
        .bind(venue_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(Venue::is_listed)
        .ok_or_else(|| AppError::NotFound(format!("Venue '{}' was not found", venue_id)))?;
    if venue.owner_id == user.id {
        return Err(AppError::ValidationError("You cannot book your own venue".to_string()));
    }

    // Claiming the slot is the booking's only contended step.
    let slot = sqlx::query_as::<_, VenueSlot>(
        "UPDATE venue_slots SET is_booked = TRUE
         WHERE id = $1 AND venue_id = $2 AND is_booked = FALSE AND starts_at > NOW()
         RETURNING *",
    )
    .bind(req.slot_id)
    .bind(venue_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::Conflict("This slot is no longer available".to_string()))?;

    let amount = booking_amount(venue.price_per_hour, slot.starts_at, slot.ends_at);
    let booking_id = Uuid::new_v4();

    let payment_id: Uuid = sqlx::query_scalar(
        "INSERT INTO payments
             (id, payer_id, beneficiary_id, booking_id, amount, currency, status, provider_reference)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(venue.owner_id)
    .bind(booking_id)
    .bind(amount)
    .bind(CURRENCY)
    .bind(PaymentStatus::Completed)
    .bind(reference)
    .fetch_one(&mut *tx)
    .await?;

    let booking = sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings
             (id, venue_id, slot_id, user_id, starts_at, ends_at, amount, status, payment_id, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(booking_id)
    .bind(venue.id)
    .bind(slot.id)
    .bind(user.id)
    .bind(slot.starts_at)
    .bind(slot.ends_at)
    .bind(amount)
    .bind(BookingStatus::Confirmed)
    .bind(payment_id)
    .bind(req.notes.as_deref().map(str::trim))
    .fetch_one(&mut *tx)
    .await?;

    let when = slot.starts_at.format("%Y-%m-%d %H:%M UTC");
    notify(
        &mut *tx,
        NewNotification::in_app(
            venue.owner_id,
            NotificationKind::BookingConfirmed,
            "New booking",
            format!("{} was booked for {}.", venue.name, when),
        )
        .about(booking.id),
    )
    .await?;
    notify(
        &mut *tx,
        NewNotification::in_app(
            user.id,
            NotificationKind::BookingConfirmed,
            "Booking confirmed",
            format!("You booked {} for {}.", venue.name, when),
        )
        .about(booking.id),
    )
    .await?;
    tx.commit().await?;

    info!(booking_id = %booking.id, venue_id = %venue.id, user_id = %user.id, amount = %amount, "Venue booked");
    Ok(booking)
}

pub async fn list_user_bookings(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<Booking>> {
    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE user_id = $1 ORDER BY starts_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(bookings)
}

pub async fn list_owner_bookings(pool: &PgPool, owner_id: Uuid) -> AppResult<Vec<Booking>> {
    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT b.* FROM bookings b JOIN venues v ON v.id = b.venue_id
         WHERE v.owner_id = $1
         ORDER BY b.starts_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(bookings)
}

pub async fn cancel_booking(pool: &PgPool, user: &AuthUser, id: Uuid) -> AppResult<Booking> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking '{}' was not found", id)))?;
    let (venue_name, owner_id): (String, Uuid) =
        sqlx::query_as("SELECT name, owner_id FROM venues WHERE id = $1")
            .bind(booking.venue_id)
            .fetch_one(&mut *tx)
            .await?;

    if booking.user_id != user.id {
        user.ensure_owner(owner_id, "booking")?;
    }
    if !booking.can_cancel(Utc::now()) {
        return Err(AppError::Conflict(
            "Only upcoming confirmed bookings can be cancelled".to_string(),
        ));
    }

    if let Some(payment_id) = booking.payment_id {
        let refunded = sqlx::query(
            "UPDATE payments SET status = 'refunded', updated_at = NOW()
             WHERE id = $1 AND status = 'completed' AND payout_id IS NULL",
        )
        .bind(payment_id)
        .execute(&mut *tx)
        .await?;
        if refunded.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "The payment for this booking has already been settled".to_string(),
            ));
        }
    }

    let cancelled = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = 'cancelled', cancelled_at = NOW(), updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE venue_slots SET is_booked = FALSE WHERE id = $1")
        .bind(booking.slot_id)
        .execute(&mut *tx)
        .await?;

    // Tell whoever did not cancel.
    let counterpart = if user.id == booking.user_id { owner_id } else { booking.user_id };
    notify(
        &mut *tx,
        NewNotification::in_app(
            counterpart,
            NotificationKind::BookingCancelled,
            "Booking cancelled",
            format!(
                "The booking of {} for {} was cancelled.",
                venue_name,
                booking.starts_at.format("%Y-%m-%d %H:%M UTC")
            ),
        )
        .about(id),
    )
    .await?;
    tx.commit().await?;

    info!(booking_id = %id, cancelled_by = %user.id, "Booking cancelled");
    Ok(cancelled)
}
