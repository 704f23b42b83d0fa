use chrono::Utc;
use qrcode::render::svg;
use qrcode::QrCode;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::event::Event;
use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::payment::{Payment, PaymentStatus, CURRENCY};
use crate::models::ticket::{
    generate_qr_code, PurchaseRequest, Ticket, TicketSummary, MAX_TICKETS_PER_ORDER,
};
use crate::services::event_service::{self, access_code_matches, has_access, record_access};
use crate::services::notification_service::notify;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct PurchaseReceipt {
    pub payment: Payment,
    pub tickets: Vec<Ticket>,
}

pub fn validate_purchase(req: &PurchaseRequest) -> AppResult<()> {
    if req.quantity < 1 || req.quantity > MAX_TICKETS_PER_ORDER {
        return Err(AppError::ValidationError(format!(
            "Quantity must be between 1 and {}",
            MAX_TICKETS_PER_ORDER
        )));
    }
    let reference = req.payment_reference.trim();
    if reference.is_empty() || reference.len() > 128 {
        return Err(AppError::ValidationError(
            "A payment reference of at most 128 characters is required".to_string(),
        ));
    }
    Ok(())
}

pub async fn purchase(pool: &PgPool, buyer: &AuthUser, req: PurchaseRequest) -> AppResult<PurchaseReceipt> {
    validate_purchase(&req)?;
    let event = event_service::fetch_event(pool, req.event_id).await?;
    if !event.is_open_for_sales(Utc::now()) {
        return Err(AppError::Conflict("Event is not on sale".to_string()));
    }

    let mut tx = pool.begin().await?;

    if event.is_private && event.organizer_id != buyer.id && !has_access(&mut *tx, event.id, buyer.id).await? {
        match req.access_code.as_deref() {
            Some(code) if access_code_matches(&event, code) => {
                record_access(&mut *tx, event.id, buyer.id).await?;
            }
            _ => {
                return Err(AppError::Forbidden(
                    "This is a private event. A valid access code is required".to_string(),
                ));
            }
        }
    }

    // Capacity is reserved by a single guarded increment so concurrent buyers
    // can never oversell.
    let reserved = sqlx::query_as::<_, Event>(
        "UPDATE events SET tickets_sold = tickets_sold + $2, updated_at = NOW()
         WHERE id = $1 AND status = 'published' AND is_deleted = FALSE
           AND ends_at > NOW() AND tickets_sold + $2 <= capacity
         RETURNING *",
    )
    .bind(event.id)
    .bind(req.quantity)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::Conflict(format!(
            "Not enough tickets left ({} remaining)",
            (event.capacity - event.tickets_sold).max(0)
        ))
    })?;

    let amount = reserved.ticket_price * Decimal::from(req.quantity);
    let payment = sqlx::query_as::<_, Payment>(
        "INSERT INTO payments
             (id, payer_id, beneficiary_id, event_id, amount, currency, status, provider_reference)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(buyer.id)
    .bind(reserved.organizer_id)
    .bind(reserved.id)
    .bind(amount)
    .bind(CURRENCY)
    .bind(PaymentStatus::Completed)
    .bind(req.payment_reference.trim())
    .fetch_one(&mut *tx)
    .await?;

    let mut tickets = Vec::with_capacity(req.quantity as usize);
    for _ in 0..req.quantity {
        let ticket = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (id, event_id, owner_id, payment_id, qr_code, price)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(reserved.id)
        .bind(buyer.id)
        .bind(payment.id)
        .bind(generate_qr_code())
        .bind(reserved.ticket_price)
        .fetch_one(&mut *tx)
        .await?;
        tickets.push(ticket);
    }

    notify(
        &mut *tx,
        NewNotification::in_app(
            buyer.id,
            NotificationKind::TicketPurchased,
            "Your tickets are ready",
            format!("{} ticket(s) for \"{}\".", req.quantity, reserved.title),
        )
        .about(reserved.id),
    )
    .await?;
    tx.commit().await?;

    info!(
        event_id = %reserved.id,
        buyer_id = %buyer.id,
        quantity = req.quantity,
        tickets_sold = reserved.tickets_sold,
        "Tickets purchased"
    );
    Ok(PurchaseReceipt { payment, tickets })
}

pub async fn list_user_tickets(pool: &PgPool, owner_id: Uuid) -> AppResult<Vec<TicketSummary>> {
    let tickets = sqlx::query_as::<_, TicketSummary>(
        "SELECT t.*, e.title AS event_title, e.starts_at AS event_starts_at, e.ends_at AS event_ends_at
         FROM tickets t JOIN events e ON e.id = t.event_id
         WHERE t.owner_id = $1
         ORDER BY e.starts_at DESC, t.created_at",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(tickets)
}

pub async fn get_ticket(pool: &PgPool, user: &AuthUser, id: Uuid) -> AppResult<Ticket> {
    let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket '{}' was not found", id)))?;

    if ticket.owner_id != user.id {
        let event = event_service::fetch_event(pool, ticket.event_id).await?;
        event_service::ensure_can_manage(pool, user, &event).await?;
    }
    Ok(ticket)
}

pub fn render_qr_svg(payload: &str) -> AppResult<String> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::InternalServerError(format!("QR encoding failed: {}", e)))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// QR image for the holder's own ticket.
pub async fn ticket_qr(pool: &PgPool, user: &AuthUser, id: Uuid) -> AppResult<String> {
    let ticket = get_ticket(pool, user, id).await?;
    if ticket.owner_id != user.id {
        return Err(AppError::Forbidden("Only the ticket holder can view its QR code".to_string()));
    }
    render_qr_svg(&ticket.qr_payload())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase_request(quantity: i32, reference: &str) -> PurchaseRequest {
        PurchaseRequest {
            event_id: Uuid::new_v4(),
            quantity,
            payment_reference: reference.to_string(),
            access_code: None,
        }
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_purchase(&purchase_request(1, "pay_123")).is_ok());
        assert!(validate_purchase(&purchase_request(MAX_TICKETS_PER_ORDER, "pay_123")).is_ok());
        assert!(validate_purchase(&purchase_request(0, "pay_123")).is_err());
        assert!(validate_purchase(&purchase_request(MAX_TICKETS_PER_ORDER + 1, "pay_123")).is_err());
    }

    #[test]
    fn test_reference_required() {
        assert!(validate_purchase(&purchase_request(2, "   ")).is_err());
        assert!(validate_purchase(&purchase_request(2, &"x".repeat(129))).is_err());
    }

    #[test]
    fn test_qr_svg_renders() {
        let svg = render_qr_svg("fira://ticket/FT0123456789ABCDEF").unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));
    }
}
