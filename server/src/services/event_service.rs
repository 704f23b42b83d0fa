use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::event::{
    derive_status, generate_access_code, CheckInStats, CreateEventRequest, Event, EventQuery,
    EventStatus, PrivateEventAccess, UpdateEventRequest,
};
use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::{ApprovalDecision, ApprovalStatus};
use crate::services::notification_service::notify;
use crate::services::venue_service;
use crate::utils::error::{AppError, AppResult};
use crate::utils::pagination::PageParams;
use crate::utils::validation::validate_length;

/// Which side of the dual sign-off a decision comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSide {
    Venue,
    Admin,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Event '{}' was not found", id))
}

pub fn validate_event_request(req: &CreateEventRequest, now: DateTime<Utc>) -> AppResult<()> {
    validate_length("Title", &req.title, 3, 140)?;
    validate_length("Category", &req.category, 2, 40)?;
    if req.ends_at <= req.starts_at {
        return Err(AppError::ValidationError("Event must end after it starts".to_string()));
    }
    if req.starts_at <= now {
        return Err(AppError::ValidationError("Event must start in the future".to_string()));
    }
    if req.capacity <= 0 {
        return Err(AppError::ValidationError("Capacity must be positive".to_string()));
    }
    if req.ticket_price.is_sign_negative() {
        return Err(AppError::ValidationError("Ticket price cannot be negative".to_string()));
    }
    match (&req.venue_id, &req.custom_venue) {
        (Some(_), None) => Ok(()),
        (None, Some(custom)) => {
            validate_length("Venue name", &custom.name, 2, 120)?;
            validate_length("Venue address", &custom.address, 3, 300)?;
            if matches!(&custom.location, Some(point) if !point.is_valid()) {
                return Err(AppError::ValidationError("Location is out of range".to_string()));
            }
            Ok(())
        }
        _ => Err(AppError::ValidationError(
            "Provide exactly one of venue_id or custom_venue".to_string(),
        )),
    }
}

/// Organizer, venue owner and admins may run check-in and see event internals.
pub fn can_manage(user: &AuthUser, event: &Event, venue_owner: Option<Uuid>) -> bool {
    user.is_admin() || user.id == event.organizer_id || venue_owner == Some(user.id)
}

/// Works out both approval columns after `side` decides.
pub fn next_approvals(
    event: &Event,
    side: ReviewSide,
    approve: bool,
) -> AppResult<(ApprovalStatus, ApprovalStatus)> {
    if event.status == EventStatus::Cancelled {
        return Err(AppError::Conflict("Event has been cancelled".to_string()));
    }
    let decision = ApprovalStatus::from_decision(approve);
    match side {
        ReviewSide::Venue if event.venue_approval == ApprovalStatus::Pending => {
            Ok((decision, event.admin_approval))
        }
        ReviewSide::Admin if event.admin_approval == ApprovalStatus::Pending => {
            Ok((event.venue_approval, decision))
        }
        _ => Err(AppError::Conflict(
            "Event is not awaiting this approval".to_string(),
        )),
    }
}

pub async fn fetch_event(pool: &PgPool, id: Uuid) -> AppResult<Event> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 AND is_deleted = FALSE")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn venue_owner_of(pool: &PgPool, event: &Event) -> AppResult<Option<Uuid>> {
    let Some(venue_id) = event.venue_id else {
        return Ok(None);
    };
    let owner = sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM venues WHERE id = $1")
        .bind(venue_id)
        .fetch_optional(pool)
        .await?;
    Ok(owner)
}

pub async fn ensure_can_manage(pool: &PgPool, user: &AuthUser, event: &Event) -> AppResult<()> {
    let venue_owner = venue_owner_of(pool, event).await?;
    if can_manage(user, event, venue_owner) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You do not manage this event".to_string()))
    }
}

pub async fn has_access(conn: &mut PgConnection, event_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let granted: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM private_event_access WHERE event_id = $1 AND user_id = $2)",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(granted)
}

pub fn access_code_matches(event: &Event, code: &str) -> bool {
    event
        .access_code
        .as_deref()
        .map_or(false, |expected| expected.eq_ignore_ascii_case(code.trim()))
}

pub async fn record_access(
    conn: &mut PgConnection,
    event_id: Uuid,
    user_id: Uuid,
) -> AppResult<PrivateEventAccess> {
    let access = sqlx::query_as::<_, PrivateEventAccess>(
        "INSERT INTO private_event_access (id, event_id, user_id)
         VALUES ($1, $2, $3)
         ON CONFLICT (event_id, user_id) DO UPDATE SET event_id = EXCLUDED.event_id
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(access)
}

pub async fn create_event(pool: &PgPool, user: &AuthUser, req: CreateEventRequest) -> AppResult<Event> {
    validate_event_request(&req, Utc::now())?;

    let brand_id: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM brands WHERE owner_id = $1 AND is_verified = TRUE")
            .bind(user.id)
            .fetch_optional(pool)
            .await?;
    if brand_id.is_none() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only verified brands can create events".to_string(),
        ));
    }

    let (venue_approval, venue_owner) = match req.venue_id {
        Some(venue_id) => {
            let venue = venue_service::fetch_venue(pool, venue_id).await?;
            if !venue.is_listed() {
                return Err(AppError::ValidationError("Venue is not available".to_string()));
            }
            if req.capacity > venue.capacity {
                return Err(AppError::ValidationError(format!(
                    "Capacity cannot exceed the venue capacity of {}",
                    venue.capacity
                )));
            }
            let approval = if venue.owner_id == user.id {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::Pending
            };
            (approval, Some(venue.owner_id))
        }
        None => (ApprovalStatus::NotRequired, None),
    };
    let status = derive_status(venue_approval, ApprovalStatus::Pending);
    let access_code = req.is_private.then(generate_access_code);
    let custom = req.custom_venue.as_ref();

    let mut tx = pool.begin().await?;
    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events
             (id, organizer_id, brand_id, title, description, category, starts_at, ends_at,
              venue_id, custom_venue_name, custom_venue_address, custom_latitude, custom_longitude,
              capacity, ticket_price, cover_image_url, is_private, access_code,
              venue_approval, admin_approval, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
                 $19, 'pending', $20)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(brand_id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(req.category.trim().to_lowercase())
    .bind(req.starts_at)
    .bind(req.ends_at)
    .bind(req.venue_id)
    .bind(custom.map(|c| c.name.trim().to_string()))
    .bind(custom.map(|c| c.address.trim().to_string()))
    .bind(custom.and_then(|c| c.location).map(|p| p.lat))
    .bind(custom.and_then(|c| c.location).map(|p| p.lng))
    .bind(req.capacity)
    .bind(req.ticket_price)
    .bind(&req.cover_image_url)
    .bind(req.is_private)
    .bind(access_code)
    .bind(venue_approval)
    .bind(status)
    .fetch_one(&mut *tx)
    .await?;

    if let (Some(owner), ApprovalStatus::Pending) = (venue_owner, venue_approval) {
        notify(
            &mut *tx,
            NewNotification::in_app(
                owner,
                NotificationKind::EventSubmitted,
                "New event request for your venue",
                format!("\"{}\" is waiting for your approval.", event.title),
            )
            .about(event.id),
        )
        .await?;
    }
    tx.commit().await?;

    info!(event_id = %event.id, organizer_id = %user.id, venue_approval = ?venue_approval, "Event submitted");
    Ok(event)
}

pub async fn list_public_events(pool: &PgPool, query: &EventQuery) -> AppResult<Vec<Event>> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT e.* FROM events e LEFT JOIN venues v ON v.id = e.venue_id
         WHERE e.status = 'published' AND e.is_private = FALSE AND e.is_deleted = FALSE",
    );
    if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        qb.push(" AND e.category = ").push_bind(category.trim().to_lowercase());
    }
    if let Some(city) = query.city.as_deref().filter(|c| !c.trim().is_empty()) {
        let city = city.trim().to_string();
        qb.push(" AND (LOWER(v.city) = LOWER(")
            .push_bind(city.clone())
            .push(") OR e.custom_venue_address ILIKE '%' || ")
            .push_bind(city)
            .push(" || '%')");
    }
    if query.upcoming {
        qb.push(" AND e.ends_at > NOW()");
    }
    qb.push(" ORDER BY e.starts_at ASC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let events = qb.build_query_as::<Event>().fetch_all(pool).await?;
    Ok(events.into_iter().map(|e| e.for_viewer(None)).collect())
}

pub async fn get_event_for_viewer(
    pool: &PgPool,
    id: Uuid,
    viewer: Option<&AuthUser>,
) -> AppResult<Event> {
    let event = fetch_event(pool, id).await?;

    let manager = match viewer {
        Some(user) => can_manage(user, &event, venue_owner_of(pool, &event).await?),
        None => false,
    };
    let visible = match viewer {
        _ if manager => true,
        _ if event.status != EventStatus::Published => false,
        _ if !event.is_private => true,
        Some(user) => {
            let mut conn = pool.acquire().await?;
            has_access(&mut conn, event.id, user.id).await?
        }
        None => false,
    };
    if !visible {
        return Err(not_found(id));
    }
    Ok(event.for_viewer(viewer.map(|u| u.id)))
}

pub async fn list_organizer_events(pool: &PgPool, organizer_id: Uuid) -> AppResult<Vec<Event>> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE organizer_id = $1 AND is_deleted = FALSE ORDER BY starts_at DESC",
    )
    .bind(organizer_id)
    .fetch_all(pool)
    .await?;
    Ok(events)
}

/// Events at the caller's venues still waiting for the venue sign-off.
pub async fn list_venue_requests(pool: &PgPool, owner_id: Uuid) -> AppResult<Vec<Event>> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT e.* FROM events e JOIN venues v ON v.id = e.venue_id
         WHERE v.owner_id = $1 AND e.venue_approval = 'pending'
           AND e.status = 'pending' AND e.is_deleted = FALSE
         ORDER BY e.starts_at",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(events.into_iter().map(|e| e.for_viewer(Some(owner_id))).collect())
}

pub async fn list_pending_admin_review(pool: &PgPool) -> AppResult<Vec<Event>> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events
         WHERE admin_approval = 'pending' AND status = 'pending' AND is_deleted = FALSE
         ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(events)
}

pub async fn update_event(
    pool: &PgPool,
    user: &AuthUser,
    id: Uuid,
    req: UpdateEventRequest,
) -> AppResult<Event> {
    let event = fetch_event(pool, id).await?;
    user.ensure_owner(event.organizer_id, "event")?;
    if event.status == EventStatus::Cancelled {
        return Err(AppError::Conflict("Event has been cancelled".to_string()));
    }
    if let Some(title) = req.title.as_deref() {
        validate_length("Title", title, 3, 140)?;
    }
    if let Some(category) = req.category.as_deref() {
        validate_length("Category", category, 2, 40)?;
    }
    if let Some(capacity) = req.capacity {
        if capacity <= 0 {
            return Err(AppError::ValidationError("Capacity must be positive".to_string()));
        }
        if let Some(venue_id) = event.venue_id {
            let venue = venue_service::fetch_venue(pool, venue_id).await?;
            if capacity > venue.capacity {
                return Err(AppError::ValidationError(format!(
                    "Capacity cannot exceed the venue capacity of {}",
                    venue.capacity
                )));
            }
        }
    }

    sqlx::query_as::<_, Event>(
        "UPDATE events SET
             title = COALESCE($2, title),
             description = COALESCE($3, description),
             category = COALESCE($4, category),
             cover_image_url = COALESCE($5, cover_image_url),
             capacity = COALESCE($6, capacity),
             updated_at = NOW()
         WHERE id = $1 AND COALESCE($6, capacity) >= tickets_sold
         RETURNING *",
    )
    .bind(id)
    .bind(req.title.as_deref().map(str::trim))
    .bind(req.description)
    .bind(req.category.as_deref().map(|c| c.trim().to_lowercase()))
    .bind(req.cover_image_url)
    .bind(req.capacity)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Conflict("Capacity cannot drop below tickets sold".to_string()))
}

pub async fn review_event(
    pool: &PgPool,
    actor: &AuthUser,
    id: Uuid,
    side: ReviewSide,
    decision: ApprovalDecision,
) -> AppResult<Event> {
    let mut tx = pool.begin().await?;
    let event = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| not_found(id))?;

    match side {
        ReviewSide::Venue => {
            let venue_id = event.venue_id.ok_or_else(|| {
                AppError::Conflict("Event does not use a listed venue".to_string())
            })?;
            let owner: Uuid = sqlx::query_scalar("SELECT owner_id FROM venues WHERE id = $1")
                .bind(venue_id)
                .fetch_one(&mut *tx)
                .await?;
            actor.ensure_owner(owner, "venue")?;
        }
        ReviewSide::Admin if !actor.is_admin() => {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        ReviewSide::Admin => {}
    }

    let (venue_approval, admin_approval) = next_approvals(&event, side, decision.approve)?;
    let status = derive_status(venue_approval, admin_approval);
    let reason = if decision.approve { None } else { decision.reason };

    let updated = sqlx::query_as::<_, Event>(
        "UPDATE events SET
             venue_approval = $2,
             admin_approval = $3,
             status = $4,
             rejection_reason = COALESCE($5, rejection_reason),
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(venue_approval)
    .bind(admin_approval)
    .bind(status)
    .bind(&reason)
    .fetch_one(&mut *tx)
    .await?;

    let announcement = match updated.status {
        EventStatus::Published => Some((
            NotificationKind::EventApproved,
            "Your event is published".to_string(),
            format!("\"{}\" is now live and on sale.", updated.title),
        )),
        EventStatus::Rejected => Some((
            NotificationKind::EventRejected,
            "Your event was not approved".to_string(),
            reason.unwrap_or_else(|| format!("\"{}\" was rejected.", updated.title)),
        )),
        _ => None,
    };
    if let Some((kind, title, body)) = announcement {
        notify(
            &mut *tx,
            NewNotification::in_app(updated.organizer_id, kind, title, body).about(updated.id),
        )
        .await?;
    }
    tx.commit().await?;

    info!(event_id = %id, actor_id = %actor.id, side = ?side, approved = decision.approve, status = ?updated.status, "Event reviewed");
    Ok(updated.for_viewer(Some(actor.id)))
}

pub async fn cancel_event(pool: &PgPool, user: &AuthUser, id: Uuid) -> AppResult<Event> {
    let mut tx = pool.begin().await?;
    let event = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| not_found(id))?;
    user.ensure_owner(event.organizer_id, "event")?;
    if event.status == EventStatus::Cancelled {
        return Err(AppError::Conflict("Event is already cancelled".to_string()));
    }

    let cancelled = sqlx::query_as::<_, Event>(
        "UPDATE events SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    let holders: Vec<Uuid> = sqlx::query_scalar(
        "UPDATE tickets SET status = 'cancelled', updated_at = NOW()
         WHERE event_id = $1 AND status = 'active'
         RETURNING owner_id",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let refunded = sqlx::query(
        "UPDATE payments SET status = 'refunded', updated_at = NOW()
         WHERE event_id = $1 AND status = 'completed' AND payout_id IS NULL",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let mut notified = holders.clone();
    notified.sort_unstable();
    notified.dedup();
    for holder in notified {
        notify(
            &mut *tx,
            NewNotification::in_app(
                holder,
                NotificationKind::EventCancelled,
                "Event cancelled",
                format!("\"{}\" has been cancelled. Your tickets were refunded.", event.title),
            )
            .about(id),
        )
        .await?;
    }
    tx.commit().await?;

    info!(event_id = %id, tickets_cancelled = holders.len(), payments_refunded = refunded, "Event cancelled");
    Ok(cancelled.for_viewer(Some(user.id)))
}

pub async fn delete_event(pool: &PgPool, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let event = fetch_event(pool, id).await?;
    user.ensure_owner(event.organizer_id, "event")?;

    let result = sqlx::query(
        "UPDATE events SET is_deleted = TRUE, updated_at = NOW()
         WHERE id = $1 AND tickets_sold = 0",
    )
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Events with sold tickets must be cancelled instead".to_string(),
        ));
    }
    info!(event_id = %id, "Event soft-deleted");
    Ok(())
}

pub async fn grant_access(
    pool: &PgPool,
    user: &AuthUser,
    id: Uuid,
    code: &str,
) -> AppResult<PrivateEventAccess> {
    let event = fetch_event(pool, id).await?;
    if !event.is_private || event.status != EventStatus::Published {
        return Err(not_found(id));
    }
    if !access_code_matches(&event, code) {
        return Err(AppError::Forbidden("Invalid access code".to_string()));
    }

    let mut conn = pool.acquire().await?;
    let access = record_access(&mut conn, id, user.id).await?;
    info!(event_id = %id, user_id = %user.id, "Private event access granted");
    Ok(access)
}

pub async fn checkin_stats(pool: &PgPool, user: &AuthUser, id: Uuid) -> AppResult<CheckInStats> {
    let event = fetch_event(pool, id).await?;
    ensure_can_manage(pool, user, &event).await?;
    Ok(event.stats())
}
