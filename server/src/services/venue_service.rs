use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::venue::{
    CreateSlotRequest, CreateVenueRequest, UpdateVenueRequest, Venue, VenueDetails, VenueListing,
    VenueQuery, VenueSlot,
};
use crate::models::{ApprovalDecision, ApprovalStatus};
use crate::services::notification_service::notify;
use crate::utils::error::{AppError, AppResult};
use crate::utils::geo::{BoundingBox, GeoPoint, EARTH_RADIUS_KM};
use crate::utils::pagination::PageParams;
use crate::utils::validation::validate_length;

fn validate_venue_fields(
    capacity: Option<i32>,
    price: Option<rust_decimal::Decimal>,
    location: Option<&GeoPoint>,
) -> AppResult<()> {
    if matches!(capacity, Some(c) if c <= 0) {
        return Err(AppError::ValidationError("Capacity must be positive".to_string()));
    }
    if matches!(price, Some(p) if p.is_sign_negative()) {
        return Err(AppError::ValidationError("Price cannot be negative".to_string()));
    }
    if matches!(location, Some(point) if !point.is_valid()) {
        return Err(AppError::ValidationError("Location is out of range".to_string()));
    }
    Ok(())
}

pub async fn fetch_venue(pool: &PgPool, id: Uuid) -> AppResult<Venue> {
    sqlx::query_as::<_, Venue>("SELECT * FROM venues WHERE id = $1 AND is_deleted = FALSE")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Venue '{}' was not found", id)))
}

pub async fn create_venue(pool: &PgPool, owner: &AuthUser, req: CreateVenueRequest) -> AppResult<Venue> {
    validate_length("Name", &req.name, 2, 120)?;
    validate_length("Address", &req.address, 3, 300)?;
    validate_length("City", &req.city, 2, 80)?;
    validate_venue_fields(Some(req.capacity), Some(req.price_per_hour), Some(&req.location))?;

    let venue = sqlx::query_as::<_, Venue>(
        "INSERT INTO venues
             (id, owner_id, name, description, address, city, latitude, longitude,
              capacity, price_per_hour, amenities, image_urls)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(owner.id)
    .bind(req.name.trim())
    .bind(req.description)
    .bind(req.address.trim())
    .bind(req.city.trim())
    .bind(req.location.lat)
    .bind(req.location.lng)
    .bind(req.capacity)
    .bind(req.price_per_hour)
    .bind(&req.amenities)
    .bind(&req.image_urls)
    .fetch_one(pool)
    .await?;

    info!(venue_id = %venue.id, owner_id = %owner.id, "Venue submitted for approval");
    Ok(venue)
}

pub async fn list_venues(pool: &PgPool, query: &VenueQuery) -> AppResult<Vec<VenueListing>> {
    let page = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT * FROM venues WHERE approval_status = 'approved' AND is_deleted = FALSE",
    );
    if let Some(city) = query.city.as_deref().filter(|c| !c.trim().is_empty()) {
        qb.push(" AND LOWER(city) = LOWER(").push_bind(city.trim().to_string()).push(")");
    }
    if let Some(min_capacity) = query.min_capacity {
        qb.push(" AND capacity >= ").push_bind(min_capacity);
    }

    let Some((center, radius_km)) = query.near() else {
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let venues = qb.build_query_as::<Venue>().fetch_all(pool).await?;
        return Ok(venues
            .into_iter()
            .map(|venue| VenueListing { venue, distance_km: None })
            .collect());
    };

    if !center.is_valid() {
        return Err(AppError::ValidationError("Location is out of range".to_string()));
    }
    push_bounding_box(&mut qb, &center.bounding_box(radius_km));
    qb.push(" AND ");
    push_distance_km(&mut qb, center);
    qb.push(" <= ").push_bind(radius_km).push(" ORDER BY ");
    push_distance_km(&mut qb, center);
    qb.push(", id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let venues = qb.build_query_as::<Venue>().fetch_all(pool).await?;
    Ok(rank_by_distance(venues, center))
}

/// Index-friendly prefilter; wrapped longitude spans become an OR.
fn push_bounding_box(qb: &mut QueryBuilder<'_, Postgres>, bbox: &BoundingBox) {
    qb.push(" AND latitude BETWEEN ")
        .push_bind(bbox.min_lat)
        .push(" AND ")
        .push_bind(bbox.max_lat);
    if bbox.lng_ranges.is_empty() {
        return;
    }
    qb.push(" AND (");
    for (i, (west, east)) in bbox.lng_ranges.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push("longitude BETWEEN ")
            .push_bind(*west)
            .push(" AND ")
            .push_bind(*east);
    }
    qb.push(")");
}

/// Haversine distance in km from `center` to the row's coordinates.
fn push_distance_km(qb: &mut QueryBuilder<'_, Postgres>, center: GeoPoint) {
    qb.push("(2 * ")
        .push_bind(EARTH_RADIUS_KM)
        .push(" * ASIN(LEAST(1.0, SQRT(POWER(SIN(RADIANS(latitude - ")
        .push_bind(center.lat)
        .push(") / 2), 2) + COS(RADIANS(")
        .push_bind(center.lat)
        .push(")) * COS(RADIANS(latitude)) * POWER(SIN(RADIANS(longitude - ")
        .push_bind(center.lng)
        .push(") / 2), 2)))))");
}

/// Attaches distances and orders nearest first. Radius filtering and paging
/// already happened in SQL.
pub fn rank_by_distance(venues: Vec<Venue>, center: GeoPoint) -> Vec<VenueListing> {
    let mut ranked: Vec<VenueListing> = venues
        .into_iter()
        .map(|venue| {
            let distance = center.distance_km(&venue.location());
            VenueListing {
                venue,
                distance_km: Some((distance * 100.0).round() / 100.0),
            }
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

pub async fn get_venue_details(
    pool: &PgPool,
    id: Uuid,
    viewer: Option<&AuthUser>,
) -> AppResult<VenueDetails> {
    let venue = fetch_venue(pool, id).await?;
    let privileged = viewer.map_or(false, |v| v.is_admin() || v.id == venue.owner_id);
    if venue.approval_status != ApprovalStatus::Approved && !privileged {
        return Err(AppError::NotFound(format!("Venue '{}' was not found", id)));
    }

    let available_slots = sqlx::query_as::<_, VenueSlot>(
        "SELECT * FROM venue_slots
         WHERE venue_id = $1 AND is_booked = FALSE AND starts_at > NOW()
         ORDER BY starts_at",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(VenueDetails { venue, available_slots })
}

pub async fn update_venue(
    pool: &PgPool,
    user: &AuthUser,
    id: Uuid,
    req: UpdateVenueRequest,
) -> AppResult<Venue> {
    let venue = fetch_venue(pool, id).await?;
    user.ensure_owner(venue.owner_id, "venue")?;

    if let Some(name) = req.name.as_deref() {
        validate_length("Name", name, 2, 120)?;
    }
    validate_venue_fields(req.capacity, req.price_per_hour, req.location.as_ref())?;

    let updated = sqlx::query_as::<_, Venue>(
        "UPDATE venues SET
             name = COALESCE($2, name),
             description = COALESCE($3, description),
             address = COALESCE($4, address),
             city = COALESCE($5, city),
             latitude = COALESCE($6, latitude),
             longitude = COALESCE($7, longitude),
             capacity = COALESCE($8, capacity),
             price_per_hour = COALESCE($9, price_per_hour),
             amenities = COALESCE($10, amenities),
             image_urls = COALESCE($11, image_urls),
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.description)
    .bind(req.address.as_deref().map(str::trim))
    .bind(req.city.as_deref().map(str::trim))
    .bind(req.location.map(|p| p.lat))
    .bind(req.location.map(|p| p.lng))
    .bind(req.capacity)
    .bind(req.price_per_hour)
    .bind(req.amenities)
    .bind(req.image_urls)
    .fetch_one(pool)
    .await?;

    Ok(updated)
}

pub async fn delete_venue(pool: &PgPool, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let venue = fetch_venue(pool, id).await?;
    user.ensure_owner(venue.owner_id, "venue")?;

    sqlx::query("UPDATE venues SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    info!(venue_id = %id, "Venue soft-deleted");
    Ok(())
}

pub async fn add_slot(
    pool: &PgPool,
    user: &AuthUser,
    venue_id: Uuid,
    req: CreateSlotRequest,
) -> AppResult<VenueSlot> {
    if req.ends_at <= req.starts_at {
        return Err(AppError::ValidationError("Slot must end after it starts".to_string()));
    }
    if req.starts_at <= Utc::now() {
        return Err(AppError::ValidationError("Slot must start in the future".to_string()));
    }

    let mut tx = pool.begin().await?;

    // Locking the venue row serialises slot creation per venue.
    let owner_id: Uuid = sqlx::query_scalar(
        "SELECT owner_id FROM venues WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
    )
    .bind(venue_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Venue '{}' was not found", venue_id)))?;
    user.ensure_owner(owner_id, "venue")?;

    let overlaps: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM venue_slots
             WHERE venue_id = $1 AND starts_at < $3 AND ends_at > $2
         )",
    )
    .bind(venue_id)
    .bind(req.starts_at)
    .bind(req.ends_at)
    .fetch_one(&mut *tx)
    .await?;
    if overlaps {
        return Err(AppError::Conflict("Slot overlaps an existing slot".to_string()));
    }

    let slot = sqlx::query_as::<_, VenueSlot>(
        "INSERT INTO venue_slots (id, venue_id, starts_at, ends_at)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(venue_id)
    .bind(req.starts_at)
    .bind(req.ends_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(slot)
}

pub async fn delete_slot(
    pool: &PgPool,
    user: &AuthUser,
    venue_id: Uuid,
    slot_id: Uuid,
) -> AppResult<()> {
    let venue = fetch_venue(pool, venue_id).await?;
    user.ensure_owner(venue.owner_id, "venue")?;

    let result = sqlx::query(
        "DELETE FROM venue_slots WHERE id = $1 AND venue_id = $2 AND is_booked = FALSE",
    )
    .bind(slot_id)
    .bind(venue_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Slot does not exist or has already been booked".to_string(),
        ));
    }
    Ok(())
}

pub async fn list_owner_venues(pool: &PgPool, owner_id: Uuid) -> AppResult<Vec<Venue>> {
    let venues = sqlx::query_as::<_, Venue>(
        "SELECT * FROM venues WHERE owner_id = $1 AND is_deleted = FALSE ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(venues)
}

pub async fn list_pending_venues(pool: &PgPool) -> AppResult<Vec<Venue>> {
    let venues = sqlx::query_as::<_, Venue>(
        "SELECT * FROM venues
         WHERE approval_status = 'pending' AND is_deleted = FALSE
         ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(venues)
}

pub async fn review_venue(
    pool: &PgPool,
    admin: &AuthUser,
    id: Uuid,
    decision: ApprovalDecision,
) -> AppResult<Venue> {
    let status = ApprovalStatus::from_decision(decision.approve);
    let mut tx = pool.begin().await?;

    let venue = sqlx::query_as::<_, Venue>(
        "UPDATE venues SET approval_status = $2, rejection_reason = $3, updated_at = NOW()
         WHERE id = $1 AND is_deleted = FALSE AND approval_status = 'pending'
         RETURNING *",
    )
    .bind(id)
    .bind(status)
    .bind(if decision.approve { None } else { decision.reason.clone() })
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::Conflict("Venue is not awaiting approval".to_string()))?;

    let (kind, title) = if decision.approve {
        (NotificationKind::VenueApproved, "Your venue is live")
    } else {
        (NotificationKind::VenueRejected, "Your venue was not approved")
    };
    let body = decision
        .reason
        .unwrap_or_else(|| format!("{} has been reviewed.", venue.name));
    notify(&mut *tx, NewNotification::in_app(venue.owner_id, kind, title, body).about(venue.id)).await?;

    tx.commit().await?;
    info!(venue_id = %id, admin_id = %admin.id, approved = decision.approve, "Venue reviewed");
    Ok(venue)
}
