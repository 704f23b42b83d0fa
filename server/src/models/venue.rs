use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::ApprovalStatus;
use crate::utils::geo::GeoPoint;

pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 25.0;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity: i32,
    pub price_per_hour: Decimal,
    pub amenities: Vec<String>,
    pub image_urls: Vec<String>,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing, default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Venue {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn is_listed(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved && !self.is_deleted
    }
}

/// A bookable window on a venue's calendar.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VenueSlot {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_booked: bool,
    pub created_at: DateTime<Utc>,
}

impl VenueSlot {
    pub fn overlaps(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.starts_at < ends_at && starts_at < self.ends_at
    }
}

#[derive(Debug, Serialize)]
pub struct VenueDetails {
    #[serde(flatten)]
    pub venue: Venue,
    pub available_slots: Vec<VenueSlot>,
}

#[derive(Debug, Serialize)]
pub struct VenueListing {
    #[serde(flatten)]
    pub venue: Venue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVenueRequest {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub location: GeoPoint,
    pub capacity: i32,
    pub price_per_hour: Decimal,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateVenueRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub location: Option<GeoPoint>,
    pub capacity: Option<i32>,
    pub price_per_hour: Option<Decimal>,
    pub amenities: Option<Vec<String>>,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VenueQuery {
    pub city: Option<String>,
    pub min_capacity: Option<i32>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl VenueQuery {
    pub fn near(&self) -> Option<(GeoPoint, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((
                GeoPoint::new(lat, lng),
                self.radius_km
                    .filter(|r| *r > 0.0)
                    .unwrap_or(DEFAULT_SEARCH_RADIUS_KM),
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn slot(start_h: i64, end_h: i64) -> VenueSlot {
        let base = Utc::now();
        VenueSlot {
            id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            starts_at: base + Duration::hours(start_h),
            ends_at: base + Duration::hours(end_h),
            is_booked: false,
            created_at: base,
        }
    }

    #[test]
    fn test_overlap_is_half_open() {
        let s = slot(10, 12);
        assert!(s.overlaps(s.starts_at + Duration::hours(1), s.ends_at + Duration::hours(1)));
        assert!(!s.overlaps(s.ends_at, s.ends_at + Duration::hours(2)));
        assert!(!s.overlaps(s.starts_at - Duration::hours(2), s.starts_at));
    }

    #[test]
    fn test_query_radius_defaults() {
        let query = VenueQuery {
            lat: Some(6.5),
            lng: Some(3.4),
            radius_km: Some(-1.0),
            ..VenueQuery::default()
        };
        let (_, radius) = query.near().unwrap();
        assert_eq!(radius, DEFAULT_SEARCH_RADIUS_KM);
        assert!(VenueQuery::default().near().is_none());
    }
}
