use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::ApprovalStatus;
use crate::utils::geo::GeoPoint;

pub const ACCESS_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Published,
    Rejected,
    Cancelled,
}

/// Combines the venue owner's and the admin's sign-off into the event status.
/// Either side rejecting wins; both sides must be satisfied to publish.
pub fn derive_status(venue: ApprovalStatus, admin: ApprovalStatus) -> EventStatus {
    if venue == ApprovalStatus::Rejected || admin == ApprovalStatus::Rejected {
        EventStatus::Rejected
    } else if venue.is_satisfied() && admin == ApprovalStatus::Approved {
        EventStatus::Published
    } else {
        EventStatus::Pending
    }
}

pub fn generate_access_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_CODE_LEN)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub venue_id: Option<Uuid>,
    pub custom_venue_name: Option<String>,
    pub custom_venue_address: Option<String>,
    pub custom_latitude: Option<f64>,
    pub custom_longitude: Option<f64>,
    pub capacity: i32,
    pub ticket_price: Decimal,
    pub cover_image_url: Option<String>,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    pub venue_approval: ApprovalStatus,
    pub admin_approval: ApprovalStatus,
    pub status: EventStatus,
    pub rejection_reason: Option<String>,
    pub tickets_sold: i32,
    pub checked_in_count: i32,
    #[serde(skip_serializing, default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_open_for_sales(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::Published && !self.is_deleted && self.ends_at > now
    }

    pub fn stats(&self) -> CheckInStats {
        CheckInStats::from_counts(self.capacity, self.tickets_sold, self.checked_in_count)
    }

    /// Hides the private access code from anyone but the organizer.
    pub fn for_viewer(mut self, viewer: Option<Uuid>) -> Self {
        if viewer != Some(self.organizer_id) {
            self.access_code = None;
        }
        self
    }
}

/// Live check-in progress shown next to the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInStats {
    pub capacity: i32,
    pub tickets_sold: i32,
    pub checked_in: i32,
    pub remaining: i32,
    pub percentage: f64,
}

impl CheckInStats {
    pub fn from_counts(capacity: i32, tickets_sold: i32, checked_in: i32) -> Self {
        let percentage = if tickets_sold > 0 {
            (f64::from(checked_in) / f64::from(tickets_sold) * 1000.0).round() / 10.0
        } else {
            0.0
        };
        Self {
            capacity,
            tickets_sold,
            checked_in,
            remaining: (tickets_sold - checked_in).max(0),
            percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrivateEventAccess {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomVenue {
    pub name: String,
    pub address: String,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub venue_id: Option<Uuid>,
    pub custom_venue: Option<CustomVenue>,
    pub capacity: i32,
    pub ticket_price: Decimal,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub cover_image_url: Option<String>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub category: Option<String>,
    pub city: Option<String>,
    #[serde(default)]
    pub upcoming: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AccessCodeRequest {
    pub access_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApprovalStatus::*;

    #[test]
    fn test_dual_approval() {
        assert_eq!(derive_status(Pending, Pending), EventStatus::Pending);
        assert_eq!(derive_status(Approved, Pending), EventStatus::Pending);
        assert_eq!(derive_status(Pending, Approved), EventStatus::Pending);
        assert_eq!(derive_status(Approved, Approved), EventStatus::Published);
        assert_eq!(derive_status(NotRequired, Approved), EventStatus::Published);
        assert_eq!(derive_status(Rejected, Approved), EventStatus::Rejected);
        assert_eq!(derive_status(Approved, Rejected), EventStatus::Rejected);
        assert_eq!(derive_status(NotRequired, Pending), EventStatus::Pending);
    }

    #[test]
    fn test_access_code_shape() {
        let code = generate_access_code();
        assert_eq!(code.len(), ACCESS_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_stats() {
        let stats = CheckInStats::from_counts(500, 200, 50);
        assert_eq!(stats.remaining, 150);
        assert_eq!(stats.percentage, 25.0);

        let empty = CheckInStats::from_counts(100, 0, 0);
        assert_eq!(empty.percentage, 0.0);
        assert_eq!(empty.remaining, 0);

        let third = CheckInStats::from_counts(10, 3, 1);
        assert_eq!(third.percentage, 33.3);
    }
}
