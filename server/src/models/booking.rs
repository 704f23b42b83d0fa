use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub slot_id: Uuid,
    pub user_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub amount: Decimal,
    pub status: BookingStatus,
    pub payment_id: Option<Uuid>,
    pub notes: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn can_cancel(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Confirmed && self.starts_at > now
    }
}

/// Price of a slot; partial hours are billed as full hours.
pub fn booking_amount(
    price_per_hour: Decimal,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Decimal {
    let minutes = (ends_at - starts_at).num_minutes().max(0);
    let hours = (minutes + 59) / 60;
    price_per_hour * Decimal::from(hours)
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub slot_id: Uuid,
    pub payment_reference: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_amount_rounds_partial_hours_up() {
        let start = Utc::now();
        let price = Decimal::new(5000, 2);
        assert_eq!(
            booking_amount(price, start, start + Duration::hours(3)),
            Decimal::new(15000, 2)
        );
        assert_eq!(
            booking_amount(price, start, start + Duration::minutes(61)),
            Decimal::new(10000, 2)
        );
        assert_eq!(booking_amount(price, start, start), Decimal::ZERO);
    }
}
