use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-user numbers shown on the organizer / venue owner dashboard.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DashboardSummary {
    pub venues: i64,
    pub events: i64,
    pub bookings_received: i64,
    pub upcoming_bookings: i64,
    pub tickets_sold: i64,
    pub gross_revenue: Decimal,
    pub pending_payouts: Decimal,
    pub paid_payouts: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminStats {
    pub users: i64,
    pub pending_venues: i64,
    pub pending_events: i64,
    pub pending_verifications: i64,
    pub tickets_sold: i64,
    pub gross_revenue: Decimal,
    pub commission_earned: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}
