use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub payer_id: Uuid,
    pub beneficiary_id: Uuid,
    pub event_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_reference: String,
    pub payout_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payout_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payout {
    pub id: Uuid,
    pub beneficiary_id: Uuid,
    pub gross_amount: Decimal,
    pub commission_percent: Decimal,
    pub commission_amount: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub status: PayoutStatus,
    pub payments_count: i32,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSplit {
    pub gross: Decimal,
    pub commission: Decimal,
    pub net: Decimal,
}

impl PayoutSplit {
    /// Commission is rounded to cents, midpoint away from zero; net absorbs
    /// the remainder so gross always equals commission + net.
    pub fn compute(gross: Decimal, commission_percent: Decimal) -> Self {
        let commission = (gross * commission_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            gross,
            commission,
            net: gross - commission,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePayoutRequest {
    pub beneficiary_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayoutQuery {
    pub status: Option<PayoutStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ten_percent() {
        let split = PayoutSplit::compute(Decimal::new(125050, 2), Decimal::from(10));
        assert_eq!(split.commission, Decimal::new(12505, 2));
        assert_eq!(split.net, Decimal::new(112545, 2));
    }

    #[test]
    fn test_split_rounds_midpoint_away_from_zero() {
        // 0.25 * 10% = 0.025 -> 0.03
        let split = PayoutSplit::compute(Decimal::new(25, 2), Decimal::from(10));
        assert_eq!(split.commission, Decimal::new(3, 2));
        assert_eq!(split.net, Decimal::new(22, 2));
        assert_eq!(split.commission + split.net, split.gross);
    }

    #[test]
    fn test_split_zero_commission() {
        let gross = Decimal::new(9999, 2);
        let split = PayoutSplit::compute(gross, Decimal::ZERO);
        assert_eq!(split.commission, Decimal::ZERO);
        assert_eq!(split.net, gross);
    }
}
