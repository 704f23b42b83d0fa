use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::event::{CheckInStats, Event};
use crate::utils::error::{AppError, AppResult};

/// Scheme the web client encodes into ticket QR images.
pub const QR_SCHEME: &str = "fira://ticket/";
pub const MAX_TICKETS_PER_ORDER: i32 = 10;
/// How long after an event ends its unused tickets can still be scanned.
pub const CHECK_IN_GRACE_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Used,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub owner_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub qr_code: String,
    pub status: TicketStatus,
    pub price: Decimal,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn qr_payload(&self) -> String {
        format!("{}{}", QR_SCHEME, self.qr_code)
    }
}

/// Ticket joined with the event fields a ticket wallet needs.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ticket: Ticket,
    pub event_title: String,
    pub event_starts_at: DateTime<Utc>,
    pub event_ends_at: DateTime<Utc>,
}

pub fn generate_qr_code() -> String {
    format!("FT{}", Uuid::new_v4().simple()).to_uppercase()
}

/// Accepts either a bare ticket code or the `fira://ticket/<code>` form the
/// QR image carries.
pub fn parse_qr_payload(payload: &str) -> AppResult<String> {
    let trimmed = payload.trim();
    let code = trimmed.strip_prefix(QR_SCHEME).unwrap_or(trimmed).trim();

    if code.is_empty() {
        return Err(AppError::ValidationError("QR payload is empty".to_string()));
    }
    if code.len() > 64 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::ValidationError(
            "QR payload is not a FIRA ticket".to_string(),
        ));
    }
    Ok(code.to_ascii_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    CheckedIn,
    AlreadyUsed,
    NotFound,
    WrongEvent,
    Cancelled,
    Expired,
}

impl ScanOutcome {
    pub fn message(self) -> &'static str {
        match self {
            ScanOutcome::CheckedIn => "Ticket checked in",
            ScanOutcome::AlreadyUsed => "Ticket has already been used",
            ScanOutcome::NotFound => "Ticket not found",
            ScanOutcome::WrongEvent => "Ticket belongs to a different event",
            ScanOutcome::Cancelled => "Ticket has been cancelled",
            ScanOutcome::Expired => "Ticket has expired",
        }
    }

    pub fn is_admitted(self) -> bool {
        self == ScanOutcome::CheckedIn
    }
}

/// Decides what scanning `ticket` at `event` should do right now.
/// `CheckedIn` means the ticket is eligible; the caller still has to win the
/// guarded status update.
pub fn scan_verdict(ticket: Option<&Ticket>, event: &Event, now: DateTime<Utc>) -> ScanOutcome {
    let Some(ticket) = ticket else {
        return ScanOutcome::NotFound;
    };
    if ticket.event_id != event.id {
        return ScanOutcome::WrongEvent;
    }
    match ticket.status {
        TicketStatus::Used => ScanOutcome::AlreadyUsed,
        TicketStatus::Cancelled => ScanOutcome::Cancelled,
        TicketStatus::Expired => ScanOutcome::Expired,
        TicketStatus::Active if event.ends_at + Duration::hours(CHECK_IN_GRACE_HOURS) < now => {
            ScanOutcome::Expired
        }
        TicketStatus::Active => ScanOutcome::CheckedIn,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub outcome: ScanOutcome,
    pub message: String,
    /// Set when this answer is a replay of a scan seen moments ago.
    pub duplicate: bool,
    pub ticket: Option<Ticket>,
    pub stats: CheckInStats,
}

impl ScanResult {
    pub fn new(outcome: ScanOutcome, ticket: Option<Ticket>, stats: CheckInStats) -> Self {
        let message = match (outcome, ticket.as_ref().and_then(|t| t.checked_in_at)) {
            (ScanOutcome::AlreadyUsed, Some(at)) => {
                format!("{} (checked in at {})", outcome.message(), at.format("%H:%M:%S UTC"))
            }
            _ => outcome.message().to_string(),
        };
        Self {
            outcome,
            message,
            duplicate: false,
            ticket,
            stats,
        }
    }

    pub fn as_duplicate(mut self) -> Self {
        self.duplicate = true;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub event_id: Uuid,
    pub quantity: i32,
    pub payment_reference: String,
    pub access_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub event_id: Uuid,
    pub qr_payload: String,
}
