use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingConfirmed,
    BookingCancelled,
    TicketPurchased,
    EventSubmitted,
    EventApproved,
    EventRejected,
    EventCancelled,
    VenueApproved,
    VenueRejected,
    VerificationApproved,
    VerificationRejected,
    PayoutCreated,
    PayoutPaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    InApp,
    Email,
    Whatsapp,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub channel: NotificationChannel,
    pub title: String,
    pub body: String,
    pub reference_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification about to be written.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub channel: NotificationChannel,
    pub title: String,
    pub body: String,
    pub reference_id: Option<Uuid>,
}

impl NewNotification {
    pub fn in_app(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            channel: NotificationChannel::InApp,
            title: title.into(),
            body: body.into(),
            reference_id: None,
        }
    }

    pub fn about(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}
