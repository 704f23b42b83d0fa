use serde::{Deserialize, Serialize};

pub mod booking;
pub mod brand;
pub mod dashboard;
pub mod event;
pub mod notification;
pub mod payment;
pub mod ticket;
pub mod user;
pub mod venue;

/// Sign-off state shared by venue listings and both sides of event approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    NotRequired,
}

impl ApprovalStatus {
    pub fn from_decision(approve: bool) -> Self {
        if approve {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        }
    }

    pub fn is_satisfied(self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::NotRequired)
    }
}

/// Body of every approve/reject endpoint.
#[derive(Debug, Deserialize)]
pub struct ApprovalDecision {
    pub approve: bool,
    pub reason: Option<String>,
}
