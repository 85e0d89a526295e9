use serde::{Deserialize, Serialize};

use super::{ApprovalStatus, WorkStatus};

/// A change to a booking, stored in `booking_events` in the same transaction
/// as the change itself and broadcast once that transaction commits.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BookingEvent {
    pub id: i64,
    pub booking_id: String,
    pub kind: BookingEventKind,
    pub approval_status: ApprovalStatus,
    pub work_status: WorkStatus,
    pub created_at: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    StatusChanged,
    WorkStatusChanged,
}

impl BookingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEventKind::StatusChanged => "status_changed",
            BookingEventKind::WorkStatusChanged => "work_status_changed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "status_changed" => Some(BookingEventKind::StatusChanged),
            "work_status_changed" => Some(BookingEventKind::WorkStatusChanged),
            _ => None,
        }
    }
}
