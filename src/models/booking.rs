use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Interval;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub requester_id: String,
    pub vehicle_id: String,
    pub service_ids: Vec<String>,
    pub description: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub approval_status: ApprovalStatus,
    pub work_status: WorkStatus,
    pub assigned_employee_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// End of a booking that starts at `start` and runs the given services back
/// to back. `None` when the total does not fit in the calendar.
pub fn derive_end_time(start: NaiveDateTime, durations: &[i64]) -> Option<NaiveDateTime> {
    let total = durations
        .iter()
        .try_fold(0i64, |acc, minutes| acc.checked_add(*minutes))?;
    start.checked_add_signed(Duration::try_minutes(total)?)
}

/// Manager-controlled gate. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

/// Employee-controlled progress, only meaningful once approved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Waiting,
    InProgress,
    Check,
    Ready,
}

impl WorkStatus {
    pub const SEQUENCE: [WorkStatus; 4] = [
        WorkStatus::Waiting,
        WorkStatus::InProgress,
        WorkStatus::Check,
        WorkStatus::Ready,
    ];

    pub fn rank(&self) -> usize {
        match self {
            WorkStatus::Waiting => 0,
            WorkStatus::InProgress => 1,
            WorkStatus::Check => 2,
            WorkStatus::Ready => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Waiting => "waiting",
            WorkStatus::InProgress => "in_progress",
            WorkStatus::Check => "check",
            WorkStatus::Ready => "ready",
        }
    }

    /// Accepts both `in_progress` and the upper-case `IN_PROGRESS` form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Some(WorkStatus::Waiting),
            "in_progress" => Some(WorkStatus::InProgress),
            "check" => Some(WorkStatus::Check),
            "ready" => Some(WorkStatus::Ready),
            _ => None,
        }
    }
}
