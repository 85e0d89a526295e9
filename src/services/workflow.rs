//! Booking lifecycle: the approval gate and the work-progress pipeline.
//!
//! The two dimensions are separate fields. Work may only move while the
//! booking is approved, and only forward.

use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{ApprovalStatus, Booking, BookingEvent, BookingEventKind, WorkStatus};
use crate::services::admission::ensure_slot_free;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Approval status after applying `decision`. Only pending bookings can be decided.
pub fn approval_transition(
    current: ApprovalStatus,
    decision: Decision,
) -> Result<ApprovalStatus, AppError> {
    if current.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "booking is already {}",
            current.as_str()
        )));
    }
    Ok(match decision {
        Decision::Approve => ApprovalStatus::Approved,
        Decision::Reject => ApprovalStatus::Rejected,
    })
}

/// Work status after moving to `requested`, which must lie strictly ahead
/// of `current` on an approved booking.
pub fn work_transition(
    approval: ApprovalStatus,
    current: WorkStatus,
    requested: WorkStatus,
) -> Result<WorkStatus, AppError> {
    if approval != ApprovalStatus::Approved {
        return Err(AppError::BadRequest(format!(
            "work cannot start on a {} booking",
            approval.as_str()
        )));
    }
    if requested.rank() <= current.rank() {
        return Err(AppError::BadRequest(format!(
            "cannot regress work status from {} to {}",
            current.as_str(),
            requested.as_str()
        )));
    }
    Ok(requested)
}

/// Approves or rejects a pending booking.
///
/// Approval needs an employee, either `employee_id` or the one already
/// assigned, and re-checks the booking against every other approved
/// booking: several pending requests may hold the same slot, and only the
/// first to be approved gets it.
pub fn decide(
    conn: &mut Connection,
    booking_id: &str,
    decision: Decision,
    employee_id: Option<&str>,
    retries: u32,
) -> Result<(Booking, BookingEvent), AppError> {
    let (booking, event) = db::write_tx(conn, retries, |tx| {
        let booking = load(tx, booking_id)?;
        let next = approval_transition(booking.approval_status, decision)?;

        match decision {
            Decision::Approve => {
                let employee = employee_id
                    .or(booking.assigned_employee_id.as_deref())
                    .ok_or_else(|| {
                        AppError::BadRequest("an employee must be assigned before approval".to_string())
                    })?;
                match queries::get_user(tx, employee)? {
                    Some(user) if user.role.is_employee() => {}
                    _ => {
                        return Err(AppError::BadRequest(format!(
                            "user {employee} is not a service employee"
                        )))
                    }
                }

                ensure_slot_free(tx, &booking.interval(), Some(&booking.id))?;
                queries::update_approval(tx, &booking.id, next, Some(employee))?;
            }
            Decision::Reject => {
                queries::update_approval(tx, &booking.id, next, None)?;
            }
        }

        let updated = load(tx, booking_id)?;
        let event = queries::insert_booking_event(
            tx,
            &updated.id,
            BookingEventKind::StatusChanged,
            updated.approval_status,
            updated.work_status,
        )?;
        Ok((updated, event))
    })?;

    tracing::info!(
        booking_id = %booking.id,
        status = booking.approval_status.as_str(),
        employee_id = ?booking.assigned_employee_id,
        "booking decided"
    );

    Ok((booking, event))
}

pub fn advance_work(
    conn: &mut Connection,
    booking_id: &str,
    requested: WorkStatus,
    retries: u32,
) -> Result<(Booking, BookingEvent), AppError> {
    let (booking, event) = db::write_tx(conn, retries, |tx| {
        let booking = load(tx, booking_id)?;
        let next = work_transition(booking.approval_status, booking.work_status, requested)?;
        queries::update_work_status(tx, &booking.id, next)?;

        let updated = load(tx, booking_id)?;
        let event = queries::insert_booking_event(
            tx,
            &updated.id,
            BookingEventKind::WorkStatusChanged,
            updated.approval_status,
            updated.work_status,
        )?;
        Ok((updated, event))
    })?;

    tracing::info!(
        booking_id = %booking.id,
        work_status = booking.work_status.as_str(),
        "work status advanced"
    );

    Ok((booking, event))
}

/// Assigns staff without deciding the booking.
pub fn assign_employee(
    conn: &mut Connection,
    booking_id: &str,
    employee_id: &str,
    retries: u32,
) -> Result<Booking, AppError> {
    let booking = db::write_tx(conn, retries, |tx| {
        match queries::get_user(tx, employee_id)? {
            Some(user) if user.role.is_employee() => {}
            _ => {
                return Err(AppError::NotFound(format!(
                    "service employee {employee_id}"
                )))
            }
        }

        let booking = load(tx, booking_id)?;
        queries::update_assigned_employee(tx, &booking.id, employee_id)?;
        load(tx, booking_id)
    })?;

    tracing::info!(booking_id = %booking.id, employee_id, "employee assigned");

    Ok(booking)
}

fn load(tx: &Transaction<'_>, booking_id: &str) -> Result<Booking, AppError> {
    queries::get_booking(tx, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}
