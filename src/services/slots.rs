//! Slot availability for the shop-wide calendar.
//!
//! Every call recomputes from the current booking rows; nothing is cached.

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Interval, ShopHours, Slot};
use crate::services::calendar;

/// Candidate slots on `date` for a job of `duration_minutes`, ascending by
/// start. A slot is unavailable when it overlaps an approved booking;
/// pending bookings do not block it.
///
/// A non-positive duration yields no slots: nothing has been selected yet.
/// Neither does one longer than the working day.
pub fn available_slots(
    conn: &Connection,
    hours: &ShopHours,
    date: NaiveDate,
    duration_minutes: i64,
) -> rusqlite::Result<Vec<Slot>> {
    if duration_minutes <= 0 || duration_minutes > hours.working_minutes() {
        return Ok(vec![]);
    }

    let window = calendar::day_window(hours, date);
    let approved = queries::approved_overlapping(conn, &window, None)?;

    let slots = candidate_intervals(&window, duration_minutes, hours.slot_step_minutes)
        .into_iter()
        .map(|candidate| Slot {
            start_time: candidate.start_time,
            end_time: candidate.end_time,
            is_available: !approved.iter().any(|b| candidate.overlaps(b)),
        })
        .collect();

    Ok(slots)
}

/// Raw intervals of every booking inside the day window, whatever its
/// approval status, so staff can see tentative holds as well.
pub fn occupied_intervals(
    conn: &Connection,
    hours: &ShopHours,
    date: NaiveDate,
) -> rusqlite::Result<Vec<Interval>> {
    let window = calendar::day_window(hours, date);
    queries::intervals_within(conn, &window, false)
}

/// Dates among the next `lookahead_days` (starting at `today`) whose
/// non-rejected bookings add up to at least a full working day.
pub fn fully_booked_dates(
    conn: &Connection,
    hours: &ShopHours,
    today: NaiveDate,
) -> rusqlite::Result<Vec<NaiveDate>> {
    let capacity = hours.working_minutes();
    let mut fully_booked = vec![];

    for offset in 0..hours.lookahead_days {
        let date = today + Duration::days(i64::from(offset));
        let window = calendar::day_window(hours, date);
        let used: i64 = queries::intervals_within(conn, &window, true)?
            .iter()
            .map(Interval::minutes)
            .sum();

        if used >= capacity {
            tracing::debug!(date = %date, used, capacity, "day fully booked");
            fully_booked.push(date);
        }
    }

    Ok(fully_booked)
}

/// Every `step`-minute start from the window's opening such that the job
/// still ends by closing time.
fn candidate_intervals(window: &Interval, duration_minutes: i64, step_minutes: i64) -> Vec<Interval> {
    let (Some(duration), Some(step)) = (
        Duration::try_minutes(duration_minutes),
        Duration::try_minutes(step_minutes.max(1)),
    ) else {
        return vec![];
    };

    let mut candidates = vec![];
    let mut start = window.start_time;
    while let Some(end) = start
        .checked_add_signed(duration)
        .filter(|end| *end <= window.end_time)
    {
        candidates.push(Interval::new(start, end));
        match start.checked_add_signed(step) {
            Some(next) => start = next,
            None => break,
        }
    }
    candidates
}
