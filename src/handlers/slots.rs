use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Interval, ShopHours, Slot};
use crate::services::{calendar, slots};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SlotResponse {
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

impl SlotResponse {
    fn from_slot(hours: &ShopHours, slot: &Slot) -> Self {
        Self {
            start_time: calendar::to_wire(hours, &slot.start_time),
            end_time: calendar::to_wire(hours, &slot.end_time),
            is_available: slot.is_available,
        }
    }
}

#[derive(Serialize)]
pub struct IntervalResponse {
    pub start_time: String,
    pub end_time: String,
}

impl IntervalResponse {
    fn from_interval(hours: &ShopHours, interval: &Interval) -> Self {
        Self {
            start_time: calendar::to_wire(hours, &interval.start_time),
            end_time: calendar::to_wire(hours, &interval.end_time),
        }
    }
}

// GET /api/slots/available?date=&duration=
#[derive(Deserialize)]
pub struct AvailableQuery {
    pub date: String,
    pub duration: Option<i64>,
}

pub async fn available(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableQuery>,
) -> Result<Json<Vec<SlotResponse>>, AppError> {
    let hours = &state.config.shop;
    let date = parse_date_param(&query.date)?;

    let found = {
        let db = state.db()?;
        slots::available_slots(&db, hours, date, query.duration.unwrap_or(0))?
    };

    Ok(Json(
        found.iter().map(|s| SlotResponse::from_slot(hours, s)).collect(),
    ))
}

// GET /api/slots/occupied?date=
#[derive(Deserialize)]
pub struct OccupiedQuery {
    pub date: String,
}

pub async fn occupied(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OccupiedQuery>,
) -> Result<Json<Vec<IntervalResponse>>, AppError> {
    let hours = &state.config.shop;
    let date = parse_date_param(&query.date)?;

    let intervals = {
        let db = state.db()?;
        slots::occupied_intervals(&db, hours, date)?
    };

    Ok(Json(
        intervals
            .iter()
            .map(|i| IntervalResponse::from_interval(hours, i))
            .collect(),
    ))
}

// GET /api/slots/fully-booked
pub async fn fully_booked(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, AppError> {
    let hours = &state.config.shop;
    let today = calendar::today(hours);

    let dates = {
        let db = state.db()?;
        slots::fully_booked_dates(&db, hours, today)?
    };

    Ok(Json(dates.iter().map(calendar::format_date).collect()))
}

pub(crate) fn parse_date_param(raw: &str) -> Result<chrono::NaiveDate, AppError> {
    calendar::parse_date(raw)
        .ok_or_else(|| AppError::BadRequest(format!("invalid date: {raw}, expected YYYY-MM-DD")))
}
