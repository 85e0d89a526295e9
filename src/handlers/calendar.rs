use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::handlers::slots::parse_date_param;
use crate::services::calendar;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DayInfo {
    pub date: String,
    pub closed: bool,
    pub open: String,
    pub close: String,
    pub hours: String,
}

// GET /api/calendar/:date
pub async fn day_info(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<DayInfo>, AppError> {
    let hours = &state.config.shop;
    let date = parse_date_param(&raw)?;
    let window = calendar::day_window(hours, date);

    Ok(Json(DayInfo {
        date: calendar::format_date(&date),
        closed: calendar::is_closed(hours, date, calendar::today(hours)),
        open: calendar::to_wire(hours, &window.start_time),
        close: calendar::to_wire(hours, &window.end_time),
        hours: hours.to_human_readable(),
    }))
}
