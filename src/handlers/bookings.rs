use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{caller, require_role, STAFF};
use crate::models::{ApprovalStatus, Booking, Role, ShopHours, VehicleSpec, WorkStatus};
use crate::services::admission::{self, AdmissionRequest};
use crate::services::workflow::{self, Decision};
use crate::services::{calendar, events};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

/// Booking as sent over the wire: interval in shop-local ISO-8601 with
/// offset, audit timestamps in UTC.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub requester_id: String,
    pub vehicle_id: String,
    pub service_ids: Vec<String>,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub approval_status: ApprovalStatus,
    pub work_status: WorkStatus,
    pub assigned_employee_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BookingResponse {
    pub fn new(hours: &ShopHours, booking: Booking) -> Self {
        Self {
            start_time: calendar::to_wire(hours, &booking.start_time),
            end_time: calendar::to_wire(hours, &booking.end_time),
            duration_minutes: booking.duration_minutes(),
            created_at: utc_wire(&booking.created_at),
            updated_at: utc_wire(&booking.updated_at),
            id: booking.id,
            requester_id: booking.requester_id,
            vehicle_id: booking.vehicle_id,
            service_ids: booking.service_ids,
            description: booking.description,
            approval_status: booking.approval_status,
            work_status: booking.work_status,
            assigned_employee_id: booking.assigned_employee_id,
        }
    }
}

fn utc_wire(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    /// Staff may book on behalf of a client; clients always book for themselves.
    pub requester_id: Option<String>,
    pub vehicle: VehicleSpec,
    pub service_ids: Vec<String>,
    pub start_time: String,
    #[serde(default)]
    pub remember_vehicle: bool,
    pub description: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let caller = caller(&headers)?;
    let hours = &state.config.shop;

    let requester_id = body.requester_id.unwrap_or_else(|| caller.id.clone());
    if requester_id != caller.id {
        require_role(&caller, STAFF)?;
    }

    let start_time = calendar::parse_wire(hours, &body.start_time).ok_or_else(|| {
        AppError::BadRequest(format!("invalid start_time: {}", body.start_time))
    })?;

    let request = AdmissionRequest {
        requester_id,
        vehicle: body.vehicle,
        service_ids: body.service_ids,
        start_time,
        remember_vehicle: body.remember_vehicle,
        description: body
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    };

    let (booking, event) = {
        let mut db = state.db()?;
        admission::admit(&mut db, &request, state.config.tx_retries)?
    };
    events::publish(&state, event);

    Ok((StatusCode::CREATED, Json(BookingResponse::new(hours, booking))))
}

// GET /api/bookings?approval_status=&limit=
#[derive(Deserialize)]
pub struct ListQuery {
    pub approval_status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let caller = caller(&headers)?;
    require_role(&caller, STAFF)?;

    let status = match query.approval_status.as_deref() {
        Some(raw) => Some(ApprovalStatus::parse(raw).ok_or_else(|| {
            AppError::BadRequest(format!("invalid approval_status: {raw}"))
        })?),
        None => None,
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let bookings = {
        let db = state.db()?;
        queries::list_bookings(&db, status, limit)?
    };

    Ok(Json(to_responses(&state.config.shop, bookings)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let caller = caller(&headers)?;

    let booking = {
        let db = state.db()?;
        queries::get_booking(&db, &id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if caller.role == Role::Client && booking.requester_id != caller.id {
        return Err(AppError::Forbidden("not your booking".to_string()));
    }

    Ok(Json(BookingResponse::new(&state.config.shop, booking)))
}

// GET /api/bookings/assigned/:employee_id
pub async fn assigned_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(employee_id): Path<String>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let caller = caller(&headers)?;
    if caller.id != employee_id {
        require_role(&caller, STAFF)?;
    }

    let bookings = {
        let db = state.db()?;
        queries::bookings_for_employee(&db, &employee_id)?
    };

    Ok(Json(to_responses(&state.config.shop, bookings)))
}

// PATCH /api/bookings/:id/approval
#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    pub employee_id: Option<String>,
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let caller = caller(&headers)?;
    require_role(&caller, STAFF)?;

    let (booking, event) = {
        let mut db = state.db()?;
        workflow::decide(
            &mut db,
            &id,
            body.decision,
            body.employee_id.as_deref(),
            state.config.tx_retries,
        )?
    };
    events::publish(&state, event);

    Ok(Json(BookingResponse::new(&state.config.shop, booking)))
}

// PATCH /api/bookings/:id/work-status
#[derive(Deserialize)]
pub struct WorkStatusRequest {
    pub work_status: String,
}

pub async fn advance_work(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<WorkStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let caller = caller(&headers)?;
    require_role(&caller, &[Role::ServiceEmployee, Role::Admin])?;

    let requested = WorkStatus::parse(&body.work_status).ok_or_else(|| {
        AppError::BadRequest(format!("invalid work_status: {}", body.work_status))
    })?;

    let (booking, event) = {
        let mut db = state.db()?;
        if caller.role == Role::ServiceEmployee {
            let current = queries::get_booking(&db, &id)?
                .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
            if current.assigned_employee_id.as_deref() != Some(caller.id.as_str()) {
                return Err(AppError::Forbidden(
                    "booking is assigned to another employee".to_string(),
                ));
            }
        }
        workflow::advance_work(&mut db, &id, requested, state.config.tx_retries)?
    };
    events::publish(&state, event);

    Ok(Json(BookingResponse::new(&state.config.shop, booking)))
}

// PATCH /api/bookings/:id/assign/:employee_id
pub async fn assign_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, employee_id)): Path<(String, String)>,
) -> Result<Json<BookingResponse>, AppError> {
    let caller = caller(&headers)?;
    require_role(&caller, STAFF)?;

    let booking = {
        let mut db = state.db()?;
        workflow::assign_employee(&mut db, &id, &employee_id, state.config.tx_retries)?
    };

    Ok(Json(BookingResponse::new(&state.config.shop, booking)))
}

fn to_responses(hours: &ShopHours, bookings: Vec<Booking>) -> Vec<BookingResponse> {
    bookings
        .into_iter()
        .map(|b| BookingResponse::new(hours, b))
        .collect()
}
