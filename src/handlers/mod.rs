pub mod bookings;
pub mod calendar;
pub mod catalog;
pub mod chat;
pub mod events;
pub mod health;
pub mod slots;
pub mod users;
pub mod vehicles;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{delete, get, patch};
use axum::Router;

use crate::errors::AppError;
use crate::models::{Caller, Role};
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/slots/available", get(slots::available))
        .route("/api/slots/occupied", get(slots::occupied))
        .route("/api/slots/fully-booked", get(slots::fully_booked))
        .route("/api/calendar/:date", get(calendar::day_info))
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route(
            "/api/bookings/assigned/:employee_id",
            get(bookings::assigned_bookings),
        )
        .route("/api/bookings/:id/approval", patch(bookings::decide))
        .route("/api/bookings/:id/work-status", patch(bookings::advance_work))
        .route(
            "/api/bookings/:id/assign/:employee_id",
            patch(bookings::assign_employee),
        )
        .route(
            "/api/bookings/:id/messages",
            get(chat::history).post(chat::send_message),
        )
        .route(
            "/api/bookings/:id/messages/has-client",
            get(chat::has_client_message),
        )
        .route("/api/events", get(events::events_stream))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/:id/role", patch(users::update_role))
        .route(
            "/api/services",
            get(catalog::list_services).post(catalog::create_service),
        )
        .route("/api/vehicles/remembered", get(vehicles::remembered))
        .route("/api/vehicles/:id", delete(vehicles::delete_vehicle))
        .with_state(state)
}

/// Identity asserted by the upstream identity provider.
pub fn caller(headers: &HeaderMap) -> Result<Caller, AppError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let id = header(USER_ID_HEADER).ok_or(AppError::Unauthorized)?;
    let role = header(USER_ROLE_HEADER)
        .and_then(Role::parse)
        .ok_or(AppError::Unauthorized)?;

    Ok(Caller {
        id: id.to_string(),
        role,
    })
}

pub fn require_role(caller: &Caller, roles: &[Role]) -> Result<(), AppError> {
    if caller.has_any(roles) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "role {} may not do this",
        caller.role.as_str()
    )))
}

pub(crate) const STAFF: &[Role] = &[Role::Manager, Role::Admin];
