use std::collections::HashSet;

use chrono::{Datelike, NaiveDateTime, Utc};
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::booking::derive_end_time;
use crate::models::{
    ApprovalStatus, Booking, BookingEvent, BookingEventKind, Interval, Vehicle, VehicleSpec,
    WorkStatus,
};

#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub requester_id: String,
    pub vehicle: VehicleSpec,
    pub service_ids: Vec<String>,
    pub start_time: NaiveDateTime,
    pub remember_vehicle: bool,
    pub description: Option<String>,
}

/// Creates a pending booking unless its interval overlaps an approved one.
///
/// Everything from requester lookup to the outbox event runs in one
/// immediate transaction, so a rejected request leaves no rows behind and
/// two admissions can never both pass the overlap check against a stale
/// view. Pending bookings do not conflict with each other; that is settled
/// at approval time.
pub fn admit(
    conn: &mut Connection,
    req: &AdmissionRequest,
    retries: u32,
) -> Result<(Booking, BookingEvent), AppError> {
    validate_service_ids(&req.service_ids)?;
    let start_time = queries::truncate_to_seconds(req.start_time);

    let (booking, event) = db::write_tx(conn, retries, |tx| {
        if queries::get_user(tx, &req.requester_id)?.is_none() {
            return Err(AppError::NotFound(format!("user {}", req.requester_id)));
        }

        let vehicle = resolve_vehicle(tx, &req.requester_id, &req.vehicle, req.remember_vehicle)?;

        let mut durations = Vec::with_capacity(req.service_ids.len());
        for id in &req.service_ids {
            let service = queries::get_service(tx, id)?
                .ok_or_else(|| AppError::NotFound(format!("service {id}")))?;
            durations.push(service.duration_minutes);
        }

        let end_time = derive_end_time(start_time, &durations).ok_or_else(|| {
            AppError::BadRequest("selected services do not fit in the calendar".to_string())
        })?;
        let interval = Interval::new(start_time, end_time);
        ensure_slot_free(tx, &interval, None)?;

        let now = queries::now_naive();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            requester_id: req.requester_id.clone(),
            vehicle_id: vehicle.id,
            service_ids: req.service_ids.clone(),
            description: req.description.clone(),
            start_time,
            end_time,
            approval_status: ApprovalStatus::Pending,
            work_status: WorkStatus::Waiting,
            assigned_employee_id: None,
            created_at: now,
            updated_at: now,
        };
        queries::insert_booking(tx, &booking)?;

        let event = queries::insert_booking_event(
            tx,
            &booking.id,
            BookingEventKind::StatusChanged,
            booking.approval_status,
            booking.work_status,
        )?;

        Ok((booking, event))
    })?;

    tracing::info!(
        booking_id = %booking.id,
        requester_id = %booking.requester_id,
        start = %booking.start_time,
        end = %booking.end_time,
        "booking admitted"
    );

    Ok((booking, event))
}

/// Fails with `Conflict` when `interval` overlaps an approved booking other
/// than `exclude_id`. Must run inside the same write transaction as the
/// write it guards.
pub fn ensure_slot_free(
    conn: &Connection,
    interval: &Interval,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let clashes = queries::approved_overlapping(conn, interval, exclude_id)?;
    if let Some(clash) = clashes.first() {
        tracing::debug!(
            requested_start = %interval.start_time,
            requested_end = %interval.end_time,
            clash_start = %clash.start_time,
            clash_end = %clash.end_time,
            "slot overlaps an approved booking"
        );
        return Err(AppError::Conflict("slot already taken".to_string()));
    }
    Ok(())
}

fn validate_service_ids(ids: &[String]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("at least one service is required".to_string()));
    }
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(AppError::BadRequest(format!("service {id} listed twice")));
        }
    }
    Ok(())
}

/// Reuses the owner's live vehicle with the same brand, model and year, or
/// records a new one.
fn resolve_vehicle(
    conn: &Connection,
    owner_id: &str,
    wanted: &VehicleSpec,
    remember: bool,
) -> Result<Vehicle, AppError> {
    let brand = wanted.brand.trim();
    let model = wanted.model.trim();
    if brand.is_empty() || model.is_empty() {
        return Err(AppError::BadRequest("vehicle brand and model are required".to_string()));
    }
    let year = wanted.year.unwrap_or_else(|| Utc::now().year());

    if let Some(mut existing) = queries::find_vehicle(conn, owner_id, brand, model, year)? {
        if remember && !existing.remembered {
            queries::mark_vehicle_remembered(conn, &existing.id)?;
            existing.remembered = true;
        }
        return Ok(existing);
    }

    let vehicle = Vehicle {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        brand: brand.to_string(),
        model: model.to_string(),
        year,
        remembered: remember,
        is_deleted: false,
        created_at: queries::format_ts(&queries::now_naive()),
    };
    queries::create_vehicle(conn, &vehicle)?;
    Ok(vehicle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Service, User};

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::create_user(
            &conn,
            &User {
                id: "client".to_string(),
                email: "client@example.com".to_string(),
                role: Role::Client,
                created_at: "2030-01-01 00:00:00".to_string(),
            },
        )
        .unwrap();
        for (id, minutes) in [("oil", 30), ("brakes", 60), ("engine", 240), ("wash", 15)] {
            queries::create_service(
                &conn,
                &Service {
                    id: id.to_string(),
                    title: id.to_string(),
                    description: None,
                    duration_minutes: minutes,
                    price: 10.0,
                },
            )
            .unwrap();
        }
        conn
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn request(start: &str, services: &[&str]) -> AdmissionRequest {
        AdmissionRequest {
            requester_id: "client".to_string(),
            vehicle: VehicleSpec {
                brand: "Lada".to_string(),
                model: "Niva".to_string(),
                year: Some(2020),
            },
            service_ids: services.iter().map(|s| s.to_string()).collect(),
            start_time: dt(start),
            remember_vehicle: false,
            description: Some("strange noise".to_string()),
        }
    }

    fn approve_directly(conn: &Connection, id: &str) {
        queries::update_approval(conn, id, ApprovalStatus::Approved, None).unwrap();
    }

    fn booking_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_admit_creates_pending_booking() {
        let mut conn = setup_db();
        let (booking, event) = admit(&mut conn, &request("2030-06-17 10:00", &["oil"]), 0).unwrap();

        assert_eq!(booking.approval_status, ApprovalStatus::Pending);
        assert_eq!(booking.work_status, WorkStatus::Waiting);
        assert_eq!(booking.end_time, dt("2030-06-17 10:30"));
        assert_eq!(event.booking_id, booking.id);
        assert_eq!(event.kind, BookingEventKind::StatusChanged);
        assert_eq!(event.approval_status, ApprovalStatus::Pending);

        let stored = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(stored, booking);
    }

    #[test]
    fn test_end_time_is_sum_of_service_durations() {
        let mut conn = setup_db();
        let (booking, _) = admit(
            &mut conn,
            &request("2030-06-17 09:00", &["wash", "oil", "brakes", "engine"]),
            0,
        )
        .unwrap();

        assert_eq!(booking.end_time, dt("2030-06-17 14:45"));
        assert_eq!(booking.duration_minutes(), 15 + 30 + 60 + 240);
        assert_eq!(booking.service_ids, vec!["wash", "oil", "brakes", "engine"]);
    }

    #[test]
    fn test_conflict_with_approved_booking() {
        let mut conn = setup_db();
        let (first, _) = admit(&mut conn, &request("2030-06-17 10:00", &["brakes"]), 0).unwrap();
        approve_directly(&conn, &first.id);

        let result = admit(&mut conn, &request("2030-06-17 10:00", &["brakes"]), 0);
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(booking_count(&conn), 1);
    }

    #[test]
    fn test_partial_overlap_conflicts() {
        let mut conn = setup_db();
        let (first, _) = admit(&mut conn, &request("2030-06-17 10:00", &["brakes"]), 0).unwrap();
        approve_directly(&conn, &first.id);

        // 09:45 + 30 = 10:15 runs into 10:00-11:00
        let result = admit(&mut conn, &request("2030-06-17 09:45", &["oil"]), 0);
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_adjacent_booking_is_admitted() {
        let mut conn = setup_db();
        let (first, _) = admit(&mut conn, &request("2030-06-17 10:00", &["brakes"]), 0).unwrap();
        approve_directly(&conn, &first.id);

        assert!(admit(&mut conn, &request("2030-06-17 11:00", &["oil"]), 0).is_ok());
        assert!(admit(&mut conn, &request("2030-06-17 09:30", &["oil"]), 0).is_ok());
    }

    #[test]
    fn test_pending_bookings_do_not_conflict() {
        let mut conn = setup_db();
        admit(&mut conn, &request("2030-06-17 09:00", &["oil"]), 0).unwrap();
        admit(&mut conn, &request("2030-06-17 09:00", &["oil"]), 0).unwrap();
        assert_eq!(booking_count(&conn), 2);
    }

    #[test]
    fn test_unknown_requester() {
        let mut conn = setup_db();
        let mut req = request("2030-06-17 10:00", &["oil"]);
        req.requester_id = "ghost".to_string();
        assert!(matches!(admit(&mut conn, &req, 0), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_unknown_service_leaves_no_vehicle_behind() {
        let mut conn = setup_db();
        let result = admit(&mut conn, &request("2030-06-17 10:00", &["oil", "teleport"]), 0);
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let vehicles: i64 = conn
            .query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(vehicles, 0);
        assert_eq!(booking_count(&conn), 0);
    }

    #[test]
    fn test_oversized_service_is_rejected_without_rows() {
        let mut conn = setup_db();
        queries::create_service(
            &conn,
            &Service {
                id: "forever".to_string(),
                title: "forever".to_string(),
                description: None,
                duration_minutes: 200_000_000_000,
                price: 10.0,
            },
        )
        .unwrap();

        let result = admit(&mut conn, &request("2030-06-17 10:00", &["oil", "forever"]), 0);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(booking_count(&conn), 0);

        // the connection is still usable afterwards
        assert!(admit(&mut conn, &request("2030-06-17 10:00", &["oil"]), 0).is_ok());
    }

    #[test]
    fn test_empty_and_duplicate_services_rejected() {
        let mut conn = setup_db();
        assert!(matches!(
            admit(&mut conn, &request("2030-06-17 10:00", &[]), 0),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            admit(&mut conn, &request("2030-06-17 10:00", &["oil", "oil"]), 0),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_vehicle_is_reused_for_same_owner() {
        let mut conn = setup_db();
        let (a, _) = admit(&mut conn, &request("2030-06-17 09:00", &["oil"]), 0).unwrap();
        let (b, _) = admit(&mut conn, &request("2030-06-18 09:00", &["oil"]), 0).unwrap();
        assert_eq!(a.vehicle_id, b.vehicle_id);

        let mut other_year = request("2030-06-19 09:00", &["oil"]);
        other_year.vehicle.year = Some(2021);
        let (c, _) = admit(&mut conn, &other_year, 0).unwrap();
        assert_ne!(a.vehicle_id, c.vehicle_id);
    }

    #[test]
    fn test_remember_flag_only_when_requested() {
        let mut conn = setup_db();
        admit(&mut conn, &request("2030-06-17 09:00", &["oil"]), 0).unwrap();
        assert!(queries::remembered_vehicles(&conn, "client").unwrap().is_empty());

        let mut remember = request("2030-06-18 09:00", &["oil"]);
        remember.remember_vehicle = true;
        admit(&mut conn, &remember, 0).unwrap();

        let remembered = queries::remembered_vehicles(&conn, "client").unwrap();
        assert_eq!(remembered.len(), 1);
        assert_eq!(remembered[0].brand, "Lada");
    }

    #[test]
    fn test_soft_deleted_vehicle_is_not_reused() {
        let mut conn = setup_db();
        let (a, _) = admit(&mut conn, &request("2030-06-17 09:00", &["oil"]), 0).unwrap();
        queries::soft_delete_vehicle(&conn, &a.vehicle_id).unwrap();

        let (b, _) = admit(&mut conn, &request("2030-06-18 09:00", &["oil"]), 0).unwrap();
        assert_ne!(a.vehicle_id, b.vehicle_id);
    }
}
