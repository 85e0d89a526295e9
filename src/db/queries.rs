use chrono::{NaiveDateTime, Timelike, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    ApprovalStatus, Booking, BookingEvent, BookingEventKind, ChatMessage, Interval, Role, Service,
    User, Vehicle, WorkStatus,
};

/// Stored timestamp format. Lexical order equals chronological order.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_ts(dt: &NaiveDateTime) -> String {
    dt.format(TS_FORMAT).to_string()
}

/// Current UTC time at the precision the store keeps.
pub fn now_naive() -> NaiveDateTime {
    truncate_to_seconds(Utc::now().naive_utc())
}

pub fn truncate_to_seconds(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

fn now_ts() -> String {
    format_ts(&now_naive())
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn bad_value(idx: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("invalid {what}: {value}").into(),
    )
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, requester_id, vehicle_id, description, start_time, end_time, \
     approval_status, work_status, assigned_employee_id, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, requester_id, vehicle_id, description, start_time, end_time,
                               approval_status, work_status, assigned_employee_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.requester_id,
            booking.vehicle_id,
            booking.description,
            format_ts(&booking.start_time),
            format_ts(&booking.end_time),
            booking.approval_status.as_str(),
            booking.work_status.as_str(),
            booking.assigned_employee_id,
            format_ts(&booking.created_at),
            format_ts(&booking.updated_at),
        ],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO booking_services (booking_id, service_id, position) VALUES (?1, ?2, ?3)",
    )?;
    for (position, service_id) in booking.service_ids.iter().enumerate() {
        stmt.execute(params![booking.id, service_id, position as i64])?;
    }
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            parse_booking_row,
        )
        .optional()?;

    match booking {
        Some(mut b) => {
            b.service_ids = service_ids_for(conn, &b.id)?;
            Ok(Some(b))
        }
        None => Ok(None),
    }
}

pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<ApprovalStatus>,
    limit: i64,
) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR approval_status = ?1)
         ORDER BY start_time DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(
        params![status_filter.map(|s| s.as_str()), limit],
        parse_booking_row,
    )?;
    collect_bookings(conn, rows)
}

pub fn bookings_for_employee(conn: &Connection, employee_id: &str) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE assigned_employee_id = ?1
         ORDER BY start_time ASC"
    ))?;
    let rows = stmt.query_map(params![employee_id], parse_booking_row)?;
    collect_bookings(conn, rows)
}

fn collect_bookings(
    conn: &Connection,
    rows: impl Iterator<Item = rusqlite::Result<Booking>>,
) -> rusqlite::Result<Vec<Booking>> {
    let mut bookings = vec![];
    for row in rows {
        let mut booking = row?;
        booking.service_ids = service_ids_for(conn, &booking.id)?;
        bookings.push(booking);
    }
    Ok(bookings)
}

fn service_ids_for(conn: &Connection, booking_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT service_id FROM booking_services WHERE booking_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| row.get(0))?;
    rows.collect()
}

/// Approved bookings whose interval intersects `range`, optionally ignoring one booking.
pub fn approved_overlapping(
    conn: &Connection,
    range: &Interval,
    exclude_id: Option<&str>,
) -> rusqlite::Result<Vec<Interval>> {
    let mut stmt = conn.prepare(
        "SELECT start_time, end_time FROM bookings
         WHERE approval_status = 'approved'
           AND start_time < ?2 AND end_time > ?1
           AND (?3 IS NULL OR id != ?3)
         ORDER BY start_time ASC",
    )?;
    let rows = stmt.query_map(
        params![
            format_ts(&range.start_time),
            format_ts(&range.end_time),
            exclude_id
        ],
        parse_interval_row,
    )?;
    rows.collect()
}

/// Bookings lying entirely inside `window`, any approval status unless
/// `skip_rejected` is set.
pub fn intervals_within(
    conn: &Connection,
    window: &Interval,
    skip_rejected: bool,
) -> rusqlite::Result<Vec<Interval>> {
    let mut stmt = conn.prepare(
        "SELECT start_time, end_time FROM bookings
         WHERE start_time >= ?1 AND end_time <= ?2
           AND (?3 = 0 OR approval_status != 'rejected')
         ORDER BY start_time ASC",
    )?;
    let rows = stmt.query_map(
        params![
            format_ts(&window.start_time),
            format_ts(&window.end_time),
            skip_rejected
        ],
        parse_interval_row,
    )?;
    rows.collect()
}

pub fn update_approval(
    conn: &Connection,
    id: &str,
    status: ApprovalStatus,
    assigned_employee_id: Option<&str>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings
         SET approval_status = ?1,
             assigned_employee_id = COALESCE(?2, assigned_employee_id),
             updated_at = ?3
         WHERE id = ?4",
        params![status.as_str(), assigned_employee_id, now_ts(), id],
    )?;
    Ok(count > 0)
}

pub fn update_work_status(conn: &Connection, id: &str, status: WorkStatus) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET work_status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_ts(), id],
    )?;
    Ok(count > 0)
}

pub fn update_assigned_employee(
    conn: &Connection,
    id: &str,
    employee_id: &str,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET assigned_employee_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![employee_id, now_ts(), id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let approval: String = row.get(6)?;
    let work: String = row.get(7)?;

    Ok(Booking {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        vehicle_id: row.get(2)?,
        service_ids: vec![],
        description: row.get(3)?,
        start_time: parse_ts(4, &row.get::<_, String>(4)?)?,
        end_time: parse_ts(5, &row.get::<_, String>(5)?)?,
        approval_status: ApprovalStatus::parse(&approval)
            .ok_or_else(|| bad_value(6, "approval status", &approval))?,
        work_status: WorkStatus::parse(&work).ok_or_else(|| bad_value(7, "work status", &work))?,
        assigned_employee_id: row.get(8)?,
        created_at: parse_ts(9, &row.get::<_, String>(9)?)?,
        updated_at: parse_ts(10, &row.get::<_, String>(10)?)?,
    })
}

fn parse_interval_row(row: &rusqlite::Row) -> rusqlite::Result<Interval> {
    Ok(Interval::new(
        parse_ts(0, &row.get::<_, String>(0)?)?,
        parse_ts(1, &row.get::<_, String>(1)?)?,
    ))
}

// ── Booking Events ──

pub fn insert_booking_event(
    conn: &Connection,
    booking_id: &str,
    kind: BookingEventKind,
    approval_status: ApprovalStatus,
    work_status: WorkStatus,
) -> rusqlite::Result<BookingEvent> {
    let created_at = now_ts();
    conn.execute(
        "INSERT INTO booking_events (booking_id, kind, approval_status, work_status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            booking_id,
            kind.as_str(),
            approval_status.as_str(),
            work_status.as_str(),
            created_at
        ],
    )?;

    Ok(BookingEvent {
        id: conn.last_insert_rowid(),
        booking_id: booking_id.to_string(),
        kind,
        approval_status,
        work_status,
        created_at,
    })
}

pub fn booking_events_since(conn: &Connection, since_id: i64) -> rusqlite::Result<Vec<BookingEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, kind, approval_status, work_status, created_at
         FROM booking_events WHERE id > ?1
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![since_id], |row| {
        let kind: String = row.get(2)?;
        let approval: String = row.get(3)?;
        let work: String = row.get(4)?;
        Ok(BookingEvent {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            kind: BookingEventKind::parse(&kind).ok_or_else(|| bad_value(2, "event kind", &kind))?,
            approval_status: ApprovalStatus::parse(&approval)
                .ok_or_else(|| bad_value(3, "approval status", &approval))?,
            work_status: WorkStatus::parse(&work)
                .ok_or_else(|| bad_value(4, "work status", &work))?,
            created_at: row.get(5)?,
        })
    })?;
    rows.collect()
}

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.email, user.role.as_str(), user.created_at],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, email, role, created_at FROM users WHERE id = ?1",
        params![id],
        parse_user_row,
    )
    .optional()
}

pub fn list_users(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, email, role, created_at FROM users ORDER BY created_at ASC")?;
    let rows = stmt.query_map([], parse_user_row)?;
    rows.collect()
}

pub fn update_user_role(conn: &Connection, id: &str, role: Role) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), id],
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let role: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        role: Role::parse(&role).ok_or_else(|| bad_value(2, "role", &role))?,
        created_at: row.get(3)?,
    })
}

// ── Services ──

pub fn create_service(conn: &Connection, service: &Service) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO services (id, title, description, duration_minutes, price)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.id,
            service.title,
            service.description,
            service.duration_minutes,
            service.price,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> rusqlite::Result<Option<Service>> {
    conn.query_row(
        "SELECT id, title, description, duration_minutes, price FROM services WHERE id = ?1",
        params![id],
        parse_service_row,
    )
    .optional()
}

pub fn list_services(conn: &Connection) -> rusqlite::Result<Vec<Service>> {
    let mut stmt = conn
        .prepare("SELECT id, title, description, duration_minutes, price FROM services ORDER BY title ASC")?;
    let rows = stmt.query_map([], parse_service_row)?;
    rows.collect()
}

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        duration_minutes: row.get(3)?,
        price: row.get(4)?,
    })
}

// ── Vehicles ──

const VEHICLE_COLUMNS: &str = "id, owner_id, brand, model, year, remembered, is_deleted, created_at";

pub fn find_vehicle(
    conn: &Connection,
    owner_id: &str,
    brand: &str,
    model: &str,
    year: i32,
) -> rusqlite::Result<Option<Vehicle>> {
    conn.query_row(
        &format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles
             WHERE owner_id = ?1 AND brand = ?2 AND model = ?3 AND year = ?4 AND is_deleted = 0
             ORDER BY created_at ASC LIMIT 1"
        ),
        params![owner_id, brand, model, year],
        parse_vehicle_row,
    )
    .optional()
}

pub fn get_vehicle(conn: &Connection, id: &str) -> rusqlite::Result<Option<Vehicle>> {
    conn.query_row(
        &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?1"),
        params![id],
        parse_vehicle_row,
    )
    .optional()
}

pub fn create_vehicle(conn: &Connection, vehicle: &Vehicle) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO vehicles (id, owner_id, brand, model, year, remembered, is_deleted, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            vehicle.id,
            vehicle.owner_id,
            vehicle.brand,
            vehicle.model,
            vehicle.year,
            vehicle.remembered,
            vehicle.is_deleted,
            vehicle.created_at,
        ],
    )?;
    Ok(())
}

pub fn mark_vehicle_remembered(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE vehicles SET remembered = 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn remembered_vehicles(conn: &Connection, owner_id: &str) -> rusqlite::Result<Vec<Vehicle>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VEHICLE_COLUMNS} FROM vehicles
         WHERE owner_id = ?1 AND remembered = 1 AND is_deleted = 0
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![owner_id], parse_vehicle_row)?;
    rows.collect()
}

pub fn soft_delete_vehicle(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE vehicles SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
        params![id],
    )?;
    Ok(count > 0)
}

fn parse_vehicle_row(row: &rusqlite::Row) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        brand: row.get(2)?,
        model: row.get(3)?,
        year: row.get(4)?,
        remembered: row.get(5)?,
        is_deleted: row.get(6)?,
        created_at: row.get(7)?,
    })
}

// ── Chat ──

pub fn insert_chat_message(
    conn: &Connection,
    booking_id: &str,
    sender_id: &str,
    receiver_id: &str,
    text: &str,
) -> rusqlite::Result<ChatMessage> {
    let created_at = now_ts();
    conn.execute(
        "INSERT INTO chat_messages (booking_id, sender_id, receiver_id, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![booking_id, sender_id, receiver_id, text, created_at],
    )?;

    Ok(ChatMessage {
        id: conn.last_insert_rowid(),
        booking_id: booking_id.to_string(),
        sender_id: sender_id.to_string(),
        receiver_id: receiver_id.to_string(),
        text: text.to_string(),
        created_at,
    })
}

/// Messages exchanged between two users on one booking, oldest first.
pub fn chat_between(
    conn: &Connection,
    booking_id: &str,
    user_a: &str,
    user_b: &str,
) -> rusqlite::Result<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, sender_id, receiver_id, text, created_at
         FROM chat_messages
         WHERE booking_id = ?1
           AND ((sender_id = ?2 AND receiver_id = ?3) OR (sender_id = ?3 AND receiver_id = ?2))
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![booking_id, user_a, user_b], |row| {
        Ok(ChatMessage {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            sender_id: row.get(2)?,
            receiver_id: row.get(3)?,
            text: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn has_message_from(
    conn: &Connection,
    booking_id: &str,
    sender_id: &str,
    receiver_id: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM chat_messages
         WHERE booking_id = ?1 AND sender_id = ?2 AND receiver_id = ?3",
        params![booking_id, sender_id, receiver_id],
        |row| row.get(0),
    )
}
