//! Per-booking message thread between a client and staff.

use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::ChatMessage;

pub fn send(
    conn: &mut Connection,
    booking_id: &str,
    sender_id: &str,
    receiver_id: &str,
    text: &str,
    retries: u32,
) -> Result<ChatMessage, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("message text is required".to_string()));
    }
    if sender_id == receiver_id {
        return Err(AppError::BadRequest("cannot message yourself".to_string()));
    }

    let message = db::write_tx(conn, retries, |tx| {
        if queries::get_booking(tx, booking_id)?.is_none() {
            return Err(AppError::NotFound(format!("booking {booking_id}")));
        }
        for user_id in [sender_id, receiver_id] {
            if queries::get_user(tx, user_id)?.is_none() {
                return Err(AppError::NotFound(format!("user {user_id}")));
            }
        }
        Ok(queries::insert_chat_message(tx, booking_id, sender_id, receiver_id, text)?)
    })?;

    tracing::info!(
        booking_id,
        sender_id,
        receiver_id,
        message_id = message.id,
        "chat message sent"
    );

    Ok(message)
}

pub fn history(
    conn: &Connection,
    booking_id: &str,
    user_a: &str,
    user_b: &str,
) -> Result<Vec<ChatMessage>, AppError> {
    if queries::get_booking(conn, booking_id)?.is_none() {
        return Err(AppError::NotFound(format!("booking {booking_id}")));
    }
    Ok(queries::chat_between(conn, booking_id, user_a, user_b)?)
}

/// Whether the client has written to this staff member about the booking.
pub fn has_client_message(
    conn: &Connection,
    booking_id: &str,
    client_id: &str,
    staff_id: &str,
) -> Result<bool, AppError> {
    Ok(queries::has_message_from(conn, booking_id, client_id, staff_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, email, role) VALUES ('client', 'client@example.com', 'CLIENT');
             INSERT INTO users (id, email, role) VALUES ('manager', 'manager@example.com', 'MANAGER');
             INSERT INTO users (id, email, role) VALUES ('other', 'other@example.com', 'MANAGER');
             INSERT INTO vehicles (id, owner_id, brand, model, year) VALUES ('car', 'client', 'Lada', 'Niva', 2020);
             INSERT INTO bookings (id, requester_id, vehicle_id, start_time, end_time, approval_status, work_status, created_at, updated_at)
                 VALUES ('b1', 'client', 'car', '2030-06-17 09:00:00', '2030-06-17 10:00:00', 'pending', 'waiting',
                         '2030-06-01 00:00:00', '2030-06-01 00:00:00');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_send_and_read_thread() {
        let mut conn = setup_db();
        send(&mut conn, "b1", "client", "manager", "is it ready?", 0).unwrap();
        send(&mut conn, "b1", "manager", "client", "tomorrow", 0).unwrap();
        send(&mut conn, "b1", "client", "other", "hello", 0).unwrap();

        let thread = history(&conn, "b1", "manager", "client").unwrap();
        let texts: Vec<_> = thread.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["is it ready?", "tomorrow"]);
    }

    #[test]
    fn test_send_validates_parties() {
        let mut conn = setup_db();
        assert!(matches!(
            send(&mut conn, "missing", "client", "manager", "hi", 0),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            send(&mut conn, "b1", "client", "ghost", "hi", 0),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            send(&mut conn, "b1", "client", "manager", "   ", 0),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_has_client_message() {
        let mut conn = setup_db();
        assert!(!has_client_message(&conn, "b1", "client", "manager").unwrap());

        send(&mut conn, "b1", "manager", "client", "any questions?", 0).unwrap();
        assert!(!has_client_message(&conn, "b1", "client", "manager").unwrap());

        send(&mut conn, "b1", "client", "manager", "yes", 0).unwrap();
        assert!(has_client_message(&conn, "b1", "client", "manager").unwrap());
    }
}
