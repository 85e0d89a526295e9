use rusqlite::Connection;

use crate::db::queries;
use crate::models::BookingEvent;
use crate::state::AppState;

/// Broadcasts an event whose row has already been committed.
pub fn publish(state: &AppState, event: BookingEvent) {
    tracing::debug!(
        event_id = event.id,
        booking_id = %event.booking_id,
        kind = event.kind.as_str(),
        "publishing booking event"
    );
    // No subscribers is fine; the row is the source of truth.
    let _ = state.events_tx.send(event);
}

/// Persisted events after `last_id`, for a client reconnecting to the stream.
pub fn missed_since(conn: &Connection, last_id: i64) -> rusqlite::Result<Vec<BookingEvent>> {
    queries::booking_events_since(conn, last_id.max(0))
}
