use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::errors::AppError;
use crate::models::BookingEvent;
use crate::services::events;
use crate::state::AppState;

const EVENT_NAME: &str = "booking_event";
const KEEPALIVE: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
pub struct SseQuery {
    pub last_id: Option<i64>,
}

// GET /api/events?last_id= — SSE stream
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let last_id = query.last_id.unwrap_or(0);

    // Subscribe before reading the backlog so nothing committed in between is lost.
    let rx = state.events_tx.subscribe();
    let catchup = {
        let db = state.db()?;
        events::missed_since(&db, last_id)?
    };
    let newest = catchup.last().map(|e| e.id).unwrap_or(last_id);

    let catchup_stream = tokio_stream::iter(catchup.into_iter().map(|e| Ok::<_, Infallible>(to_sse(&e))));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.id > newest => Some(Ok::<_, Infallible>(to_sse(&event))),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event subscriber lagged; client should reconnect with last_id");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(KEEPALIVE))
        .map(|_| Ok::<_, Infallible>(Event::default().comment("keepalive")));

    let merged = StreamExt::merge(catchup_stream.chain(live_stream), keepalive_stream);

    Ok(Sse::new(merged))
}

fn to_sse(event: &BookingEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default()
        .id(event.id.to_string())
        .event(EVENT_NAME)
        .data(data)
}
