use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::caller;
use crate::models::ChatMessage;
use crate::services::chat;
use crate::state::AppState;

// POST /api/bookings/:id/messages
#[derive(Deserialize)]
pub struct SendRequest {
    pub receiver_id: String,
    pub text: String,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
    Json(body): Json<SendRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    let sender = caller(&headers)?;

    let message = {
        let mut db = state.db()?;
        chat::send(
            &mut db,
            &booking_id,
            &sender.id,
            &body.receiver_id,
            &body.text,
            state.config.tx_retries,
        )?
    };

    Ok((StatusCode::CREATED, Json(message)))
}

// GET /api/bookings/:id/messages?with=
#[derive(Deserialize)]
pub struct HistoryQuery {
    pub with: String,
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let me = caller(&headers)?;

    let messages = {
        let db = state.db()?;
        chat::history(&db, &booking_id, &me.id, &query.with)?
    };
    Ok(Json(messages))
}

// GET /api/bookings/:id/messages/has-client?client_id=
#[derive(Deserialize)]
pub struct HasClientQuery {
    pub client_id: String,
}

pub async fn has_client_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
    Query(query): Query<HasClientQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let staff = caller(&headers)?;

    let has_message = {
        let db = state.db()?;
        chat::has_client_message(&db, &booking_id, &query.client_id, &staff.id)?
    };
    Ok(Json(serde_json::json!({ "has_message": has_message })))
}
