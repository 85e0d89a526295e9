use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{caller, require_role, STAFF};
use crate::models::Vehicle;
use crate::state::AppState;

// GET /api/vehicles/remembered?owner_id=
#[derive(Deserialize)]
pub struct RememberedQuery {
    pub owner_id: Option<String>,
}

pub async fn remembered(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RememberedQuery>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let caller = caller(&headers)?;
    let owner_id = query.owner_id.unwrap_or_else(|| caller.id.clone());
    if owner_id != caller.id {
        require_role(&caller, STAFF)?;
    }

    let vehicles = {
        let db = state.db()?;
        queries::remembered_vehicles(&db, &owner_id)?
    };
    Ok(Json(vehicles))
}

// DELETE /api/vehicles/:id
pub async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let caller = caller(&headers)?;

    let db = state.db()?;
    let vehicle = queries::get_vehicle(&db, &id)?
        .filter(|v| !v.is_deleted)
        .ok_or_else(|| AppError::NotFound(format!("vehicle {id}")))?;
    if vehicle.owner_id != caller.id {
        require_role(&caller, STAFF)?;
    }

    queries::soft_delete_vehicle(&db, &id)?;
    tracing::info!(vehicle_id = %id, "vehicle deleted");

    Ok(StatusCode::NO_CONTENT)
}
