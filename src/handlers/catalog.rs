use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::handlers::{caller, require_role, STAFF};
use crate::models::service::MAX_SERVICE_MINUTES;
use crate::models::Service;
use crate::state::AppState;

// POST /api/services
#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub price: f64,
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    require_role(&caller(&headers)?, STAFF)?;

    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("service title is required".to_string()));
    }
    if body.duration_minutes <= 0 || body.duration_minutes > MAX_SERVICE_MINUTES {
        return Err(AppError::BadRequest(format!(
            "duration_minutes must be between 1 and {MAX_SERVICE_MINUTES}"
        )));
    }
    if !body.price.is_finite() || body.price < 0.0 {
        return Err(AppError::BadRequest("price must be non-negative".to_string()));
    }

    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: body.description,
        duration_minutes: body.duration_minutes,
        price: body.price,
    };

    {
        let db = state.db()?;
        queries::create_service(&db, &service).map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::Conflict(format!("service {} already exists", service.id))
            } else {
                AppError::Database(e)
            }
        })?;
    }

    tracing::info!(service_id = %service.id, duration = service.duration_minutes, "service created");

    Ok((StatusCode::CREATED, Json(service)))
}

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = {
        let db = state.db()?;
        queries::list_services(&db)?
    };
    Ok(Json(services))
}
