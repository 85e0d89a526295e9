use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::handlers::{caller, require_role, STAFF};
use crate::models::{Role, User};
use crate::state::AppState;

// POST /api/users
#[derive(Deserialize)]
pub struct CreateUserRequest {
    /// Subject id from the identity provider; generated when absent.
    pub id: Option<String>,
    pub email: String,
    pub role: Option<String>,
}

/// Registers a user. Anyone may register a client; other roles need an admin.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let role = match body.role.as_deref() {
        Some(raw) => parse_role(raw)?,
        None => Role::Client,
    };
    if role != Role::Client {
        require_role(&caller(&headers)?, &[Role::Admin])?;
    }

    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest(format!("invalid email: {}", body.email)));
    }

    let user = User {
        id: body
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        email,
        role,
        created_at: queries::format_ts(&queries::now_naive()),
    };

    {
        let db = state.db()?;
        queries::create_user(&db, &user).map_err(|e| match db::unique_violation_column(&e) {
            Some("users.email") => {
                AppError::Conflict(format!("a user with email {} already exists", user.email))
            }
            Some(_) => AppError::Conflict(format!("user id {} is already taken", user.id)),
            None => AppError::Database(e),
        })?;
    }

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");

    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, AppError> {
    require_role(&caller(&headers)?, STAFF)?;

    let users = {
        let db = state.db()?;
        queries::list_users(&db)?
    };
    Ok(Json(users))
}

// PATCH /api/users/:id/role
#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<User>, AppError> {
    let admin = caller(&headers)?;
    require_role(&admin, &[Role::Admin])?;
    let role = parse_role(&body.role)?;

    let user = {
        let db = state.db()?;
        if !queries::update_user_role(&db, &id, role)? {
            return Err(AppError::NotFound(format!("user {id}")));
        }
        queries::get_user(&db, &id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    tracing::info!(user_id = %id, role = role.as_str(), changed_by = %admin.id, "user role changed");

    Ok(Json(user))
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    Role::parse(raw).ok_or_else(|| AppError::BadRequest(format!("invalid role: {raw}")))
}
