use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use super::bookings::ReasonRequest;
use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{User, UserStatus};
use crate::services::users::{self, Registration};
use crate::state::AppState;

// POST /api/users
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Registration>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = users::register(&state, body, Utc::now().naive_utc())?;
    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/admin/users
#[derive(Deserialize)]
pub struct UsersQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    check_auth(&headers, &state)?;
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            UserStatus::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let found = {
        let db = state.db.lock().unwrap();
        queries::list_users(&db, status, query.search.as_deref())?
    };
    Ok(Json(found))
}

// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    check_auth(&headers, &state)?;
    let found = {
        let db = state.db.lock().unwrap();
        queries::get_user(&db, &id)?
    };
    found
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))
}

// POST /api/admin/users/:id/block
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReasonRequest>,
) -> Result<Json<User>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(users::block(&state, &id, &body.reason, Utc::now().naive_utc())?))
}

// POST /api/admin/users/:id/unblock
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(users::unblock(&state, &id, Utc::now().naive_utc())?))
}
