use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use super::bookings::ReasonRequest;
use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Staff, StaffRole, StaffStatus};
use crate::services::export;
use crate::services::staff::{self, StaffApplication, StaffChange};
use crate::state::AppState;

// POST /api/staff
pub async fn apply(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StaffApplication>,
) -> Result<(StatusCode, Json<Staff>), AppError> {
    let created = staff::apply(&state, body, Utc::now().naive_utc())?;
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/admin/staff
#[derive(Deserialize)]
pub struct StaffQuery {
    pub status: Option<String>,
    pub role: Option<String>,
}

fn load_filtered(state: &AppState, query: &StaffQuery) -> Result<Vec<Staff>, AppError> {
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            StaffStatus::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}")))?,
        ),
        None => None,
    };
    let role = match query.role.as_deref().filter(|s| !s.is_empty()) {
        Some(r) => Some(
            StaffRole::parse(r).ok_or_else(|| AppError::BadRequest(format!("unknown role: {r}")))?,
        ),
        None => None,
    };

    let db = state.db.lock().unwrap();
    Ok(queries::list_staff(&db, status, role)?)
}

pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StaffQuery>,
) -> Result<Json<Vec<Staff>>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(load_filtered(&state, &query)?))
}

// GET /api/admin/staff/:id
pub async fn get_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Staff>, AppError> {
    check_auth(&headers, &state)?;
    let found = {
        let db = state.db.lock().unwrap();
        queries::get_staff(&db, &id)?
    };
    found
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("staff {id}")))
}

// POST /api/admin/staff/:id/approve
pub async fn approve(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<StaffChange>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(staff::approve(&state, &id, Utc::now().naive_utc()).await?))
}

// POST /api/admin/staff/:id/reject
pub async fn reject(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReasonRequest>,
) -> Result<Json<StaffChange>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(
        staff::reject(&state, &id, &body.reason, Utc::now().naive_utc()).await?,
    ))
}

// POST /api/admin/staff/:id/suspend
pub async fn suspend(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReasonRequest>,
) -> Result<Json<StaffChange>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(
        staff::suspend(&state, &id, &body.reason, Utc::now().naive_utc()).await?,
    ))
}

// POST /api/admin/staff/:id/reinstate
pub async fn reinstate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<StaffChange>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(staff::reinstate(&state, &id, Utc::now().naive_utc()).await?))
}

// POST /api/admin/staff/:id/role
#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: StaffRole,
}

pub async fn change_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<Staff>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(staff::change_role(
        &state,
        &id,
        body.role,
        Utc::now().naive_utc(),
    )?))
}

// GET /api/admin/staff/export.csv
pub async fn export_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StaffQuery>,
) -> Result<Response, AppError> {
    check_auth(&headers, &state)?;
    let rows = load_filtered(&state, &query)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"staff.csv\""),
        ],
        export::staff_csv(&rows),
    )
        .into_response())
}
