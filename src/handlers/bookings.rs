use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use super::check_auth;
use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, NewBooking, PaymentStatus};
use crate::services::bookings::{self, Transition};
use crate::services::export;
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewBooking>,
) -> Result<(StatusCode, Json<Transition>), AppError> {
    let created = bookings::create_booking(&state, body, Utc::now().naive_utc()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/admin/bookings
#[derive(Deserialize, Default)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl BookingsQuery {
    fn into_filter(self) -> Result<BookingFilter, AppError> {
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(
                BookingStatus::parse(s)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}")))?,
            ),
            None => None,
        };
        let payment_status = match self.payment_status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(
                PaymentStatus::parse(s)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown payment status: {s}")))?,
            ),
            None => None,
        };

        Ok(BookingFilter {
            status,
            payment_status,
            search: self.search,
            limit: Some(self.limit.unwrap_or(100).clamp(1, 1000)),
            offset: self.offset.map(|o| o.max(0)),
        })
    }
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state)?;
    let filter = query.into_filter()?;

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::list_bookings(&db, &filter)?
    };
    Ok(Json(bookings))
}

// GET /api/admin/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state)?;

    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_id(&db, &id)?
    };
    booking
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// POST /api/admin/bookings/:id/approve
pub async fn approve_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Transition>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(bookings::approve(&state, &id, Utc::now().naive_utc()).await?))
}

#[derive(Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

// POST /api/admin/bookings/:id/reject
pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReasonRequest>,
) -> Result<Json<Transition>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(
        bookings::reject(&state, &id, &body.reason, Utc::now().naive_utc()).await?,
    ))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReasonRequest>,
) -> Result<Json<Transition>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(
        bookings::cancel(&state, &id, &body.reason, Utc::now().naive_utc()).await?,
    ))
}

// POST /api/admin/bookings/:id/payment
#[derive(Deserialize, Default)]
pub struct PaymentRequest {
    pub reference: Option<String>,
}

pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<PaymentRequest>>,
) -> Result<Json<Transition>, AppError> {
    check_auth(&headers, &state)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    Ok(Json(
        bookings::record_payment(&state, &id, body.reference.as_deref(), Utc::now().naive_utc())
            .await?,
    ))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Transition>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(bookings::complete(&state, &id, Utc::now().naive_utc()).await?))
}

// GET /api/admin/bookings/export.csv
pub async fn export_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Response, AppError> {
    check_auth(&headers, &state)?;
    let mut filter = query.into_filter()?;
    filter.limit = Some(i64::MAX);

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::list_bookings(&db, &filter)?
    };

    let filename = format!("bookings-{}.csv", Utc::now().format("%Y%m%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        export::bookings_csv(&bookings),
    )
        .into_response())
}
