use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::check_auth;
use crate::errors::AppError;
use crate::services::bookings::{self, Transition};
use crate::services::email::templates;
use crate::state::AppState;

// POST /api/email/send
#[derive(Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub message: String,
}

pub async fn send_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SendEmailRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = check_auth(&headers, &state)?;

    let to = body.to.trim();
    let subject = body.subject.trim();
    if !to.contains('@') || subject.is_empty() || body.message.trim().is_empty() {
        return Err(AppError::BadRequest(
            "to, subject and message are required".to_string(),
        ));
    }

    let message = templates::admin_message(&state.config.business_name, to, subject, &body.message);
    state
        .email
        .send(&message)
        .await
        .map_err(|e| AppError::Email(e.to_string()))?;

    tracing::info!(to = %to, subject = %subject, sent_by = %session.email, "admin email sent");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// POST /api/email/bookings/:id/notify
pub async fn notify_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Transition>, AppError> {
    check_auth(&headers, &state)?;
    Ok(Json(bookings::resend_notification(&state, &id).await?))
}
