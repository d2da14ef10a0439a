use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{bearer_token, check_auth};
use crate::errors::AppError;
use crate::services::email::templates;
use crate::state::AppState;

// POST /api/auth/otp/request
#[derive(Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

pub async fn request_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OtpRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || email != state.config.admin_email {
        tracing::warn!(email = %email, "login code requested for non-admin email");
        return Err(AppError::Forbidden("email is not authorized".to_string()));
    }

    let code = state.otps.issue(&email, Utc::now().naive_utc())?;
    let message = templates::otp_code(
        &state.config.business_name,
        &email,
        &code,
        state.config.otp_ttl_minutes,
    );

    if let Err(e) = state.email.send(&message).await {
        tracing::error!(error = %e, "failed to send login code");
        state.otps.discard(&email);
        return Err(AppError::Email("could not send login code".to_string()));
    }

    tracing::info!(email = %email, "login code sent");
    Ok(Json(serde_json::json!({
        "ok": true,
        "expires_in_secs": state.config.otp_ttl_minutes * 60,
    })))
}

// POST /api/auth/otp/verify
#[derive(Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub email: String,
    pub expires_at: NaiveDateTime,
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = body.email.trim().to_lowercase();
    let now = Utc::now().naive_utc();

    if let Err(e) = state.otps.verify(&email, &body.code, now) {
        tracing::warn!(email = %email, reason = %e, "login code rejected");
        return Err(e.into());
    }

    let (token, session) = state.sessions.create(&email, now);
    tracing::info!(email = %email, "admin logged in");
    Ok(Json(SessionResponse {
        token,
        email: session.email,
        expires_at: session.expires_at,
    }))
}

// GET /api/auth/session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = check_auth(&headers, &state)?;
    Ok(Json(serde_json::json!({
        "email": session.email,
        "expires_at": session.expires_at,
    })))
}

// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state)?;
    state.sessions.revoke(bearer_token(&headers));
    Ok(Json(serde_json::json!({ "ok": true })))
}
