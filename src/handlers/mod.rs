pub mod auth;
pub mod bookings;
pub mod dashboard;
pub mod email;
pub mod health;
pub mod staff;
pub mod users;

use axum::http::HeaderMap;
use chrono::Utc;

use crate::errors::AppError;
use crate::services::otp::Session;
use crate::state::AppState;

pub(crate) fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or("")
}

/// Resolves the admin session behind the request's bearer token.
pub(crate) fn check_auth(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let token = bearer_token(headers);
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    state
        .sessions
        .validate(token, Utc::now().naive_utc())
        .ok_or(AppError::Unauthorized)
}
