use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{User, UserStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

pub fn register(state: &AppState, input: Registration, now: NaiveDateTime) -> Result<User, AppError> {
    let full_name = input.full_name.trim().to_string();
    let email = input.email.trim().to_lowercase();
    if full_name.is_empty() {
        return Err(AppError::BadRequest("full_name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("email is invalid".to_string()));
    }

    let db = state.db.lock().unwrap();
    if queries::get_user_by_email(&db, &email)?.is_some() {
        return Err(AppError::Conflict(format!("{email} is already registered")));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        full_name,
        email,
        phone: input.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        status: UserStatus::Active,
        blocked_reason: None,
        created_at: now,
        updated_at: now,
    };
    queries::create_user(&db, &user)?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

pub fn block(state: &AppState, id: &str, reason: &str, now: NaiveDateTime) -> Result<User, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("a reason is required".to_string()));
    }
    set_status(state, id, UserStatus::Active, UserStatus::Blocked, Some(reason), now)
}

pub fn unblock(state: &AppState, id: &str, now: NaiveDateTime) -> Result<User, AppError> {
    set_status(state, id, UserStatus::Blocked, UserStatus::Active, None, now)
}

fn set_status(
    state: &AppState,
    id: &str,
    from: UserStatus,
    to: UserStatus,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<User, AppError> {
    let db = state.db.lock().unwrap();
    let current = queries::get_user(&db, id)?.ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    if current.status != from {
        return Err(AppError::Conflict(format!("user is already {}", current.status.as_str())));
    }
    if !queries::set_user_status(&db, id, from, to, reason, &now)? {
        return Err(AppError::Conflict(format!("user {id} was modified by another request")));
    }
    tracing::info!(user_id = %id, status = to.as_str(), "user status changed");
    queries::get_user(&db, id)?.ok_or_else(|| AppError::NotFound(format!("user {id}")))
}
