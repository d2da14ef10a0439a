use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Staff, StaffRole, StaffStatus};
use crate::services::email::{deliver, templates, EmailMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StaffApplication {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: StaffRole,
}

#[derive(Debug, Serialize)]
pub struct StaffChange {
    pub staff: Staff,
    pub email_sent: bool,
}

fn load(conn: &Connection, id: &str) -> Result<Staff, AppError> {
    queries::get_staff(conn, id)?.ok_or_else(|| AppError::NotFound(format!("staff {id}")))
}

pub fn apply(state: &AppState, input: StaffApplication, now: NaiveDateTime) -> Result<Staff, AppError> {
    let full_name = input.full_name.trim().to_string();
    let email = input.email.trim().to_lowercase();
    if full_name.is_empty() {
        return Err(AppError::BadRequest("full_name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("email is invalid".to_string()));
    }

    let db = state.db.lock().unwrap();
    if queries::get_staff_by_email(&db, &email)?.is_some() {
        return Err(AppError::Conflict(format!("{email} has already applied")));
    }

    let staff = Staff {
        id: uuid::Uuid::new_v4().to_string(),
        full_name,
        email,
        phone: input.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        role: input.role,
        status: StaffStatus::Pending,
        status_reason: None,
        created_at: now,
        updated_at: now,
    };
    queries::create_staff(&db, &staff)?;
    tracing::info!(staff_id = %staff.id, role = staff.role.as_str(), "staff application received");
    Ok(staff)
}

async fn change_status(
    state: &AppState,
    id: &str,
    from: StaffStatus,
    next: StaffStatus,
    reason: Option<&str>,
    now: NaiveDateTime,
    message: fn(&str, &Staff) -> EmailMessage,
) -> Result<StaffChange, AppError> {
    let staff = {
        let db = state.db.lock().unwrap();
        let current = load(&db, id)?;
        if current.status != from || !from.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "cannot move staff from {} to {}",
                current.status.as_str(),
                next.as_str()
            )));
        }

        if !queries::set_staff_status(&db, id, from, next, reason, &now)? {
            return Err(AppError::Conflict(format!(
                "staff {id} was modified by another request"
            )));
        }
        load(&db, id)?
    };

    tracing::info!(staff_id = %id, status = next.as_str(), "staff status changed");
    let email_sent = deliver(state, message(&state.config.business_name, &staff)).await;
    Ok(StaffChange { staff, email_sent })
}

fn required_reason(reason: &str) -> Result<&str, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("a reason is required".to_string()));
    }
    Ok(reason)
}

pub async fn approve(state: &AppState, id: &str, now: NaiveDateTime) -> Result<StaffChange, AppError> {
    change_status(
        state,
        id,
        StaffStatus::Pending,
        StaffStatus::Approved,
        None,
        now,
        templates::staff_approved,
    )
    .await
}

pub async fn reject(
    state: &AppState,
    id: &str,
    reason: &str,
    now: NaiveDateTime,
) -> Result<StaffChange, AppError> {
    let reason = required_reason(reason)?;
    change_status(
        state,
        id,
        StaffStatus::Pending,
        StaffStatus::Rejected,
        Some(reason),
        now,
        templates::staff_rejected,
    )
    .await
}

pub async fn suspend(
    state: &AppState,
    id: &str,
    reason: &str,
    now: NaiveDateTime,
) -> Result<StaffChange, AppError> {
    let reason = required_reason(reason)?;
    change_status(
        state,
        id,
        StaffStatus::Approved,
        StaffStatus::Suspended,
        Some(reason),
        now,
        templates::staff_suspended,
    )
    .await
}

pub async fn reinstate(state: &AppState, id: &str, now: NaiveDateTime) -> Result<StaffChange, AppError> {
    change_status(
        state,
        id,
        StaffStatus::Suspended,
        StaffStatus::Approved,
        None,
        now,
        templates::staff_reinstated,
    )
    .await
}

pub fn change_role(
    state: &AppState,
    id: &str,
    role: StaffRole,
    now: NaiveDateTime,
) -> Result<Staff, AppError> {
    let db = state.db.lock().unwrap();
    let current = load(&db, id)?;
    if current.status == StaffStatus::Rejected {
        return Err(AppError::Conflict("rejected staff cannot be assigned a role".to_string()));
    }
    if !queries::update_staff_role(&db, id, role, &now)? {
        return Err(AppError::Conflict(format!("staff {id} was modified by another request")));
    }
    tracing::info!(staff_id = %id, role = role.as_str(), "staff role changed");
    load(&db, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::bookings::tests::{dt, test_state};

    fn application(email: &str) -> StaffApplication {
        StaffApplication {
            full_name: "Carlos Reyes".to_string(),
            email: email.to_string(),
            phone: Some(" ".to_string()),
            role: StaffRole::Server,
        }
    }

    #[tokio::test]
    async fn test_application_lifecycle() {
        let (state, sent) = test_state(false);
        let now = dt("2026-10-01 09:00");
        let staff = apply(&state, application("Carlos@Example.com"), now).unwrap();
        assert_eq!(staff.email, "carlos@example.com");
        assert_eq!(staff.phone, None);
        assert_eq!(staff.status, StaffStatus::Pending);

        let approved = approve(&state, &staff.id, now).await.unwrap();
        assert_eq!(approved.staff.status, StaffStatus::Approved);

        let suspended = suspend(&state, &staff.id, "No-show", now).await.unwrap();
        assert_eq!(suspended.staff.status, StaffStatus::Suspended);
        assert_eq!(suspended.staff.status_reason.as_deref(), Some("No-show"));

        let back = reinstate(&state, &staff.id, now).await.unwrap();
        assert_eq!(back.staff.status, StaffStatus::Approved);
        assert_eq!(back.staff.status_reason, None);

        let subjects: Vec<String> = sent.lock().unwrap().iter().map(|m| m.subject.clone()).collect();
        assert_eq!(subjects.len(), 3);
        assert!(subjects[1].contains("suspended"));
    }

    #[tokio::test]
    async fn test_duplicate_application() {
        let (state, _) = test_state(false);
        let now = dt("2026-10-01 09:00");
        apply(&state, application("carlos@example.com"), now).unwrap();
        assert!(matches!(
            apply(&state, application("CARLOS@example.com"), now),
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_is_terminal() {
        let (state, _) = test_state(false);
        let now = dt("2026-10-01 09:00");
        let staff = apply(&state, application("carlos@example.com"), now).unwrap();

        assert!(matches!(
            reject(&state, &staff.id, "", now).await,
            Err(AppError::BadRequest(_))
        ));
        reject(&state, &staff.id, "Not enough experience", now).await.unwrap();

        assert!(matches!(approve(&state, &staff.id, now).await, Err(AppError::Conflict(_))));
        assert!(matches!(reinstate(&state, &staff.id, now).await, Err(AppError::Conflict(_))));
        assert!(matches!(
            change_role(&state, &staff.id, StaffRole::Chef, now),
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_suspended_staff_return_only_via_reinstate() {
        let (state, sent) = test_state(false);
        let now = dt("2026-10-01 09:00");
        let staff = apply(&state, application("carlos@example.com"), now).unwrap();

        assert!(matches!(reinstate(&state, &staff.id, now).await, Err(AppError::Conflict(_))));
        approve(&state, &staff.id, now).await.unwrap();
        assert!(matches!(reinstate(&state, &staff.id, now).await, Err(AppError::Conflict(_))));

        suspend(&state, &staff.id, "No-show", now).await.unwrap();
        assert!(matches!(approve(&state, &staff.id, now).await, Err(AppError::Conflict(_))));
        assert!(matches!(
            reject(&state, &staff.id, "Changed our mind", now).await,
            Err(AppError::Conflict(_))
        ));

        sent.lock().unwrap().clear();
        let back = reinstate(&state, &staff.id, now).await.unwrap();
        assert_eq!(back.staff.status, StaffStatus::Approved);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("reinstated"), "{}", sent[0].subject);
    }

    #[tokio::test]
    async fn test_change_role() {
        let (state, _) = test_state(false);
        let now = dt("2026-10-01 09:00");
        let staff = apply(&state, application("carlos@example.com"), now).unwrap();
        let updated = change_role(&state, &staff.id, StaffRole::Bartender, now).unwrap();
        assert_eq!(updated.role, StaffRole::Bartender);
    }
}
