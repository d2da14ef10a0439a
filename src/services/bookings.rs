use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::booking::MAX_GUEST_COUNT;
use crate::models::{Booking, BookingStatus, NewBooking, PaymentStatus, UserStatus};
use crate::services::email::{deliver, templates};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Transition {
    pub booking: Booking,
    pub email_sent: bool,
}

fn load(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

/// Reloads after a conditional update. A miss means a concurrent writer moved the row first.
fn reload_after(conn: &Connection, id: &str, applied: bool) -> Result<Booking, AppError> {
    if !applied {
        return Err(AppError::Conflict(format!(
            "booking {id} was modified by another request"
        )));
    }
    load(conn, id)
}

fn ensure_transition(booking: &Booking, next: BookingStatus) -> Result<(), AppError> {
    if booking.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "cannot move booking from {} to {}",
            booking.status.as_str(),
            next.as_str()
        )))
    }
}

fn required_reason(reason: &str) -> Result<&str, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("a reason is required".to_string()));
    }
    Ok(reason)
}

/// Returns the booking total in cents.
fn validate_new(input: &NewBooking, now: NaiveDateTime) -> Result<i64, AppError> {
    let bad = |msg: &str| Err(AppError::BadRequest(msg.to_string()));

    if input.customer_name.trim().is_empty() {
        return bad("customer_name is required");
    }
    if !input.customer_email.contains('@') {
        return bad("customer_email is invalid");
    }
    if input.customer_phone.trim().is_empty() {
        return bad("customer_phone is required");
    }
    if input.event_venue.trim().is_empty() {
        return bad("event_venue is required");
    }
    if input.package_name.trim().is_empty() {
        return bad("package_name is required");
    }
    if input.guest_count <= 0 {
        return bad("guest_count must be positive");
    }
    if input.guest_count > MAX_GUEST_COUNT {
        return bad("guest_count is too large");
    }
    if input.price_per_guest_cents < 0 || input.additional_fees_cents < 0 {
        return bad("prices cannot be negative");
    }
    if input.event_date < now.date() {
        return bad("event_date is in the past");
    }
    match input.total_amount_cents() {
        Some(total) => Ok(total),
        None => bad("booking total is too large"),
    }
}

pub async fn create_booking(
    state: &AppState,
    input: NewBooking,
    now: NaiveDateTime,
) -> Result<Transition, AppError> {
    let total_amount_cents = validate_new(&input, now)?;
    let email = input.customer_email.trim().to_lowercase();

    let booking = {
        let db = state.db.lock().unwrap();

        let user = queries::get_user_by_email(&db, &email)?;
        if let Some(u) = &user {
            if u.status == UserStatus::Blocked {
                tracing::warn!(email = %email, "blocked user attempted to book");
                return Err(AppError::Forbidden("this account is blocked".to_string()));
            }
        }

        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.map(|u| u.id),
            customer_name: input.customer_name.trim().to_string(),
            customer_email: email,
            customer_phone: input.customer_phone.trim().to_string(),
            event_date: input.event_date,
            event_venue: input.event_venue.trim().to_string(),
            package_name: input.package_name.trim().to_string(),
            guest_count: input.guest_count,
            price_per_guest_cents: input.price_per_guest_cents,
            additional_fees_cents: input.additional_fees_cents,
            total_amount_cents,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_deadline: None,
            paid_at: None,
            payment_reference: None,
            rejection_reason: None,
            cancellation_reason: None,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };
        queries::create_booking(&db, &booking)?;
        booking
    };

    tracing::info!(booking_id = %booking.id, event_date = %booking.event_date, "booking created");
    let email_sent = deliver(state, templates::booking_received(&state.config.business_name, &booking)).await;
    Ok(Transition { booking, email_sent })
}

pub async fn approve(state: &AppState, id: &str, now: NaiveDateTime) -> Result<Transition, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        let booking = load(&db, id)?;
        ensure_transition(&booking, BookingStatus::Approved)?;

        let deadline = now + Duration::hours(state.config.payment_window_hours);
        let applied = queries::approve_booking(&db, id, &deadline, &now)?;
        reload_after(&db, id, applied)?
    };

    tracing::info!(booking_id = %id, deadline = ?booking.payment_deadline, "booking approved");
    let email_sent = deliver(state, templates::booking_approved(&state.config.business_name, &booking)).await;
    Ok(Transition { booking, email_sent })
}

pub async fn reject(
    state: &AppState,
    id: &str,
    reason: &str,
    now: NaiveDateTime,
) -> Result<Transition, AppError> {
    let reason = required_reason(reason)?;
    let booking = {
        let db = state.db.lock().unwrap();
        let booking = load(&db, id)?;
        ensure_transition(&booking, BookingStatus::Rejected)?;

        let applied = queries::reject_booking(&db, id, reason, &now)?;
        reload_after(&db, id, applied)?
    };

    tracing::info!(booking_id = %id, reason = %reason, "booking rejected");
    let email_sent = deliver(state, templates::booking_rejected(&state.config.business_name, &booking)).await;
    Ok(Transition { booking, email_sent })
}

pub async fn cancel(
    state: &AppState,
    id: &str,
    reason: &str,
    now: NaiveDateTime,
) -> Result<Transition, AppError> {
    let reason = required_reason(reason)?;
    let booking = {
        let db = state.db.lock().unwrap();
        let booking = load(&db, id)?;
        ensure_transition(&booking, BookingStatus::Cancelled)?;

        let applied = queries::cancel_booking(&db, id, reason, &now)?;
        reload_after(&db, id, applied)?
    };

    tracing::info!(booking_id = %id, reason = %reason, "booking cancelled");
    let email_sent = deliver(state, templates::booking_cancelled(&state.config.business_name, &booking)).await;
    Ok(Transition { booking, email_sent })
}

pub async fn record_payment(
    state: &AppState,
    id: &str,
    reference: Option<&str>,
    now: NaiveDateTime,
) -> Result<Transition, AppError> {
    let reference = reference.map(str::trim).filter(|r| !r.is_empty());
    let booking = {
        let db = state.db.lock().unwrap();
        let booking = load(&db, id)?;

        if booking.status != BookingStatus::Approved {
            return Err(AppError::Conflict(format!(
                "cannot record payment for a {} booking",
                booking.status.as_str()
            )));
        }
        if booking.payment_status == PaymentStatus::Paid {
            return Err(AppError::Conflict("booking is already paid".to_string()));
        }
        if booking.is_past_deadline(now) {
            return Err(AppError::Conflict("payment deadline has passed".to_string()));
        }

        let applied = queries::record_payment(&db, id, reference, &now)?;
        reload_after(&db, id, applied)?
    };

    tracing::info!(booking_id = %id, reference = ?reference, "payment recorded");
    let email_sent = deliver(state, templates::payment_received(&state.config.business_name, &booking)).await;
    Ok(Transition { booking, email_sent })
}

pub async fn complete(state: &AppState, id: &str, now: NaiveDateTime) -> Result<Transition, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        let booking = load(&db, id)?;
        ensure_transition(&booking, BookingStatus::Completed)?;

        if booking.payment_status != PaymentStatus::Paid {
            return Err(AppError::Conflict("booking has not been paid".to_string()));
        }
        if booking.event_date > now.date() {
            return Err(AppError::Conflict("event has not taken place yet".to_string()));
        }

        let applied = queries::complete_booking(&db, id, &now)?;
        reload_after(&db, id, applied)?
    };

    tracing::info!(booking_id = %id, "booking completed");
    let email_sent = deliver(state, templates::booking_completed(&state.config.business_name, &booking)).await;
    Ok(Transition { booking, email_sent })
}

/// Sends the notification matching the booking's current state again.
pub async fn resend_notification(state: &AppState, id: &str) -> Result<Transition, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        load(&db, id)?
    };

    let message = templates::for_booking(&state.config.business_name, &booking);
    if let Err(e) = state.email.send(&message).await {
        return Err(AppError::Email(e.to_string()));
    }
    tracing::info!(booking_id = %id, subject = %message.subject, "booking notification re-sent");
    Ok(Transition {
        booking,
        email_sent: true,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::config::AppConfig;
    use crate::db;
    use crate::models::booking::EXPIRED_REASON;
    use crate::services::email::{EmailMessage, EmailProvider};

    pub struct RecordingEmail {
        pub sent: Arc<Mutex<Vec<EmailMessage>>>,
        pub fail: bool,
    }

    #[async_trait]
    impl EmailProvider for RecordingEmail {
        async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("provider down");
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    pub fn test_config() -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            database_url: ":memory:".to_string(),
            admin_email: "owner@example.com".to_string(),
            email_api_key: String::new(),
            email_api_url: String::new(),
            sender_email: "noreply@example.com".to_string(),
            sender_name: "Test".to_string(),
            business_name: "Lola's Kitchen".to_string(),
            otp_ttl_minutes: 5,
            session_ttl_hours: 12,
            payment_window_hours: 20,
            sweep_interval_secs: 300,
        }
    }

    pub fn test_state(fail_email: bool) -> (AppState, Arc<Mutex<Vec<EmailMessage>>>) {
        let sent = Arc::new(Mutex::new(vec![]));
        let email = RecordingEmail {
            sent: Arc::clone(&sent),
            fail: fail_email,
        };
        let conn = db::init_db(":memory:").unwrap();
        (AppState::new(conn, test_config(), Box::new(email)), sent)
    }

    pub fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    pub fn new_booking() -> NewBooking {
        NewBooking {
            customer_name: " Maria Santos ".to_string(),
            customer_email: "Maria@Example.com".to_string(),
            customer_phone: "09171234567".to_string(),
            event_date: NaiveDate::from_ymd_opt(2026, 12, 20).unwrap(),
            event_venue: "Garden Pavilion".to_string(),
            package_name: "Silver".to_string(),
            guest_count: 80,
            price_per_guest_cents: 50_000,
            additional_fees_cents: 250_000,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_prices() {
        let (state, sent) = test_state(false);
        let t = create_booking(&state, new_booking(), dt("2026-10-01 09:00")).await.unwrap();

        assert_eq!(t.booking.customer_name, "Maria Santos");
        assert_eq!(t.booking.customer_email, "maria@example.com");
        assert_eq!(t.booking.total_amount_cents, 4_250_000);
        assert_eq!(t.booking.status, BookingStatus::Pending);
        assert!(t.email_sent);
        assert_eq!(sent.lock().unwrap()[0].to, "maria@example.com");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (state, _) = test_state(false);
        let now = dt("2026-10-01 09:00");

        let mut input = new_booking();
        input.guest_count = 0;
        assert!(matches!(
            create_booking(&state, input, now).await,
            Err(AppError::BadRequest(_))
        ));

        let mut input = new_booking();
        input.event_date = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();
        assert!(matches!(
            create_booking(&state, input, now).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_overflowing_totals() {
        let (state, _) = test_state(false);
        let now = dt("2026-10-01 09:00");

        let mut input = new_booking();
        input.guest_count = 10_000_000_000;
        input.price_per_guest_cents = 10_000_000_000;
        assert!(matches!(
            create_booking(&state, input, now).await,
            Err(AppError::BadRequest(_))
        ));

        let mut input = new_booking();
        input.guest_count = 2;
        input.price_per_guest_cents = i64::MAX;
        assert!(matches!(
            create_booking(&state, input, now).await,
            Err(AppError::BadRequest(_))
        ));

        let mut input = new_booking();
        input.price_per_guest_cents = 1;
        input.additional_fees_cents = i64::MAX;
        assert!(matches!(
            create_booking(&state, input, now).await,
            Err(AppError::BadRequest(_))
        ));

        assert!(!state.db.is_poisoned());
        assert!(create_booking(&state, new_booking(), now).await.is_ok());
    }

    #[tokio::test]
    async fn test_approve_sets_twenty_hour_deadline() {
        let (state, sent) = test_state(false);
        let created = create_booking(&state, new_booking(), dt("2026-10-01 09:00")).await.unwrap();

        let t = approve(&state, &created.booking.id, dt("2026-10-01 10:00")).await.unwrap();
        assert_eq!(t.booking.status, BookingStatus::Approved);
        assert_eq!(t.booking.payment_deadline, Some(dt("2026-10-02 06:00")));
        assert_eq!(sent.lock().unwrap().last().unwrap().subject, "Your booking has been approved");

        let again = approve(&state, &created.booking.id, dt("2026-10-01 11:00")).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let (state, _) = test_state(false);
        let created = create_booking(&state, new_booking(), dt("2026-10-01 09:00")).await.unwrap();
        let id = created.booking.id;

        assert!(matches!(
            reject(&state, &id, "   ", dt("2026-10-01 10:00")).await,
            Err(AppError::BadRequest(_))
        ));
        let t = reject(&state, &id, "Fully booked", dt("2026-10-01 10:00")).await.unwrap();
        assert_eq!(t.booking.status, BookingStatus::Rejected);
        assert_eq!(t.booking.rejection_reason.as_deref(), Some("Fully booked"));
    }

    #[tokio::test]
    async fn test_payment_after_deadline_is_refused() {
        let (state, _) = test_state(false);
        let created = create_booking(&state, new_booking(), dt("2026-10-01 09:00")).await.unwrap();
        let id = created.booking.id;
        approve(&state, &id, dt("2026-10-01 10:00")).await.unwrap();

        let late = record_payment(&state, &id, Some("GC-1"), dt("2026-10-02 06:01")).await;
        assert!(matches!(late, Err(AppError::Conflict(_))));

        let t = record_payment(&state, &id, Some("GC-1"), dt("2026-10-02 05:59")).await.unwrap();
        assert_eq!(t.booking.payment_status, PaymentStatus::Paid);
        assert_eq!(t.booking.paid_at, Some(dt("2026-10-02 05:59")));

        let twice = record_payment(&state, &id, None, dt("2026-10-02 05:59")).await;
        assert!(matches!(twice, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_complete_requires_payment_and_past_event() {
        let (state, _) = test_state(false);
        let created = create_booking(&state, new_booking(), dt("2026-10-01 09:00")).await.unwrap();
        let id = created.booking.id;
        approve(&state, &id, dt("2026-10-01 10:00")).await.unwrap();

        let unpaid = complete(&state, &id, dt("2026-12-21 09:00")).await;
        assert!(matches!(unpaid, Err(AppError::Conflict(_))));

        record_payment(&state, &id, None, dt("2026-10-01 12:00")).await.unwrap();
        let early = complete(&state, &id, dt("2026-12-19 09:00")).await;
        assert!(matches!(early, Err(AppError::Conflict(_))));

        let t = complete(&state, &id, dt("2026-12-20 23:00")).await.unwrap();
        assert_eq!(t.booking.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_from_approved_and_not_after_completion() {
        let (state, _) = test_state(false);
        let created = create_booking(&state, new_booking(), dt("2026-10-01 09:00")).await.unwrap();
        let id = created.booking.id;
        approve(&state, &id, dt("2026-10-01 10:00")).await.unwrap();

        let t = cancel(&state, &id, "Client request", dt("2026-10-01 11:00")).await.unwrap();
        assert_eq!(t.booking.status, BookingStatus::Cancelled);
        assert_eq!(t.booking.cancellation_reason.as_deref(), Some("Client request"));
        assert_ne!(t.booking.cancellation_reason.as_deref(), Some(EXPIRED_REASON));

        let again = cancel(&state, &id, "again", dt("2026-10-01 12:00")).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_email_failure_does_not_roll_back() {
        let (state, _) = test_state(true);
        let created = create_booking(&state, new_booking(), dt("2026-10-01 09:00")).await.unwrap();
        assert!(!created.email_sent);

        let t = approve(&state, &created.booking.id, dt("2026-10-01 10:00")).await.unwrap();
        assert!(!t.email_sent);
        assert_eq!(t.booking.status, BookingStatus::Approved);

        let resend = resend_notification(&state, &created.booking.id).await;
        assert!(matches!(resend, Err(AppError::Email(_))));
    }

    #[tokio::test]
    async fn test_missing_booking() {
        let (state, _) = test_state(false);
        assert!(matches!(
            approve(&state, "nope", dt("2026-10-01 10:00")).await,
            Err(AppError::NotFound(_))
        ));
    }
}
