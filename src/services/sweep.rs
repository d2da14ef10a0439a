use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};

use crate::db::queries;
use crate::models::Booking;
use crate::services::email::{deliver, templates};
use crate::state::AppState;

#[derive(Debug, Default)]
pub struct SweepReport {
    pub expired: Vec<String>,
    pub emails_failed: usize,
    pub otps_purged: usize,
    pub sessions_purged: usize,
}

fn expire_one(conn: &rusqlite::Connection, id: &str, now: &NaiveDateTime) -> anyhow::Result<Option<Booking>> {
    if !queries::expire_booking(conn, id, now)? {
        return Ok(None);
    }
    queries::get_booking_by_id(conn, id)
}

/// Cancels approved bookings left unpaid past their deadline and drops stale
/// login codes and sessions.
///
/// A database error stops the pass, but bookings already cancelled in it are
/// still notified before the error is returned.
pub async fn run_sweep(state: &AppState, now: NaiveDateTime) -> anyhow::Result<SweepReport> {
    let (expired, failure) = {
        let db = state.db.lock().unwrap();
        let overdue = queries::list_overdue_bookings(&db, &now)?;

        let mut expired = Vec::with_capacity(overdue.len());
        let mut failure = None;
        for booking in overdue {
            match expire_one(&db, &booking.id, &now) {
                Ok(Some(updated)) => expired.push(updated),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(booking_id = %booking.id, error = %e, "failed to expire booking");
                    failure = Some(e);
                    break;
                }
            }
        }
        (expired, failure)
    };

    let mut report = SweepReport::default();
    for booking in expired {
        tracing::info!(
            booking_id = %booking.id,
            deadline = ?booking.payment_deadline,
            "booking expired: payment deadline passed"
        );
        if !deliver(state, templates::booking_expired(&state.config.business_name, &booking)).await {
            report.emails_failed += 1;
        }
        report.expired.push(booking.id);
    }

    report.otps_purged = state.otps.purge_expired(now);
    report.sessions_purged = state.sessions.purge_expired(now);

    if let Some(e) = failure {
        return Err(e.context(format!("expiry sweep stopped after {} bookings", report.expired.len())));
    }
    Ok(report)
}

pub fn spawn(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(state.config.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match run_sweep(&state, Utc::now().naive_utc()).await {
                Ok(report) if !report.expired.is_empty() => {
                    tracing::info!(
                        expired = report.expired.len(),
                        emails_failed = report.emails_failed,
                        "expiry sweep finished"
                    );
                }
                Ok(report) => {
                    tracing::debug!(
                        otps_purged = report.otps_purged,
                        sessions_purged = report.sessions_purged,
                        "expiry sweep found nothing to expire"
                    );
                }
                Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::EXPIRED_REASON;
    use crate::models::BookingStatus;
    use crate::services::bookings::tests::{dt, new_booking, test_state};
    use crate::services::bookings;

    #[tokio::test]
    async fn test_sweep_expires_only_overdue_unpaid() {
        let (state, sent) = test_state(false);
        let created = dt("2026-10-01 08:00");

        let overdue = bookings::create_booking(&state, new_booking(), created).await.unwrap().booking;
        let paid = bookings::create_booking(&state, new_booking(), created).await.unwrap().booking;
        let fresh = bookings::create_booking(&state, new_booking(), created).await.unwrap().booking;
        let pending = bookings::create_booking(&state, new_booking(), created).await.unwrap().booking;

        bookings::approve(&state, &overdue.id, dt("2026-10-01 09:00")).await.unwrap();
        bookings::approve(&state, &paid.id, dt("2026-10-01 09:00")).await.unwrap();
        bookings::record_payment(&state, &paid.id, None, dt("2026-10-01 10:00")).await.unwrap();
        bookings::approve(&state, &fresh.id, dt("2026-10-02 04:00")).await.unwrap();
        sent.lock().unwrap().clear();

        let report = run_sweep(&state, dt("2026-10-02 06:00")).await.unwrap();
        assert_eq!(report.expired, vec![overdue.id.clone()]);
        assert_eq!(report.emails_failed, 0);

        let db = state.db.lock().unwrap();
        let expired = queries::get_booking_by_id(&db, &overdue.id).unwrap().unwrap();
        assert_eq!(expired.status, BookingStatus::Cancelled);
        assert_eq!(expired.cancellation_reason.as_deref(), Some(EXPIRED_REASON));
        for id in [&paid.id, &fresh.id] {
            let b = queries::get_booking_by_id(&db, id).unwrap().unwrap();
            assert_eq!(b.status, BookingStatus::Approved);
        }
        let b = queries::get_booking_by_id(&db, &pending.id).unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Pending);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your booking has expired");
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let (state, _) = test_state(false);
        let b = bookings::create_booking(&state, new_booking(), dt("2026-10-01 08:00")).await.unwrap().booking;
        bookings::approve(&state, &b.id, dt("2026-10-01 09:00")).await.unwrap();

        let first = run_sweep(&state, dt("2026-10-03 00:00")).await.unwrap();
        let second = run_sweep(&state, dt("2026-10-03 00:05")).await.unwrap();
        assert_eq!(first.expired.len(), 1);
        assert!(second.expired.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_notifies_bookings_expired_before_a_failure() {
        let (state, sent) = test_state(false);
        let created = dt("2026-10-01 08:00");
        let first = bookings::create_booking(&state, new_booking(), created).await.unwrap().booking;
        let second = bookings::create_booking(&state, new_booking(), created).await.unwrap().booking;
        bookings::approve(&state, &first.id, dt("2026-10-01 09:00")).await.unwrap();
        bookings::approve(&state, &second.id, dt("2026-10-01 10:00")).await.unwrap();
        sent.lock().unwrap().clear();

        state
            .db
            .lock()
            .unwrap()
            .execute_batch(&format!(
                "CREATE TRIGGER block_second BEFORE UPDATE ON bookings WHEN OLD.id = '{}'
                 BEGIN SELECT RAISE(ABORT, 'row locked'); END;",
                second.id
            ))
            .unwrap();

        assert!(run_sweep(&state, dt("2026-10-03 00:00")).await.is_err());

        {
            let db = state.db.lock().unwrap();
            let b = queries::get_booking_by_id(&db, &first.id).unwrap().unwrap();
            assert_eq!(b.status, BookingStatus::Cancelled);
            let b = queries::get_booking_by_id(&db, &second.id).unwrap().unwrap();
            assert_eq!(b.status, BookingStatus::Approved);
        }

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your booking has expired");
    }

    #[tokio::test]
    async fn test_sweep_purges_login_state() {
        let (state, _) = test_state(false);
        let now = dt("2026-10-01 08:00");
        state.otps.issue("owner@example.com", now).unwrap();
        state.sessions.create("owner@example.com", now);

        let report = run_sweep(&state, dt("2026-10-01 21:00")).await.unwrap();
        assert_eq!(report.otps_purged, 1);
        assert_eq!(report.sessions_purged, 1);
    }
}
