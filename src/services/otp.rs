use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use serde::Serialize;

use crate::errors::AppError;

pub const MAX_ATTEMPTS: u32 = 5;
pub const RESEND_COOLDOWN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OtpError {
    #[error("a code was sent recently, retry in {retry_after_secs}s")]
    Cooldown { retry_after_secs: i64 },
    #[error("no login code was requested for this email")]
    NotRequested,
    #[error("login code expired")]
    Expired,
    #[error("invalid login code")]
    Invalid,
    #[error("too many failed attempts, request a new code")]
    TooManyAttempts,
}

impl From<OtpError> for AppError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::Cooldown { .. } | OtpError::TooManyAttempts => {
                AppError::RateLimited(e.to_string())
            }
            OtpError::NotRequested | OtpError::Expired | OtpError::Invalid => AppError::Unauthorized,
        }
    }
}

struct OtpEntry {
    code: String,
    issued_at: NaiveDateTime,
    expires_at: NaiveDateTime,
    attempts: u32,
}

pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// Compares without short-circuiting on the first differing byte.
fn codes_match(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Pending login codes keyed by normalized email. Codes are single use.
pub struct OtpStore {
    entries: Mutex<HashMap<String, OtpEntry>>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn issue(&self, email: &str, now: NaiveDateTime) -> Result<String, OtpError> {
        let mut entries = self.entries.lock().unwrap();

        if let Some(existing) = entries.get(email) {
            let elapsed = (now - existing.issued_at).num_seconds();
            if existing.expires_at > now && elapsed < RESEND_COOLDOWN_SECS {
                return Err(OtpError::Cooldown {
                    retry_after_secs: RESEND_COOLDOWN_SECS - elapsed,
                });
            }
        }

        let code = generate_code();
        entries.insert(
            email.to_string(),
            OtpEntry {
                code: code.clone(),
                issued_at: now,
                expires_at: now + self.ttl,
                attempts: 0,
            },
        );
        Ok(code)
    }

    pub fn verify(&self, email: &str, code: &str, now: NaiveDateTime) -> Result<(), OtpError> {
        let mut entries = self.entries.lock().unwrap();

        let Some(entry) = entries.get_mut(email) else {
            return Err(OtpError::NotRequested);
        };

        if entry.expires_at <= now {
            entries.remove(email);
            return Err(OtpError::Expired);
        }

        if !codes_match(&entry.code, code.trim()) {
            entry.attempts += 1;
            if entry.attempts >= MAX_ATTEMPTS {
                entries.remove(email);
                return Err(OtpError::TooManyAttempts);
            }
            return Err(OtpError::Invalid);
        }

        entries.remove(email);
        Ok(())
    }

    /// Drops a pending code, e.g. when it could not be delivered.
    pub fn discard(&self, email: &str) {
        self.entries.lock().unwrap().remove(email);
    }

    pub fn purge_expired(&self, now: NaiveDateTime) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    #[cfg(test)]
    fn peek_code(&self, email: &str) -> Option<String> {
        self.entries.lock().unwrap().get(email).map(|e| e.code.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub email: String,
    pub expires_at: NaiveDateTime,
}

/// Admin sessions created after a successful OTP check, keyed by bearer token.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn create(&self, email: &str, now: NaiveDateTime) -> (String, Session) {
        let token = uuid::Uuid::new_v4().to_string();
        let session = Session {
            email: email.to_string(),
            expires_at: now + self.ttl,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(token.clone(), session.clone());
        (token, session)
    }

    pub fn validate(&self, token: &str, now: NaiveDateTime) -> Option<Session> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get(token) {
            Some(s) if s.expires_at > now => Some(s.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().unwrap().remove(token).is_some()
    }

    pub fn purge_expired(&self, now: NaiveDateTime) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL: &str = "owner@example.com";

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn store() -> OtpStore {
        OtpStore::new(Duration::minutes(5))
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_codes_match() {
        assert!(codes_match("123456", "123456"));
        assert!(!codes_match("123456", "123457"));
        assert!(!codes_match("123456", "023456"));
        assert!(!codes_match("123456", "12345"));
        assert!(!codes_match("123456", ""));
    }

    #[test]
    fn test_verify_once() {
        let otps = store();
        let now = dt("2026-10-14 10:00:00");
        let code = otps.issue(EMAIL, now).unwrap();

        assert_eq!(otps.verify(EMAIL, &code, now + Duration::seconds(30)), Ok(()));
        assert_eq!(
            otps.verify(EMAIL, &code, now + Duration::seconds(31)),
            Err(OtpError::NotRequested)
        );
    }

    #[test]
    fn test_expired_code_is_removed() {
        let otps = store();
        let now = dt("2026-10-14 10:00:00");
        let code = otps.issue(EMAIL, now).unwrap();

        let later = now + Duration::minutes(5);
        assert_eq!(otps.verify(EMAIL, &code, later), Err(OtpError::Expired));
        assert_eq!(otps.verify(EMAIL, &code, later), Err(OtpError::NotRequested));
    }

    #[test]
    fn test_too_many_attempts_burns_code() {
        let otps = store();
        let now = dt("2026-10-14 10:00:00");
        let code = otps.issue(EMAIL, now).unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..MAX_ATTEMPTS - 1 {
            assert_eq!(otps.verify(EMAIL, wrong, now), Err(OtpError::Invalid));
        }
        assert_eq!(otps.verify(EMAIL, wrong, now), Err(OtpError::TooManyAttempts));
        assert_eq!(otps.verify(EMAIL, &code, now), Err(OtpError::NotRequested));
    }

    #[test]
    fn test_resend_cooldown() {
        let otps = store();
        let now = dt("2026-10-14 10:00:00");
        otps.issue(EMAIL, now).unwrap();

        assert_eq!(
            otps.issue(EMAIL, now + Duration::seconds(20)),
            Err(OtpError::Cooldown { retry_after_secs: 40 })
        );

        let reissued = otps.issue(EMAIL, now + Duration::seconds(60)).unwrap();
        assert_eq!(otps.peek_code(EMAIL), Some(reissued));
    }

    #[test]
    fn test_purge_expired_codes() {
        let otps = store();
        let now = dt("2026-10-14 10:00:00");
        otps.issue(EMAIL, now).unwrap();
        otps.issue("other@example.com", now + Duration::minutes(3)).unwrap();

        assert_eq!(otps.purge_expired(now + Duration::minutes(6)), 1);
        assert!(otps.peek_code(EMAIL).is_none());
        assert!(otps.peek_code("other@example.com").is_some());
    }

    #[test]
    fn test_sessions_expire_and_revoke() {
        let sessions = SessionStore::new(Duration::hours(12));
        let now = dt("2026-10-14 10:00:00");
        let (token, session) = sessions.create(EMAIL, now);
        assert_eq!(session.expires_at, dt("2026-10-14 22:00:00"));

        assert!(sessions.validate(&token, now + Duration::hours(1)).is_some());
        assert!(sessions.validate(&token, now + Duration::hours(12)).is_none());

        let (token, _) = sessions.create(EMAIL, now);
        assert!(sessions.revoke(&token));
        assert!(!sessions.revoke(&token));
        assert!(sessions.validate(&token, now).is_none());
    }
}
