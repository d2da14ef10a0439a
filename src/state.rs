use std::sync::{Arc, Mutex};

use chrono::Duration;
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::email::EmailProvider;
use crate::services::otp::{OtpStore, SessionStore};

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub email: Box<dyn EmailProvider>,
    pub otps: OtpStore,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig, email: Box<dyn EmailProvider>) -> Self {
        let otps = OtpStore::new(Duration::minutes(config.otp_ttl_minutes));
        let sessions = SessionStore::new(Duration::hours(config.session_ttl_hours));
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            email,
            otps,
            sessions,
        }
    }
}
