use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: String,
    pub admin_email: String,
    pub email_api_key: String,
    pub email_api_url: String,
    pub sender_email: String,
    pub sender_name: String,
    pub business_name: String,
    pub otp_ttl_minutes: i64,
    pub session_ttl_hours: i64,
    pub payment_window_hours: i64,
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "catering.db".to_string()),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_default()
                .trim()
                .to_lowercase(),
            email_api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.brevo.com".to_string()),
            sender_email: env::var("SENDER_EMAIL").unwrap_or_default(),
            sender_name: env::var("SENDER_NAME").unwrap_or_else(|_| "Catering Admin".to_string()),
            business_name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Our Catering".to_string()),
            otp_ttl_minutes: parse_var("OTP_TTL_MINUTES", 5),
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", 12),
            payment_window_hours: parse_var("PAYMENT_WINDOW_HOURS", 20),
            sweep_interval_secs: parse_var("SWEEP_INTERVAL_SECS", 300),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
