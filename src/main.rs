use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use catering_admin::config::AppConfig;
use catering_admin::db;
use catering_admin::services::email::brevo::BrevoEmailProvider;
use catering_admin::services::email::{EmailProvider, LogEmailProvider};
use catering_admin::services::sweep;
use catering_admin::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(!config.admin_email.is_empty(), "ADMIN_EMAIL must be set");

    let conn = db::init_db(&config.database_url)?;

    let email: Box<dyn EmailProvider> = if config.email_api_key.is_empty() {
        tracing::warn!("EMAIL_API_KEY not set, emails will only be logged");
        Box::new(LogEmailProvider)
    } else {
        anyhow::ensure!(
            !config.sender_email.is_empty(),
            "SENDER_EMAIL must be set when EMAIL_API_KEY is set"
        );
        tracing::info!(api_url = %config.email_api_url, "using Brevo email provider");
        Box::new(BrevoEmailProvider::new(
            config.email_api_url.clone(),
            config.email_api_key.clone(),
            config.sender_email.clone(),
            config.sender_name.clone(),
        ))
    };

    let state = Arc::new(AppState::new(conn, config.clone(), email));

    sweep::spawn(Arc::clone(&state));
    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        payment_window_hours = config.payment_window_hours,
        "expiry sweep started"
    );

    let app = catering_admin::app(state);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
