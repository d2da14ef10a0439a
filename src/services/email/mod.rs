pub mod brevo;
pub mod templates;

use async_trait::async_trait;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Used when no provider API key is configured. Messages only reach the log.
pub struct LogEmailProvider;

#[async_trait]
impl EmailProvider for LogEmailProvider {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        tracing::warn!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "email provider not configured, message logged only"
        );
        Ok(())
    }
}

/// Sends a notification, logging instead of failing. Returns whether it went out.
pub async fn deliver(state: &AppState, message: EmailMessage) -> bool {
    match state.email.send(&message).await {
        Ok(()) => {
            tracing::info!(to = %message.to, subject = %message.subject, "email sent");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, to = %message.to, subject = %message.subject, "failed to send email");
            false
        }
    }
}
