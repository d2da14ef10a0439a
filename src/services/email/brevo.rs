use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{EmailMessage, EmailProvider};

pub struct BrevoEmailProvider {
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: String,
    client: reqwest::Client,
}

impl BrevoEmailProvider {
    pub fn new(api_url: String, api_key: String, sender_email: String, sender_name: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            sender_email,
            sender_name,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmailProvider for BrevoEmailProvider {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        let url = format!("{}/v3/smtp/email", self.api_url);

        let mut recipient = json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            recipient["name"] = json!(name);
        }

        let body = json!({
            "sender": { "name": self.sender_name, "email": self.sender_email },
            "to": [recipient],
            "subject": message.subject,
            "htmlContent": message.html,
            "textContent": message.text,
        });

        self.client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("failed to reach email provider")?
            .error_for_status()
            .context("email provider returned error")?;

        Ok(())
    }
}
