use serde_json::Value;

use crate::config::MailConfig;
use crate::error::{AppError, AppResult};

/// Transactional email client over the Resend HTTP API. `None` when not
/// configured; callers degrade to a manual-fallback message, a mail failure
/// never fails the triggering action.
#[derive(Clone)]
pub struct MailerClient {
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl MailerClient {
    pub fn new(config: &MailConfig) -> Option<Self> {
        if config.resend_api_key.is_empty() || config.email_from.is_empty() {
            return None;
        }
        Some(Self {
            api_key: config.resend_api_key.clone(),
            from: config.email_from.clone(),
            client: reqwest::Client::new(),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        let resp = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Mail request failed: {}", e)))?;

        if !resp.status().is_success() {
            let body: Value = resp.json().await.unwrap_or_default();
            let msg = body["message"].as_str().unwrap_or("Failed to send email");
            return Err(AppError::Internal(format!("Mail error: {}", msg)));
        }
        Ok(())
    }
}
