use serde_json::Value;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

/// Lightweight client for the identity provider's HTTP API, wrapping the two
/// server-side calls this service makes: PKCE code exchange for the auth
/// callback and admin recovery-link generation. `None` when unconfigured.
#[derive(Clone)]
pub struct IdentityClient {
    base_url: String,
    service_role_key: String,
    client: reqwest::Client,
}

impl IdentityClient {
    pub fn new(config: &AuthConfig) -> Option<Self> {
        if config.identity_url.is_empty() || config.service_role_key.is_empty() {
            return None;
        }
        Some(Self {
            base_url: config.identity_url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
            client: reqwest::Client::new(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> AppResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Identity provider request failed: {}", e)))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Identity provider response parse failed: {}", e)))?;

        if !status.is_success() {
            let msg = body["msg"]
                .as_str()
                .or_else(|| body["error_description"].as_str())
                .or_else(|| body["message"].as_str())
                .unwrap_or("Unknown identity provider error");
            return Err(AppError::Internal(format!("Identity provider error: {}", msg)));
        }
        Ok(body)
    }

    /// Exchange an auth-callback code for a session. The session itself is
    /// managed by the provider; we only surface success or failure.
    pub async fn exchange_code(&self, code: &str) -> AppResult<Value> {
        self.post(
            "/auth/v1/token?grant_type=pkce",
            serde_json::json!({ "auth_code": code }),
        )
        .await
    }

    /// Generate a password-recovery link for the given email via the admin
    /// API. Requires the service-role key.
    pub async fn generate_recovery_link(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> AppResult<String> {
        let body = self
            .post(
                "/auth/v1/admin/generate_link",
                serde_json::json!({
                    "type": "recovery",
                    "email": email,
                    "redirect_to": redirect_to,
                }),
            )
            .await?;

        body["action_link"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::Internal("Identity provider returned no link".into()))
    }
}
