//! HTTP webhook notifier
//!
//! Sends the alert as JSON to a relay endpoint (a chat webhook, an
//! SMTP-over-HTTP gateway, an incident tool):
//!
//! ```json
//! {
//!   "subject": "...",
//!   "message": "...",
//!   "details": {
//!     "hostname": "camera-pi",
//!     "time": "2026-01-19T09:30:00Z",
//!     "error": "Upload credential expired",
//!     "action": "Re-run `albumcam auth login` and restart albumcamd"
//!   }
//! }
//! ```

use albumcam_core::{
    config::WebhookConfig,
    ports::{INotifier, NotifyError},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::DELIVERY_TIMEOUT;

const ALERT_ERROR: &str = "Upload credential expired";
const ALERT_ACTION: &str = "Re-run `albumcam auth login` and restart albumcamd";

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    subject: &'a str,
    message: &'a str,
    details: AlertDetails,
}

#[derive(Debug, Serialize)]
struct AlertDetails {
    hostname: String,
    time: String,
    error: &'static str,
    action: &'static str,
}

/// Notifier that POSTs a JSON alert
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, bearer_token: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            bearer_token,
        })
    }

    pub fn from_config(config: &WebhookConfig) -> Result<Self, NotifyError> {
        Self::new(config.url.clone(), config.bearer_token.clone())
    }

    fn host() -> String {
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

#[async_trait::async_trait]
impl INotifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = AlertPayload {
            subject,
            message: body,
            details: AlertDetails {
                hostname: Self::host(),
                time: Utc::now().to_rfc3339(),
                error: ALERT_ERROR,
                action: ALERT_ACTION,
            },
        };

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        debug!(url = %self.url, "Posting alert to webhook");
        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                target: self.url.clone(),
                reason: format!("HTTP {status}: {}", text.trim()),
            });
        }

        info!(url = %self.url, "Alert delivered to webhook");
        Ok(())
    }
}
