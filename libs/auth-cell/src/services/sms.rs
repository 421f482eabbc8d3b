use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_utils::phone::normalize_phone;

use crate::models::AuthError;

/// Adapter for the Eskiz-style SMS gateway. Numbers are normalized to the
/// 998-prefixed national format before sending; anything other than an
/// explicit success from the provider is a delivery failure.
pub struct SmsGateway {
    client: Client,
    api_url: String,
    api_token: String,
    sender: String,
    dev_mode: bool,
}

impl SmsGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: config.sms_api_url.clone(),
            api_token: config.sms_api_token.clone(),
            sender: config.sms_sender.clone(),
            dev_mode: config.sms_dev_mode,
        }
    }

    pub async fn send(&self, phone: &str, message: &str) -> Result<(), AuthError> {
        let recipient = normalize_phone(phone);

        // Development bypass: simulate success without delivery. Gated on an
        // explicit flag that must never be set in production.
        if self.dev_mode {
            warn!("SMS_DEV_MODE: skipping delivery to {}: {}", recipient, message);
            return Ok(());
        }

        debug!("Sending SMS to {}", recipient);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&json!({
                "mobile_phone": recipient,
                "message": message,
                "from": self.sender,
            }))
            .send()
            .await
            .map_err(|e| {
                error!("SMS request failed: {}", e);
                AuthError::DeliveryFailed(e.to_string())
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        // The gateway reports success either with a status field or by
        // returning the id of the queued message.
        let accepted = status.is_success()
            && (body.get("status").and_then(Value::as_str) == Some("success")
                || body.get("id").is_some());

        if !accepted {
            error!("SMS gateway rejected message ({}): {}", status, body);
            return Err(AuthError::DeliveryFailed(format!(
                "gateway returned {}",
                status
            )));
        }

        debug!("SMS accepted by gateway");
        Ok(())
    }
}
