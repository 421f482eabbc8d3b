use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub sms_api_url: String,
    pub sms_api_token: String,
    pub sms_sender: String,
    pub sms_template: String,
    pub sms_dev_mode: bool,
    pub api_secret_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            sms_api_url: env::var("SMS_SERVICE_URL")
                .unwrap_or_else(|_| {
                    warn!("SMS_SERVICE_URL not set, using empty value");
                    String::new()
                }),
            sms_api_token: env::var("SMS_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("SMS_TOKEN not set, using empty value");
                    String::new()
                }),
            sms_sender: env::var("SMS_SENDER")
                .unwrap_or_else(|_| "4546".to_string()),
            sms_template: env::var("SMS_TEMPLATE")
                .unwrap_or_else(|_| "Kod: {otp}".to_string()),
            // Only the literal strings "true"/"1" enable the bypass; it must
            // never be set in a production environment.
            sms_dev_mode: matches!(
                env::var("SMS_DEV_MODE").as_deref(),
                Ok("true") | Ok("1")
            ),
            api_secret_key: env::var("API_SECRET_KEY")
                .unwrap_or_else(|_| {
                    warn!("API_SECRET_KEY not set, integration API disabled");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if config.sms_dev_mode {
            warn!("SMS_DEV_MODE enabled - OTP messages will NOT be delivered");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.sms_api_url.is_empty() && !self.sms_api_token.is_empty()
    }
}
