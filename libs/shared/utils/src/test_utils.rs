use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::user::{SessionUser, User, UserRole};

use crate::jwt::sign_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub api_secret_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            api_secret_key: "test-api-secret".to_string(),
        }
    }
}

impl TestConfig {
    /// A config pointing at a wiremock server. SMS stays in dev mode so no
    /// test ever attempts a real delivery.
    pub fn with_base_url(base_url: &str) -> AppConfig {
        let mut config = Self::default().to_app_config();
        config.supabase_url = base_url.to_string();
        config
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            sms_api_url: String::new(),
            sms_api_token: String::new(),
            sms_sender: "4546".to_string(),
            sms_template: "Kod: {otp}".to_string(),
            sms_dev_mode: true,
            api_secret_key: self.api_secret_key.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: UserRole,
    pub approved: bool,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::doctor("Test Doctor")
    }
}

impl TestUser {
    pub fn doctor(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: "998901234567".to_string(),
            role: UserRole::Doctor,
            approved: true,
        }
    }

    pub fn pending_doctor(name: &str) -> Self {
        Self {
            approved: false,
            ..Self::doctor(name)
        }
    }

    pub fn admin(name: &str) -> Self {
        Self {
            role: UserRole::Admin,
            ..Self::doctor(name)
        }
    }

    pub fn to_session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
            approved: self.approved,
        }
    }

    pub fn to_user(&self, password_hash: &str) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
            password_hash: password_hash.to_string(),
            address: "Toshkent".to_string(),
            role: self.role,
            telegram_id: None,
            is_approved: self.approved,
            can_export: false,
            created_at: Utc::now(),
        }
    }

    pub fn token(&self, jwt_secret: &str) -> String {
        sign_token(&self.to_session_user(), jwt_secret, 12).expect("test token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();

        assert_eq!(config.supabase_url, "http://localhost:54321");
        assert!(config.sms_dev_mode);
        assert!(config.is_configured());
    }

    #[test]
    fn test_user_token_validates() {
        let config = TestConfig::default();
        let user = TestUser::admin("Admin");
        let token = user.token(&config.jwt_secret);

        let session = validate_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(session.id, user.id);
        assert_eq!(session.role, UserRole::Admin);
    }
}
